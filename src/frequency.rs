// 🔢 Frequency Aggregator - (id, field) -> (variant -> count)
// Counts are order-independent; null cells contribute nothing.

use std::collections::BTreeMap;
use tracing::info;

use crate::normalize::NormalizedRecord;

/// Variant counts for one id, one map per configured field
pub type FieldCounts = Vec<BTreeMap<String, usize>>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrequencyTable {
    by_id: BTreeMap<String, FieldCounts>,
}

impl FrequencyTable {
    /// Single pass over the normalized rows
    pub fn aggregate(records: &[NormalizedRecord], field_count: usize) -> Self {
        let mut by_id: BTreeMap<String, FieldCounts> = BTreeMap::new();

        for record in records {
            let counts = by_id
                .entry(record.id.clone())
                .or_insert_with(|| vec![BTreeMap::new(); field_count]);

            for (slot, value) in counts.iter_mut().zip(&record.values) {
                if let Some(value) = value {
                    *slot.entry(value.clone()).or_insert(0) += 1;
                }
            }
        }

        let table = FrequencyTable { by_id };
        info!(ids = table.id_count(), variants = table.variant_count(), "aggregated variant frequencies");
        table
    }

    pub fn get(&self, id: &str) -> Option<&FieldCounts> {
        self.by_id.get(id)
    }

    /// Count of one (id, field, variant) triple; 0 if never seen
    pub fn frequency(&self, id: &str, field: usize, variant: &str) -> usize {
        self.by_id
            .get(id)
            .and_then(|fields| fields.get(field))
            .and_then(|counts| counts.get(variant))
            .copied()
            .unwrap_or(0)
    }

    pub fn ids(&self) -> impl Iterator<Item = &String> {
        self.by_id.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldCounts)> {
        self.by_id.iter()
    }

    pub fn id_count(&self) -> usize {
        self.by_id.len()
    }

    /// Distinct (id, field, variant) triples
    pub fn variant_count(&self) -> usize {
        self.by_id
            .values()
            .flat_map(|fields| fields.iter().map(BTreeMap::len))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(row: usize, id: &str, values: &[Option<&str>]) -> NormalizedRecord {
        NormalizedRecord {
            row,
            id: id.to_string(),
            timestamp: None,
            values: values.iter().map(|v| v.map(str::to_string)).collect(),
        }
    }

    #[test]
    fn test_counts_per_id_and_field() {
        let rows = vec![
            row(0, "1", &[Some("john"), Some("smith")]),
            row(1, "1", &[Some("jon"), Some("smith")]),
            row(2, "1", &[Some("john"), None]),
            row(3, "2", &[Some("mary"), Some("jones")]),
        ];

        let table = FrequencyTable::aggregate(&rows, 2);

        assert_eq!(table.id_count(), 2);
        assert_eq!(table.frequency("1", 0, "john"), 2);
        assert_eq!(table.frequency("1", 0, "jon"), 1);
        assert_eq!(table.frequency("1", 1, "smith"), 2);
        assert_eq!(table.frequency("2", 0, "john"), 0);
        assert_eq!(table.variant_count(), 5);
    }

    #[test]
    fn test_nulls_are_not_variants() {
        let rows = vec![row(0, "1", &[None]), row(1, "1", &[None])];

        let table = FrequencyTable::aggregate(&rows, 1);

        assert_eq!(table.id_count(), 1);
        assert!(table.get("1").unwrap()[0].is_empty());
        assert_eq!(table.variant_count(), 0);
    }

    #[test]
    fn test_order_independent() {
        let mut rows = vec![
            row(0, "1", &[Some("john")]),
            row(1, "2", &[Some("mary")]),
            row(2, "1", &[Some("jon")]),
            row(3, "1", &[Some("john")]),
        ];

        let forward = FrequencyTable::aggregate(&rows, 1);
        rows.reverse();
        let backward = FrequencyTable::aggregate(&rows, 1);

        assert_eq!(forward, backward);
    }
}
