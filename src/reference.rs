// 📌 Reference Selector - the latest row per id supplies the reference values
// Ties on the maximum timestamp go to the first row seen in input order.
// Undated rows order before every dated row.

use std::collections::BTreeMap;
use tracing::info;

use crate::normalize::NormalizedRecord;

/// Reference value per configured field; None = undefined for this id
pub type FieldReferences = Vec<Option<String>>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReferenceTable {
    by_id: BTreeMap<String, FieldReferences>,
}

impl ReferenceTable {
    pub fn select(records: &[NormalizedRecord]) -> Self {
        // id -> winning row
        let mut latest: BTreeMap<&str, &NormalizedRecord> = BTreeMap::new();

        for record in records {
            latest
                .entry(record.id.as_str())
                .and_modify(|current| {
                    // Strictly greater: an equal timestamp keeps the earlier row
                    if record.timestamp > current.timestamp {
                        *current = record;
                    }
                })
                .or_insert(record);
        }

        let by_id: BTreeMap<String, FieldReferences> = latest
            .into_iter()
            .map(|(id, record)| (id.to_string(), record.values.clone()))
            .collect();

        info!(ids = by_id.len(), "selected reference rows");
        ReferenceTable { by_id }
    }

    pub fn get(&self, id: &str) -> Option<&FieldReferences> {
        self.by_id.get(id)
    }

    pub fn reference(&self, id: &str, field: usize) -> Option<&str> {
        self.by_id
            .get(id)
            .and_then(|refs| refs.get(field))
            .and_then(|value| value.as_deref())
    }

    pub fn id_count(&self) -> usize {
        self.by_id.len()
    }
}
