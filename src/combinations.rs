// 🧮 Combination Generator - explosions back into a wide table
// Per id: Cartesian product of each field's exploded values.

use anyhow::{Context, Result};
use tracing::info;

use crate::decision::IdDecision;

#[derive(Debug, Clone, PartialEq)]
pub struct CombinationRow {
    pub id: String,
    /// Aligned with `Combinations::fields`; empty string = no defined reference
    pub values: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Combinations {
    /// Field columns in alphabetical order
    pub fields: Vec<String>,
    pub rows: Vec<CombinationRow>,
}

impl Combinations {
    /// Expand every id into one row per combination of its exploded values
    pub fn generate(decisions: &[IdDecision], field_names: &[&str]) -> Self {
        let mut fields: Vec<String> = field_names.iter().map(|f| f.to_string()).collect();
        fields.sort();

        let mut rows = Vec::new();

        for decision in decisions {
            let choices: Vec<Vec<&str>> = fields
                .iter()
                .map(|name| match decision.field(name) {
                    Some(field) => field.exploded_values(),
                    None => vec![""],
                })
                .collect();

            let combos = choices.iter().fold(vec![Vec::<&str>::new()], |acc, options| {
                acc.iter()
                    .flat_map(|prefix| {
                        options.iter().map(move |value| {
                            let mut next = prefix.clone();
                            next.push(*value);
                            next
                        })
                    })
                    .collect()
            });

            rows.extend(combos.into_iter().map(|values| CombinationRow {
                id: decision.id.clone(),
                values: values.into_iter().map(str::to_string).collect(),
            }));
        }

        Combinations { fields, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Render as CSV with columns `id` then the fields
    pub fn to_csv_string(&self) -> Result<String> {
        let mut wtr = csv::Writer::from_writer(Vec::new());

        let header = std::iter::once("id").chain(self.fields.iter().map(String::as_str));
        wtr.write_record(header).context("Failed to write CSV header")?;

        for row in &self.rows {
            let record = std::iter::once(row.id.as_str()).chain(row.values.iter().map(String::as_str));
            wtr.write_record(record).context("Failed to write CSV row")?;
        }

        let bytes = wtr.into_inner().context("Failed to flush CSV writer")?;
        info!(rows = self.rows.len(), "rendered combinations");
        String::from_utf8(bytes).context("Combinations CSV is not valid UTF-8")
    }
}
