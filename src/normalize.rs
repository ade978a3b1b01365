// 🧹 Normalizer - one pass from raw cells to canonical values
// Every downstream stage reads these values, so trimming, case-folding and
// date canonicalization happen exactly once.

use tracing::info;

use crate::config::EngineConfig;
use crate::record::{RecordSet, Timestamp};

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRecord {
    /// Position in the input, used for first-seen tie-breaks
    pub row: usize,
    pub id: String,
    pub timestamp: Option<Timestamp>,
    /// One slot per configured field, in configuration order; None = null
    pub values: Vec<Option<String>>,
}

pub fn normalize_records(records: &RecordSet, config: &EngineConfig) -> Vec<NormalizedRecord> {
    let normalized: Vec<NormalizedRecord> = records
        .records()
        .iter()
        .enumerate()
        .map(|(row, record)| NormalizedRecord {
            row,
            id: record.id.clone(),
            timestamp: record.timestamp,
            values: config
                .fields
                .iter()
                .map(|field| record.value(&field.name).and_then(|raw| field.normalize(raw)))
                .collect(),
        })
        .collect();

    info!(records = normalized.len(), fields = config.fields.len(), "normalized records");
    normalized
}
