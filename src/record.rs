// 📥 Records - raw input rows and CSV ingestion
// Rows are immutable once loaded; several rows may share an id.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use tracing::{info, warn};

use crate::config::EngineConfig;
use crate::metrics::parse_date;

// ============================================================================
// TIMESTAMP
// ============================================================================

const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
];

/// Orderable point in time used to pick the reference row
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(pub NaiveDateTime);

impl Timestamp {
    pub fn from_epoch_seconds(secs: i64) -> Option<Self> {
        DateTime::<Utc>::from_timestamp(secs, 0).map(|dt| Timestamp(dt.naive_utc()))
    }

    fn from_date(date: NaiveDate) -> Option<Self> {
        date.and_hms_opt(0, 0, 0).map(Timestamp)
    }

    /// Parse compact `YYYYMMDD`, integer epoch seconds, RFC 3339,
    /// `YYYY-MM-DD HH:MM:SS` or a bare date
    pub fn parse(raw: &str) -> Option<Self> {
        let s = raw.trim();
        if s.is_empty() {
            return None;
        }

        // Eight digits that form a valid date are a date, not seconds
        if s.len() == 8 && s.bytes().all(|b| b.is_ascii_digit()) {
            if let Some(ts) = parse_date(s).and_then(Self::from_date) {
                return Some(ts);
            }
        }

        if let Ok(secs) = s.parse::<i64>() {
            return Self::from_epoch_seconds(secs);
        }

        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Some(Timestamp(dt.naive_utc()));
        }

        for fmt in TIMESTAMP_FORMATS {
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
                return Some(Timestamp(dt));
            }
        }

        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .ok()
            .and_then(Self::from_date)
    }
}

// ============================================================================
// RECORD
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,

    /// None = missing or unparsable; orders before every dated row
    pub timestamp: Option<Timestamp>,

    /// Raw field values; an absent key is a null cell
    pub values: HashMap<String, String>,
}

impl Record {
    pub fn new(id: impl Into<String>, timestamp: Option<Timestamp>) -> Self {
        Record {
            id: id.into(),
            timestamp,
            values: HashMap::new(),
        }
    }

    /// Builder: set a field value
    pub fn with_value(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(field.into(), value.into());
        self
    }

    pub fn value(&self, field: &str) -> Option<&str> {
        self.values.get(field).map(String::as_str)
    }
}

// ============================================================================
// RECORD SET
// ============================================================================

/// The full input: column header plus rows in input order
#[derive(Debug, Clone, Default)]
pub struct RecordSet {
    columns: Vec<String>,
    records: Vec<Record>,
}

impl RecordSet {
    pub fn new(columns: Vec<String>) -> Self {
        RecordSet {
            columns,
            records: Vec::new(),
        }
    }

    /// Build from in-memory rows; the header is the id and timestamp columns
    /// plus every field name that appears in at least one row.
    pub fn from_records(config: &EngineConfig, records: Vec<Record>) -> Self {
        let fields: BTreeSet<&str> = records
            .iter()
            .flat_map(|r| r.values.keys().map(String::as_str))
            .collect();

        let mut columns = vec![config.id_column.clone(), config.timestamp_column.clone()];
        columns.extend(fields.into_iter().map(str::to_string));

        RecordSet { columns, records }
    }

    pub fn push(&mut self, record: Record) {
        self.records.push(record);
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

// ============================================================================
// CSV INGESTION
// ============================================================================

/// Load a header-driven CSV file.
///
/// The header is checked against the configuration before any row is read.
/// Empty cells are null; columns outside the configured fields are ignored.
pub fn load_csv(csv_path: &Path, config: &EngineConfig) -> Result<RecordSet> {
    let mut rdr = csv::Reader::from_path(csv_path)
        .with_context(|| format!("Failed to open CSV file: {:?}", csv_path))?;

    let headers: Vec<String> = rdr
        .headers()
        .context("Failed to read CSV header")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    config.validate_shape(&headers)?;

    let position = |column: &str| headers.iter().position(|h| h == column);
    // validate_shape guarantees these
    let id_idx = position(&config.id_column).unwrap_or_default();
    let ts_idx = position(&config.timestamp_column).unwrap_or_default();
    let field_idx: Vec<(String, usize)> = config
        .fields
        .iter()
        .filter_map(|f| position(&f.name).map(|i| (f.name.clone(), i)))
        .collect();

    let mut records = RecordSet::new(headers.clone());
    let mut undated = 0usize;

    for (line, result) in rdr.records().enumerate() {
        let row = result.with_context(|| format!("Failed to read CSV row {}", line + 2))?;

        let timestamp = Timestamp::parse(row.get(ts_idx).unwrap_or(""));
        if timestamp.is_none() {
            undated += 1;
        }

        let mut record = Record::new(row.get(id_idx).unwrap_or("").trim(), timestamp);
        for (name, idx) in &field_idx {
            if let Some(value) = row.get(*idx).filter(|v| !v.trim().is_empty()) {
                record.values.insert(name.clone(), value.to_string());
            }
        }

        records.push(record);
    }

    if undated > 0 {
        warn!(
            rows = undated,
            column = %config.timestamp_column,
            "rows with missing or unparsable timestamp treated as undated"
        );
    }

    info!(rows = records.len(), path = ?csv_path, "loaded records");

    Ok(records)
}

// ============================================================================
// TESTS
// ============================================================================
