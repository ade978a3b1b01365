// 🏷️ Field Registry - what each identifier field is and how it is compared
// Metric families are a closed set chosen per field, never inferred from values.

use serde::{Deserialize, Serialize};

use crate::error::{ExplodeError, Result};
use crate::metrics::parse_date;

// ============================================================================
// METRIC FAMILY
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    /// Levenshtein + Jaro-Winkler + prefix check (names, address, email, ...)
    String,
    /// Day gap when both sides parse, string metrics otherwise
    Date,
    /// Exact match only (sex and other low-cardinality codes)
    Categorical,
}

// ============================================================================
// THRESHOLDS
// ============================================================================

/// Per-field decision thresholds. Every key is optional in JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Edit distance at or above this is low similarity (default: 2)
    pub min_edit_distance: usize,

    /// Similarity score below this is low similarity (default: 0.85)
    pub max_similarity_score: f64,

    /// Whether a first-4 mismatch alone forces explosion (default: true)
    pub prefix_mismatch_triggers_explosion: bool,

    /// Date gap above this is low similarity (default: 1 day)
    pub max_date_gap_days: i64,
}

impl Thresholds {
    pub fn new() -> Self {
        Thresholds {
            min_edit_distance: 2,
            max_similarity_score: 0.85,
            prefix_mismatch_triggers_explosion: true,
            max_date_gap_days: 1,
        }
    }

    fn validate(&self, field: &str) -> Result<()> {
        if !(0.0..=1.0).contains(&self.max_similarity_score) {
            return Err(ExplodeError::InvalidThreshold {
                field: field.to_string(),
                reason: format!(
                    "max_similarity_score must be within [0, 1], got {}",
                    self.max_similarity_score
                ),
            });
        }

        if self.max_date_gap_days < 0 {
            return Err(ExplodeError::InvalidThreshold {
                field: field.to_string(),
                reason: format!(
                    "max_date_gap_days must be non-negative, got {}",
                    self.max_date_gap_days
                ),
            });
        }

        Ok(())
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// FIELD DEFINITION
// ============================================================================

/// One identifier column and the rules used to compare its variants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
    /// Column name in the input
    pub name: String,

    /// Metric family; None means the field is never scored and always
    /// resolves through the fallback entry
    #[serde(default)]
    pub metric: Option<MetricKind>,

    #[serde(default)]
    pub thresholds: Thresholds,
}

impl FieldDefinition {
    pub fn new(name: impl Into<String>, metric: Option<MetricKind>) -> Self {
        FieldDefinition {
            name: name.into(),
            metric,
            thresholds: Thresholds::default(),
        }
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, Some(MetricKind::String))
    }

    pub fn date(name: impl Into<String>) -> Self {
        Self::new(name, Some(MetricKind::Date))
    }

    pub fn categorical(name: impl Into<String>) -> Self {
        Self::new(name, Some(MetricKind::Categorical))
    }

    /// Builder: replace thresholds
    pub fn with_thresholds(mut self, thresholds: Thresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Canonical form of a raw cell, or None when the cell counts as null.
    ///
    /// Strings are trimmed and lowercased. Dates that parse are rewritten as
    /// `YYYY-MM-DD`; dates that don't are kept as trimmed lowercase text.
    pub fn normalize(&self, raw: &str) -> Option<String> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }

        match self.metric {
            Some(MetricKind::Date) => Some(match parse_date(trimmed) {
                Some(date) => date.format("%Y-%m-%d").to_string(),
                None => trimmed.to_lowercase(),
            }),
            _ => Some(trimmed.to_lowercase()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.thresholds.validate(&self.name)
    }
}

/// Built-in field list used when no configuration is supplied
pub fn default_fields() -> Vec<FieldDefinition> {
    vec![
        FieldDefinition::string("first_name"),
        FieldDefinition::string("last_name"),
        FieldDefinition::categorical("sex"),
        FieldDefinition::date("dob"),
        FieldDefinition::string("address"),
        FieldDefinition::string("postcode"),
        FieldDefinition::string("telephone"),
        FieldDefinition::string("email"),
    ]
}

/// Look up the built-in definition for a field name, defaulting to string metrics
pub fn default_definition(name: &str) -> FieldDefinition {
    default_fields()
        .into_iter()
        .find(|f| f.name == name)
        .unwrap_or_else(|| FieldDefinition::string(name))
}

// ============================================================================
// TESTS
// ============================================================================
