// ⚙️ Engine Configuration - passed in at construction, never global
// Loadable from a JSON file; every key falls back to the built-in default.

use anyhow::{Context as AnyhowContext, Result as AnyhowResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::error::{ExplodeError, Result};
use crate::fields::{default_fields, FieldDefinition};

fn default_id_column() -> String {
    "id".to_string()
}

fn default_timestamp_column() -> String {
    "ts".to_string()
}

fn default_parallel() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Column holding the record identifier (default: "id")
    #[serde(default = "default_id_column")]
    pub id_column: String,

    /// Column used to pick the reference row (default: "ts")
    #[serde(default = "default_timestamp_column")]
    pub timestamp_column: String,

    /// Identifier fields, in output order
    #[serde(default = "default_fields")]
    pub fields: Vec<FieldDefinition>,

    /// Fan per-id decisions out across threads (default: true)
    #[serde(default = "default_parallel")]
    pub parallel: bool,
}

impl EngineConfig {
    pub fn new() -> Self {
        EngineConfig {
            id_column: default_id_column(),
            timestamp_column: default_timestamp_column(),
            fields: default_fields(),
            parallel: default_parallel(),
        }
    }

    /// Default columns with a custom field list
    pub fn with_fields(fields: Vec<FieldDefinition>) -> Self {
        EngineConfig {
            fields,
            ..Self::new()
        }
    }

    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> AnyhowResult<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        let config: EngineConfig =
            serde_json::from_str(&content).context("Failed to parse config JSON")?;

        Ok(config)
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    /// Check the configuration itself: non-empty, unique fields, sane thresholds
    pub fn validate(&self) -> Result<()> {
        if self.fields.is_empty() {
            return Err(ExplodeError::EmptyFieldList);
        }

        let mut seen = HashSet::new();
        for field in &self.fields {
            if !seen.insert(field.name.as_str()) {
                return Err(ExplodeError::DuplicateField(field.name.clone()));
            }
            field.validate()?;
        }

        Ok(())
    }

    /// Check that every required column exists in the input header
    pub fn validate_shape<S: AsRef<str>>(&self, columns: &[S]) -> Result<()> {
        let present: HashSet<&str> = columns.iter().map(|c| c.as_ref()).collect();

        let required = [self.id_column.as_str(), self.timestamp_column.as_str()]
            .into_iter()
            .chain(self.fields.iter().map(|f| f.name.as_str()));

        for column in required {
            if !present.contains(column) {
                return Err(ExplodeError::MissingColumn {
                    column: column.to_string(),
                });
            }
        }

        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================
