// 📤 Output - metadata profile and explosions-by-id
// Both are pure regroupings of the decisions; no decision logic lives here.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::info;

use crate::decision::{IdDecision, ScoredVariant};

// ============================================================================
// METADATA
// ============================================================================

/// Profile of one variant against a reference value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantProfile {
    /// Occurrences, pooled over every id sharing the reference
    pub frequency: usize,
    pub edit_distance: Option<usize>,
    pub similarity_score: Option<f64>,
    pub low_similarity: bool,
    pub mismatch_first4: bool,
    pub date_gap_days: Option<i64>,
    pub exploded: bool,
}

impl VariantProfile {
    fn from_scored(variant: &ScoredVariant) -> Self {
        let metrics = variant.metrics.as_ref();
        VariantProfile {
            frequency: variant.frequency,
            edit_distance: metrics.and_then(|m| m.edit_distance),
            similarity_score: metrics.and_then(|m| m.similarity_score),
            low_similarity: metrics.map_or(false, |m| m.low_similarity),
            mismatch_first4: metrics.map_or(false, |m| m.prefix_mismatch),
            date_gap_days: metrics.and_then(|m| m.date_gap_days),
            exploded: variant.exploded,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReferenceProfile {
    pub variants: BTreeMap<String, VariantProfile>,
}

/// field -> reference value -> { "variants": { value -> profile } }
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata {
    pub fields: BTreeMap<String, BTreeMap<String, ReferenceProfile>>,
}

impl Metadata {
    /// Regroup decisions by (field, reference value)
    pub fn summarize(decisions: &[IdDecision]) -> Self {
        let mut fields: BTreeMap<String, BTreeMap<String, ReferenceProfile>> = BTreeMap::new();

        for decision in decisions {
            for field in &decision.fields {
                let profile = fields
                    .entry(field.field.clone())
                    .or_default()
                    .entry(field.reference.clone())
                    .or_default();

                for variant in &field.variants {
                    profile
                        .variants
                        .entry(variant.value.clone())
                        .and_modify(|p| p.frequency += variant.frequency)
                        .or_insert_with(|| VariantProfile::from_scored(variant));
                }
            }
        }

        Metadata { fields }
    }

    pub fn profile(&self, field: &str, reference: &str) -> Option<&ReferenceProfile> {
        self.fields.get(field).and_then(|refs| refs.get(reference))
    }
}

// ============================================================================
// EXPLOSIONS
// ============================================================================

/// id -> ordered [field, value] pairs to feed the deduplication run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Explosions {
    pub by_id: BTreeMap<String, Vec<(String, String)>>,
}

impl Explosions {
    /// Regroup decisions by id: exploded variants, or the fallback reference,
    /// for every field with a defined reference, in configured field order
    pub fn from_decisions(decisions: &[IdDecision]) -> Self {
        let by_id = decisions
            .iter()
            .map(|decision| {
                let pairs = decision
                    .fields
                    .iter()
                    .flat_map(|field| {
                        field
                            .exploded_values()
                            .into_iter()
                            .map(|value| (field.field.clone(), value.to_string()))
                    })
                    .collect();
                (decision.id.clone(), pairs)
            })
            .collect();

        Explosions { by_id }
    }

    pub fn get(&self, id: &str) -> Option<&[(String, String)]> {
        self.by_id.get(id).map(Vec::as_slice)
    }

    /// Values recorded for one (id, field)
    pub fn values(&self, id: &str, field: &str) -> Vec<&str> {
        self.by_id
            .get(id)
            .map(|pairs| {
                pairs
                    .iter()
                    .filter(|(f, _)| f == field)
                    .map(|(_, v)| v.as_str())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn entry_count(&self) -> usize {
        self.by_id.values().map(Vec::len).sum()
    }
}

// ============================================================================
// JSON
// ============================================================================

pub fn to_json_string<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).context("Failed to serialize output JSON")
}

// ============================================================================
// OUTPUT FILES
// ============================================================================

/// Every file produced by one run. Nothing reaches its final path until all
/// of them have been written in full next to their targets.
#[derive(Debug, Default)]
pub struct OutputSet {
    files: Vec<(PathBuf, String)>,
}

impl OutputSet {
    pub fn new() -> Self {
        OutputSet { files: Vec::new() }
    }

    pub fn add(&mut self, path: impl Into<PathBuf>, content: String) {
        self.files.push((path.into(), content));
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Stage every file as a temp file in its target directory, then move
    /// them all into place
    pub fn commit(self) -> Result<()> {
        let mut staged = Vec::with_capacity(self.files.len());

        for (path, content) in &self.files {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));

            let mut tmp = NamedTempFile::new_in(dir)
                .with_context(|| format!("Failed to write output file: {:?}", path))?;
            tmp.write_all(content.as_bytes())
                .with_context(|| format!("Failed to write output file: {:?}", path))?;
            tmp.flush()
                .with_context(|| format!("Failed to write output file: {:?}", path))?;

            staged.push((tmp, path));
        }

        for (tmp, path) in staged {
            tmp.persist(path)
                .with_context(|| format!("Failed to move output into place: {:?}", path))?;
            info!(path = ?path, "output written");
        }

        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================
