// 🚀 Pipeline - one batch pass from raw records to both outputs
//
// records -> normalize -> { frequencies, references } -> per-id decisions
//         -> { metadata, explosions }
//
// Per-id work shares nothing, so it can fan out across threads; the
// sequential path gives identical output.

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::combinations::Combinations;
use crate::config::EngineConfig;
use crate::decision::{ExplosionEngine, IdDecision};
use crate::error::Result;
use crate::frequency::{FieldCounts, FrequencyTable};
use crate::normalize::normalize_records;
use crate::output::{Explosions, Metadata};
use crate::record::RecordSet;
use crate::reference::ReferenceTable;

// ============================================================================
// REPORT
// ============================================================================

/// Decisions for every id, in id order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplosionReport {
    pub fields: Vec<String>,
    pub decisions: Vec<IdDecision>,
}

impl ExplosionReport {
    pub fn metadata(&self) -> Metadata {
        Metadata::summarize(&self.decisions)
    }

    pub fn explosions(&self) -> Explosions {
        Explosions::from_decisions(&self.decisions)
    }

    pub fn combinations(&self) -> Combinations {
        let names: Vec<&str> = self.fields.iter().map(String::as_str).collect();
        Combinations::generate(&self.decisions, &names)
    }

    pub fn decision(&self, id: &str) -> Option<&IdDecision> {
        self.decisions.iter().find(|d| d.id == id)
    }

    pub fn summary(&self) -> RunSummary {
        let groups = self.decisions.iter().flat_map(|d| d.fields.iter());

        let mut summary = RunSummary {
            ids: self.decisions.len(),
            ..RunSummary::default()
        };

        for field in groups {
            summary.field_groups += 1;
            summary.variants_scored += field.variants.len();
            summary.exploded_variants += field.exploded_count();
            if field.fallback {
                summary.fallback_entries += 1;
            }
        }

        summary
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub ids: usize,
    /// (id, field) pairs with a defined reference
    pub field_groups: usize,
    /// Non-reference variants compared against their reference
    pub variants_scored: usize,
    pub exploded_variants: usize,
    pub fallback_entries: usize,
}

impl RunSummary {
    pub fn summary(&self) -> String {
        format!(
            "{} ids, {} field groups | {} variants scored, {} exploded, {} fallback entries",
            self.ids,
            self.field_groups,
            self.variants_scored,
            self.exploded_variants,
            self.fallback_entries
        )
    }
}

// ============================================================================
// PIPELINE
// ============================================================================

pub struct ExplosionPipeline {
    engine: ExplosionEngine,
}

impl ExplosionPipeline {
    pub fn new(config: EngineConfig) -> Result<Self> {
        Ok(ExplosionPipeline {
            engine: ExplosionEngine::new(config)?,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        self.engine.config()
    }

    /// Run the whole batch. Input-shape errors are raised before any work.
    pub fn run(&self, records: &RecordSet) -> Result<ExplosionReport> {
        let config = self.engine.config();
        config.validate_shape(records.columns())?;

        let normalized = normalize_records(records, config);
        let frequencies = FrequencyTable::aggregate(&normalized, config.fields.len());
        let references = ReferenceTable::select(&normalized);

        let groups: Vec<(&String, &FieldCounts)> = frequencies.iter().collect();
        let decisions = self.decide_all(&groups, &references);

        let report = ExplosionReport {
            fields: config.fields.iter().map(|f| f.name.clone()).collect(),
            decisions,
        };

        info!("{}", report.summary().summary());
        Ok(report)
    }

    fn decide_one(&self, id: &str, counts: &FieldCounts, references: &ReferenceTable) -> IdDecision {
        let refs = references.get(id).map(Vec::as_slice).unwrap_or(&[]);
        self.engine.decide_id(id, counts, refs)
    }

    #[cfg(feature = "parallel")]
    fn decide_all(&self, groups: &[(&String, &FieldCounts)], references: &ReferenceTable) -> Vec<IdDecision> {
        if self.engine.config().parallel {
            groups
                .par_iter()
                .map(|(id, counts)| self.decide_one(id, counts, references))
                .collect()
        } else {
            self.decide_sequential(groups, references)
        }
    }

    #[cfg(not(feature = "parallel"))]
    fn decide_all(&self, groups: &[(&String, &FieldCounts)], references: &ReferenceTable) -> Vec<IdDecision> {
        self.decide_sequential(groups, references)
    }

    fn decide_sequential(&self, groups: &[(&String, &FieldCounts)], references: &ReferenceTable) -> Vec<IdDecision> {
        groups
            .iter()
            .map(|(id, counts)| self.decide_one(id, counts, references))
            .collect()
    }
}

// ============================================================================
// TESTS
// ============================================================================
