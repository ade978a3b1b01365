// 💥 Explosion Decision Engine - fold a variant into its reference, or explode it
// Two phases per (id, field): score every variant, then inspect the scored set
// for the fallback entry. Nothing here looks across ids.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::annotate::{annotate_field, AnnotatedVariant};
use crate::config::EngineConfig;
use crate::error::Result;
use crate::fields::{FieldDefinition, Thresholds};
use crate::metrics::Comparison;

// ============================================================================
// RULES
// ============================================================================

/// Threshold test on a single comparison. Malformed scores (NaN) count as low.
pub fn is_low_similarity(comparison: &Comparison, thresholds: &Thresholds) -> bool {
    match comparison {
        Comparison::Text {
            edit_distance,
            similarity_score,
            ..
        } => {
            *edit_distance >= thresholds.min_edit_distance
                || similarity_score.is_nan()
                || *similarity_score < thresholds.max_similarity_score
        }
        Comparison::Date { gap_days } => *gap_days > thresholds.max_date_gap_days,
        Comparison::Categorical { matches } => !matches,
        Comparison::Missing => true,
    }
}

pub fn is_exploded(comparison: &Comparison, thresholds: &Thresholds) -> bool {
    is_low_similarity(comparison, thresholds)
        || (comparison.prefix_mismatch() && thresholds.prefix_mismatch_triggers_explosion)
}

// ============================================================================
// DECISION TYPES
// ============================================================================

/// Metrics of one variant against its reference, plus the threshold verdict
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsBundle {
    pub edit_distance: Option<usize>,
    pub similarity_score: Option<f64>,
    pub prefix_mismatch: bool,
    pub date_gap_days: Option<i64>,
    pub low_similarity: bool,
}

impl MetricsBundle {
    pub fn from_comparison(comparison: &Comparison, thresholds: &Thresholds) -> Self {
        MetricsBundle {
            edit_distance: comparison.edit_distance(),
            similarity_score: comparison.similarity_score(),
            prefix_mismatch: comparison.prefix_mismatch(),
            date_gap_days: comparison.date_gap_days(),
            low_similarity: is_low_similarity(comparison, thresholds),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredVariant {
    pub value: String,
    pub frequency: usize,

    /// None when the field is not scored (no metric family)
    pub metrics: Option<MetricsBundle>,

    /// Kept as a separate row for this id
    pub exploded: bool,
}

/// Outcome for one (id, field) group with a defined reference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDecision {
    pub field: String,
    pub reference: String,

    /// Non-reference variants in value order
    pub variants: Vec<ScoredVariant>,

    /// No variant exploded, so the reference stands in as the single entry
    pub fallback: bool,
}

impl FieldDecision {
    /// Values this field contributes to the id's explosion set (never empty)
    pub fn exploded_values(&self) -> Vec<&str> {
        if self.fallback {
            return vec![self.reference.as_str()];
        }

        self.variants
            .iter()
            .filter(|v| v.exploded)
            .map(|v| v.value.as_str())
            .collect()
    }

    pub fn exploded_count(&self) -> usize {
        self.variants.iter().filter(|v| v.exploded).count()
    }
}

/// Every field decision for one id, in configured field order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdDecision {
    pub id: String,
    pub fields: Vec<FieldDecision>,
}

impl IdDecision {
    pub fn field(&self, name: &str) -> Option<&FieldDecision> {
        self.fields.iter().find(|f| f.field == name)
    }
}

// ============================================================================
// EXPLOSION ENGINE
// ============================================================================

pub struct ExplosionEngine {
    config: EngineConfig,
}

impl ExplosionEngine {
    /// Create an engine; the configuration is validated up front
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(ExplosionEngine { config })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Decide every field of one id.
    ///
    /// `counts` and `references` are aligned with the configured fields.
    /// Fields without a defined reference are left out entirely.
    pub fn decide_id(
        &self,
        id: &str,
        counts: &[BTreeMap<String, usize>],
        references: &[Option<String>],
    ) -> IdDecision {
        let fields: Vec<FieldDecision> = self
            .config
            .fields
            .iter()
            .enumerate()
            .filter_map(|(i, field)| {
                let reference = references.get(i)?.as_deref()?;
                let variants = counts
                    .get(i)
                    .map(|c| annotate_field(field, reference, c))
                    .unwrap_or_default();
                Some(self.decide_field(field, reference, variants))
            })
            .collect();

        debug!(
            id,
            fields = fields.len(),
            exploded = fields.iter().map(FieldDecision::exploded_count).sum::<usize>(),
            fallbacks = fields.iter().filter(|f| f.fallback).count(),
            "decided id"
        );

        IdDecision {
            id: id.to_string(),
            fields,
        }
    }

    /// Score all variants of one (id, field), then apply the fallback rule
    pub fn decide_field(
        &self,
        field: &FieldDefinition,
        reference: &str,
        variants: Vec<AnnotatedVariant>,
    ) -> FieldDecision {
        // Phase 1: each variant on its own
        let scored: Vec<ScoredVariant> = variants
            .into_iter()
            .map(|variant| self.score(field, variant))
            .collect();

        // Phase 2: did anything explode?
        let fallback = !scored.iter().any(|v| v.exploded);

        FieldDecision {
            field: field.name.clone(),
            reference: reference.to_string(),
            variants: scored,
            fallback,
        }
    }

    fn score(&self, field: &FieldDefinition, variant: AnnotatedVariant) -> ScoredVariant {
        let thresholds = &field.thresholds;

        let (metrics, exploded) = match &variant.comparison {
            Some(comparison) => (
                Some(MetricsBundle::from_comparison(comparison, thresholds)),
                is_exploded(comparison, thresholds),
            ),
            None => (None, false),
        };

        ScoredVariant {
            value: variant.value,
            frequency: variant.frequency,
            metrics,
            exploded,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::MetricKind;
    use crate::metrics::compare;

    fn create_test_engine(fields: Vec<FieldDefinition>) -> ExplosionEngine {
        ExplosionEngine::new(EngineConfig::with_fields(fields)).unwrap()
    }

    fn counts(pairs: &[(&str, usize)]) -> BTreeMap<String, usize> {
        pairs.iter().map(|(v, c)| (v.to_string(), *c)).collect()
    }

    fn no_prefix_trigger() -> Thresholds {
        Thresholds {
            prefix_mismatch_triggers_explosion: false,
            ..Thresholds::default()
        }
    }

    #[test]
    fn test_low_similarity_rules() {
        let t = Thresholds::default();

        let close = Comparison::Text { edit_distance: 1, similarity_score: 0.93, prefix_mismatch: false };
        let far_edit = Comparison::Text { edit_distance: 2, similarity_score: 0.93, prefix_mismatch: false };
        let far_score = Comparison::Text { edit_distance: 1, similarity_score: 0.80, prefix_mismatch: false };
        let nan = Comparison::Text { edit_distance: 0, similarity_score: f64::NAN, prefix_mismatch: false };

        assert!(!is_low_similarity(&close, &t));
        assert!(is_low_similarity(&far_edit, &t));
        assert!(is_low_similarity(&far_score, &t));
        assert!(is_low_similarity(&nan, &t));
        assert!(is_low_similarity(&Comparison::Missing, &t));
        assert!(!is_low_similarity(&Comparison::Date { gap_days: 1 }, &t));
        assert!(is_low_similarity(&Comparison::Date { gap_days: 2 }, &t));
        assert!(is_low_similarity(&Comparison::Categorical { matches: false }, &t));
    }

    #[test]
    fn test_prefix_mismatch_trigger() {
        let c = Comparison::Text { edit_distance: 1, similarity_score: 0.93, prefix_mismatch: true };

        assert!(is_exploded(&c, &Thresholds::default()));
        assert!(!is_exploded(&c, &no_prefix_trigger()));
    }

    #[test]
    fn test_name_variants() {
        // Reference "john": "jon" is close but differs inside the first four chars
        let engine = create_test_engine(vec![FieldDefinition::string("first_name")]);
        let decision = engine.decide_id(
            "1",
            &[counts(&[("john", 2), ("jon", 1), ("jahn", 1)])],
            &[Some("john".to_string())],
        );

        let field = &decision.fields[0];
        let jon = field.variants.iter().find(|v| v.value == "jon").unwrap();
        let metrics = jon.metrics.as_ref().unwrap();

        assert_eq!(metrics.edit_distance, Some(1));
        assert!(metrics.similarity_score.unwrap() > 0.85);
        assert!(!metrics.low_similarity);
        assert!(metrics.prefix_mismatch);
        assert!(jon.exploded);

        let jahn = field.variants.iter().find(|v| v.value == "jahn").unwrap();
        assert_eq!(jahn.metrics.as_ref().unwrap().edit_distance, Some(1));
        assert!(jahn.metrics.as_ref().unwrap().prefix_mismatch);
        assert!(jahn.exploded);

        assert!(!field.fallback);
    }

    #[test]
    fn test_close_variant_folds_without_prefix_trigger() {
        let engine = create_test_engine(vec![
            FieldDefinition::string("first_name").with_thresholds(no_prefix_trigger()),
        ]);
        let decision = engine.decide_id(
            "1",
            &[counts(&[("john", 2), ("jon", 1)])],
            &[Some("john".to_string())],
        );

        let field = &decision.fields[0];
        assert!(!field.variants[0].exploded);
        assert!(field.fallback);
        assert_eq!(field.exploded_values(), vec!["john"]);
    }

    #[test]
    fn test_date_variants() {
        let engine = create_test_engine(vec![FieldDefinition::date("dob")]);
        let decision = engine.decide_id(
            "2",
            &[counts(&[("1985-06-15", 1), ("1985-06-16", 1), ("1985-07-15", 1)])],
            &[Some("1985-06-15".to_string())],
        );

        let field = &decision.fields[0];
        let next_day = field.variants.iter().find(|v| v.value == "1985-06-16").unwrap();
        let next_month = field.variants.iter().find(|v| v.value == "1985-07-15").unwrap();

        assert_eq!(next_day.metrics.as_ref().unwrap().date_gap_days, Some(1));
        assert!(!next_day.exploded);
        assert_eq!(next_month.metrics.as_ref().unwrap().date_gap_days, Some(30));
        assert!(next_month.exploded);
        assert_eq!(field.exploded_values(), vec!["1985-07-15"]);
    }

    #[test]
    fn test_fallback_when_only_reference() {
        let engine = create_test_engine(vec![FieldDefinition::string("postcode")]);
        let decision = engine.decide_id(
            "3",
            &[counts(&[("sw1a1aa", 3)])],
            &[Some("sw1a1aa".to_string())],
        );

        let field = &decision.fields[0];
        assert!(field.variants.is_empty());
        assert!(field.fallback);
        assert_eq!(field.exploded_values(), vec!["sw1a1aa"]);
    }

    #[test]
    fn test_categorical_mismatch_explodes() {
        let engine = create_test_engine(vec![FieldDefinition::categorical("sex")]);
        let decision = engine.decide_id(
            "4",
            &[counts(&[("f", 1), ("m", 1)])],
            &[Some("f".to_string())],
        );

        let m = &decision.fields[0].variants[0];
        let metrics = m.metrics.as_ref().unwrap();

        assert_eq!(m.value, "m");
        assert!(metrics.low_similarity);
        assert_eq!(metrics.edit_distance, None);
        assert!(m.exploded);
        assert!(!decision.fields[0].fallback);
    }

    #[test]
    fn test_undefined_reference_skips_field() {
        let engine = create_test_engine(vec![
            FieldDefinition::string("first_name"),
            FieldDefinition::string("email"),
        ]);
        let decision = engine.decide_id(
            "5",
            &[counts(&[("john", 1)]), counts(&[("j@example.com", 1)])],
            &[Some("john".to_string()), None],
        );

        assert_eq!(decision.fields.len(), 1);
        assert!(decision.field("email").is_none());
        assert!(decision.field("first_name").is_some());
    }

    #[test]
    fn test_unregistered_field_goes_to_fallback() {
        let engine = create_test_engine(vec![FieldDefinition::new("nickname", None)]);
        let decision = engine.decide_id(
            "6",
            &[counts(&[("jack", 1), ("zed", 1)])],
            &[Some("jack".to_string())],
        );

        let field = &decision.fields[0];
        assert_eq!(field.variants.len(), 1);
        assert_eq!(field.variants[0].metrics, None);
        assert!(!field.variants[0].exploded);
        assert!(field.fallback);
    }

    #[test]
    fn test_metrics_bundle_from_comparison() {
        let t = Thresholds::default();
        let bundle = MetricsBundle::from_comparison(
            &compare(MetricKind::String, Some("smith"), Some("smyth")),
            &t,
        );

        assert_eq!(bundle.edit_distance, Some(1));
        assert_eq!(bundle.date_gap_days, None);
        // "smi" vs "smy"
        assert!(bundle.prefix_mismatch);
    }

    #[test]
    fn test_engine_rejects_invalid_config() {
        assert!(ExplosionEngine::new(EngineConfig::with_fields(vec![])).is_err());
    }
}
