// 🔍 Similarity Annotator - attach raw metrics to every non-reference variant

use std::collections::BTreeMap;

use crate::fields::FieldDefinition;
use crate::metrics::{compare, Comparison};

#[derive(Debug, Clone, PartialEq)]
pub struct AnnotatedVariant {
    pub value: String,
    pub frequency: usize,
    /// None when the field has no registered metric family
    pub comparison: Option<Comparison>,
}

/// Compare each variant of one (id, field) group against the group's reference.
///
/// The reference itself is skipped. Output follows the variant map's order.
pub fn annotate_field(
    field: &FieldDefinition,
    reference: &str,
    variants: &BTreeMap<String, usize>,
) -> Vec<AnnotatedVariant> {
    variants
        .iter()
        .filter(|(value, _)| value.as_str() != reference)
        .map(|(value, &frequency)| AnnotatedVariant {
            value: value.clone(),
            frequency,
            comparison: field
                .metric
                .map(|kind| compare(kind, Some(reference), Some(value.as_str()))),
        })
        .collect()
}
