// Variant Explosion - Core Library
// Decides which historical field variants per id get their own deduplication
// rows and which fold into the id's reference value.

pub mod error;
pub mod metrics;         // Metric Library
pub mod fields;          // Field registry: metric family + thresholds
pub mod config;          // Engine configuration
pub mod record;          // Raw records + CSV ingestion
pub mod normalize;       // Single normalization pass
pub mod frequency;       // Frequency Aggregator
pub mod reference;       // Reference Selector
pub mod annotate;        // Similarity Annotator
pub mod decision;        // Explosion Decision Engine
pub mod output;          // Metadata Summarizer + Explosion Serializer
pub mod combinations;    // Wide-table combination generator
pub mod pipeline;        // End-to-end batch pass

// Re-export commonly used types
pub use error::{ExplodeError, Result};
pub use metrics::{
    compare, date_gap_days, edit_distance, parse_date, prefix_mismatch, similarity_score,
    Comparison, PREFIX_WINDOW,
};
pub use fields::{default_definition, default_fields, FieldDefinition, MetricKind, Thresholds};
pub use config::EngineConfig;
pub use record::{load_csv, Record, RecordSet, Timestamp};
pub use normalize::{normalize_records, NormalizedRecord};
pub use frequency::FrequencyTable;
pub use reference::ReferenceTable;
pub use annotate::{annotate_field, AnnotatedVariant};
pub use decision::{
    is_exploded, is_low_similarity, ExplosionEngine, FieldDecision, IdDecision, MetricsBundle,
    ScoredVariant,
};
pub use output::{to_json_string, Explosions, Metadata, OutputSet, ReferenceProfile, VariantProfile};
pub use combinations::{CombinationRow, Combinations};
pub use pipeline::{ExplosionPipeline, ExplosionReport, RunSummary};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
