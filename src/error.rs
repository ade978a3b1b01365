// Engine errors
// Only input-shape and configuration problems are errors; per-record data
// problems are recovered where they occur.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ExplodeError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExplodeError {
    #[error("Required column missing from input: {column}")]
    MissingColumn { column: String },

    #[error("No identifier fields configured")]
    EmptyFieldList,

    #[error("Field configured more than once: {0}")]
    DuplicateField(String),

    #[error("Invalid threshold for field {field}: {reason}")]
    InvalidThreshold { field: String, reason: String },
}
