//! Error types for the entity model.

use thiserror::Error;

/// Result type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors raised while reading or converting config records.
#[derive(Debug, Error)]
pub enum ModelError {
    /// The record's shape does not match its declared kind.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
