//! Error types for the sync layer.

use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur in sync operations.
#[derive(Debug, Clone, Error)]
pub enum SyncError {
    /// A referenced record or share link does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The active principal may not modify the record.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The host application rejected a request.
    #[error("host rejected {operation}: {detail}")]
    ExternalWriteFailure { operation: String, detail: String },

    /// A record failed shape checks on read.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Remote store error.
    #[error("remote store error: {0}")]
    Remote(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Channel closed.
    #[error("channel closed")]
    ChannelClosed,
}

impl From<serde_json::Error> for SyncError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

impl From<profilecloud_model::ModelError> for SyncError {
    fn from(e: profilecloud_model::ModelError) -> Self {
        Self::Validation(e.to_string())
    }
}
