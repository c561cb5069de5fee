//! Core type definitions for ProfileCloud.
//!
//! This crate defines the small, domain-agnostic types every other crate
//! agrees on:
//! - Record, application and principal identifiers
//! - A millisecond timestamp that tolerates the shapes both config sources
//!   produce on read
//!
//! Entity shapes (profiles, presets, snippets) live in `profilecloud-model`.

mod ids;
mod timestamp;

pub use ids::{ApplicationId, PrincipalId, RecordId};
pub use timestamp::Timestamp;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("identifier must not be empty")]
    EmptyId,
}
