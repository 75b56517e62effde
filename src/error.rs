//! Error types for semantic-history

use thiserror::Error;

/// Errors that can occur while mapping an export
#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("Failed to parse export: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed timeline entry: {0}")]
    MalformedEntry(String),

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),
}
