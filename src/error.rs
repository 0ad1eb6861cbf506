//! Error types for CVC Sentinel

use thiserror::Error;

/// Errors that can occur at the engine boundary.
///
/// Scoring itself never fails; these cover parsing, identity and state handling.
#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("Failed to parse submission: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Encoding error: {0}")]
    EncodingError(String),

    #[error("State error: {0}")]
    StateError(String),
}
