//! Streaming errors.

use thiserror::Error;

/// Errors raised by the reveal layer.
#[derive(Debug, Error)]
pub enum StreamError {
    /// Invalid configuration value.
    #[error("Invalid streaming config: {0}")]
    InvalidConfig(String),

    /// JSON parse error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for streaming operations.
pub type StreamResult<T> = Result<T, StreamError>;
