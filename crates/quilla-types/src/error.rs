//! Error types for quilla.

use thiserror::Error;

/// Result type alias for quilla operations.
pub type Result<T> = std::result::Result<T, QuillaError>;

/// Errors that can occur while assembling or replaying bar data.
#[derive(Error, Debug)]
pub enum QuillaError {
    /// Session schedule or slice table construction failed.
    #[error("Session error: {0}")]
    Session(String),

    /// Invalid input data.
    #[error("Parse error: {0}")]
    Parse(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
