//! Error types shared across the workspace

use thiserror::Error;

/// Result type alias for common operations
pub type Result<T> = std::result::Result<T, RetrofitError>;

/// Main error type for the shared domain types
#[derive(Error, Debug)]
pub enum RetrofitError {
    #[error("Invalid CSV content type: {0}")]
    InvalidContentType(String),

    #[error("Invalid register job trigger: {0}")]
    InvalidTrigger(String),

    #[error("Invalid register job status: {0}")]
    InvalidStatus(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl RetrofitError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}
