//! Application error types
//!
//! Process-level errors: configuration, startup, and I/O. Per-connection
//! protocol failures have their own taxonomy in the gateway crate and never
//! surface here.

use crate::config::ConfigError;

/// Application-wide error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Server error: {0}")]
    Server(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

/// Application result type alias
pub type AppResult<T> = Result<T, AppError>;
