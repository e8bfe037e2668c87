//! Error types for the Quill server
//!
//! This module contains the error types used throughout the server.

use quill_content::ContentError;
use thiserror::Error;

/// Server error types
#[derive(Error, Debug)]
pub enum ServerError {
    /// Resource not found
    #[error("{0} not found")]
    NotFound(String),

    /// Validation error
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Unauthorized error
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Content repository error
    #[error("Content repository error: {0}")]
    ContentError(ContentError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Internal server error
    #[error("Internal server error: {0}")]
    InternalError(String),
}

/// Result type for server operations
pub type ServerResult<T> = Result<T, ServerError>;

// Implement conversions from other error types
impl From<ContentError> for ServerError {
    fn from(err: ContentError) -> Self {
        match err {
            ContentError::Unauthorized => {
                ServerError::Unauthorized("incorrect publish credential".to_string())
            }
            ContentError::NotFound { kind, id } => {
                ServerError::NotFound(format!("{} {}", kind, id))
            }
            other => ServerError::ContentError(other),
        }
    }
}

impl From<std::io::Error> for ServerError {
    fn from(err: std::io::Error) -> Self {
        ServerError::InternalError(format!("IO error: {}", err))
    }
}

impl From<anyhow::Error> for ServerError {
    fn from(err: anyhow::Error) -> Self {
        ServerError::InternalError(format!("Error: {}", err))
    }
}
