//! Error types for the Conductor Server
//!
//! This module contains the error types used throughout the server.

use conductor_core::CoreError;
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

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Call to a registered service failed
    #[error("Dispatch error: {0}")]
    DispatchError(String),

    /// Internal server error
    #[error("Internal server error: {0}")]
    InternalError(String),
}

/// Result type for server operations
pub type ServerResult<T> = Result<T, ServerError>;

impl From<CoreError> for ServerError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::NotFound(name) => ServerError::NotFound(format!("Service '{}'", name)),
            CoreError::InvalidEntry(msg) | CoreError::ValidationError(msg) => {
                ServerError::ValidationError(msg)
            }
            CoreError::SerializationError(msg) => ServerError::ValidationError(msg),
            CoreError::ConfigurationError(msg) => ServerError::ConfigError(msg),
            CoreError::ExternalDependencyError(msg) => ServerError::DispatchError(msg),
            other => ServerError::InternalError(other.to_string()),
        }
    }
}

impl From<reqwest::Error> for ServerError {
    fn from(err: reqwest::Error) -> Self {
        ServerError::DispatchError(format!("HTTP request error: {}", err))
    }
}

impl From<std::io::Error> for ServerError {
    fn from(err: std::io::Error) -> Self {
        ServerError::InternalError(format!("IO error: {}", err))
    }
}
