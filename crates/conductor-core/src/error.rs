use thiserror::Error;

/// Core error type for the Conductor runtime
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Registration input is missing a required field
    #[error("Invalid service entry: {0}")]
    InvalidEntry(String),

    /// Lookup of an unknown service name
    #[error("Service not found: {0}")]
    NotFound(String),

    /// A step executor failed
    #[error("Step '{step_id}' failed: {message}")]
    StepExecutionFailure {
        /// Id of the failing step
        step_id: String,
        /// Message reported by the executor
        message: String,
    },

    /// Execution was cancelled before the named step started
    #[error("Workflow cancelled before step '{0}'")]
    Cancelled(String),

    /// Validation error
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// External dependency error
    #[error("External dependency error: {0}")]
    ExternalDependencyError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl CoreError {
    /// Message without the variant prefix, used when an executor error is
    /// folded into a [`CoreError::StepExecutionFailure`].
    pub fn detail(&self) -> String {
        match self {
            CoreError::StepExecutionFailure { message, .. } => message.clone(),
            CoreError::Other(message) => message.clone(),
            other => other.to_string(),
        }
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::SerializationError(err.to_string())
    }
}

impl From<String> for CoreError {
    fn from(err: String) -> Self {
        CoreError::Other(err)
    }
}

impl From<&str> for CoreError {
    fn from(err: &str) -> Self {
        CoreError::Other(err.to_string())
    }
}
