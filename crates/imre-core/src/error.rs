use thiserror::Error;

/// Top-level error type for the IMRE engine.
///
/// Collaborator failures and timeouts are the variants the dialogue layer
/// cares about: both are caught at the call site and degraded into a
/// scripted reply, never surfaced to the caller of `handle`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ImreError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("{service} failed: {message}")]
    Collaborator { service: String, message: String },

    #[error("{service} timed out after {millis} ms")]
    Timeout { service: String, millis: u64 },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl ImreError {
    /// Shorthand for a failed collaborator call.
    pub fn collaborator(service: impl Into<String>, message: impl Into<String>) -> Self {
        ImreError::Collaborator {
            service: service.into(),
            message: message.into(),
        }
    }

    /// True for failures a caller may retry with the same input.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ImreError::Collaborator { .. } | ImreError::Timeout { .. } | ImreError::Storage(_)
        )
    }
}

impl From<toml::de::Error> for ImreError {
    fn from(err: toml::de::Error) -> Self {
        ImreError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for ImreError {
    fn from(err: toml::ser::Error) -> Self {
        ImreError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for ImreError {
    fn from(err: serde_json::Error) -> Self {
        ImreError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for IMRE operations.
pub type Result<T> = std::result::Result<T, ImreError>;
