//! Domain errors for the kindred matching client.

use thiserror::Error;

/// Domain-level errors that can occur outside of backend transport.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("No user identity available for this session")]
    MissingIdentity,

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Malformed payload for {source_id}: {reason}")]
    MalformedPayload { source_id: String, reason: String },

    #[error("Operation already in progress: {0}")]
    Busy(String),
}

pub type DomainResult<T> = Result<T, DomainError>;

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::SerializationError(err.to_string())
    }
}
