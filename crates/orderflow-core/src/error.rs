//! Domain error types.

use thiserror::Error;

/// Top-level domain error type.
#[derive(Debug, Error)]
pub enum DomainError {
    /// A command was malformed or violated a business rule. Nothing was
    /// written.
    #[error("validation error: {0}")]
    Validation(String),

    /// A point lookup found nothing.
    #[error("not found: {0}")]
    NotFound(String),

    /// The event log or a store was unavailable.
    #[error("infrastructure error: {0}")]
    Infrastructure(String),

    /// A stored record or payload could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The external broker rejected or failed to acknowledge a publish.
    #[error("delivery error: {0}")]
    Delivery(String),
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
