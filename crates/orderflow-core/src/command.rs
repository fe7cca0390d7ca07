//! Command abstractions.

use uuid::Uuid;

/// Trait that all commands implement.
pub trait Command: Send + Sync + std::fmt::Debug {
    /// The type name for this command (for logging).
    fn command_type(&self) -> &'static str;

    /// Caller-supplied identifier that makes retries of this command
    /// idempotent.
    fn idempotency_key(&self) -> Uuid;
}
