//! Outbox message model.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use orderflow_core::error::DomainError;
use orderflow_core::event::StoredEvent;
use serde::Serialize;
use uuid::Uuid;

/// Delivery status of an outbox message. `Sent` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutboxStatus {
    /// Awaiting (re)delivery.
    Pending,
    /// Acknowledged by the broker.
    Sent,
    /// Gave up after the maximum number of attempts.
    Failed,
}

impl OutboxStatus {
    /// Returns the stored name of the status.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Sent => "sent",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for OutboxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutboxStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "sent" => Ok(Self::Sent),
            "failed" => Ok(Self::Failed),
            other => Err(DomainError::Serialization(format!(
                "unknown outbox status: {other}"
            ))),
        }
    }
}

/// One integration message staged for delivery.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboxMessage {
    /// Equal to the event id, which makes enqueueing idempotent.
    pub message_id: Uuid,
    /// The event to deliver, published verbatim.
    pub event: StoredEvent,
    /// Delivery status.
    pub status: OutboxStatus,
    /// Failed delivery attempts so far.
    pub attempts: u32,
    /// Earliest time of the next delivery attempt.
    pub next_attempt_at: DateTime<Utc>,
    /// Time of the last failed attempt.
    pub last_attempt_at: Option<DateTime<Utc>>,
    /// Error of the last failed attempt.
    pub last_error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trips_through_its_stored_name() {
        for status in [OutboxStatus::Pending, OutboxStatus::Sent, OutboxStatus::Failed] {
            assert_eq!(status.as_str().parse::<OutboxStatus>().unwrap(), status);
        }
        assert!("queued".parse::<OutboxStatus>().is_err());
    }
}
