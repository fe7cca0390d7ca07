//! Domain event envelope.
//!
//! Events are persisted as `{type, payload, metadata, offset}` JSON objects.
//! The payload stays an untyped JSON object at this layer; bounded contexts
//! decode it into their own closed event enums.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Metadata attached to every domain event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventMetadata {
    /// Globally unique event identifier. Doubles as the outbox message id.
    pub event_id: Uuid,
    /// Aggregate this event belongs to.
    pub aggregate_id: String,
    /// Per-aggregate sequence number starting at 1. Not the log offset.
    pub version: i64,
    /// RFC 3339 creation timestamp, kept verbatim.
    pub ts: String,
}

impl EventMetadata {
    /// Parses `ts`, returning `None` when it is not a valid RFC 3339 value.
    #[must_use]
    pub fn occurred_at(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.ts)
            .ok()
            .map(|ts| ts.with_timezone(&Utc))
    }
}

/// An event that has not been appended to the log yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainEvent {
    /// Dotted type name, e.g. `order.created`.
    #[serde(rename = "type")]
    pub event_type: String,
    /// Event-type-specific payload.
    pub payload: serde_json::Value,
    /// Event metadata.
    pub metadata: EventMetadata,
}

/// A domain event together with the log offset it was assigned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEvent {
    /// Dotted type name, e.g. `order.created`.
    #[serde(rename = "type")]
    pub event_type: String,
    /// Event-type-specific payload.
    pub payload: serde_json::Value,
    /// Event metadata.
    pub metadata: EventMetadata,
    /// Zero-based, gap-free position in the global log.
    pub offset: u64,
}

impl StoredEvent {
    /// Attaches an offset to a freshly appended event.
    #[must_use]
    pub fn new(event: DomainEvent, offset: u64) -> Self {
        Self {
            event_type: event.event_type,
            payload: event.payload,
            metadata: event.metadata,
            offset,
        }
    }

    /// Returns the event identifier.
    #[must_use]
    pub fn event_id(&self) -> Uuid {
        self.metadata.event_id
    }
}
