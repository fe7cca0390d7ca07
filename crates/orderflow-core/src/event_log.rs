//! Append-only event log abstraction.

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::DomainError;
use crate::event::{DomainEvent, StoredEvent};

/// A finite, lazily produced read of the log.
pub type EventStream<'a> = BoxStream<'a, Result<StoredEvent, DomainError>>;

/// A single global, offset-ordered log of domain events.
#[async_trait]
pub trait EventLog: Send + Sync {
    /// Assigns the next offset, durably persists the record and returns it.
    ///
    /// Concurrent callers never observe a lost or duplicated offset.
    async fn append(&self, event: DomainEvent) -> Result<StoredEvent, DomainError>;

    /// Reads every record with `offset >= from_offset` in increasing offset
    /// order and ends when the log is exhausted. Each call starts a fresh
    /// read; appends racing with the read may or may not be observed.
    fn stream(&self, from_offset: u64) -> EventStream<'_>;
}
