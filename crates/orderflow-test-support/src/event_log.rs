//! Test event logs: in-memory `EventLog` implementations for tests.

use std::sync::Mutex;

use async_trait::async_trait;
use futures::StreamExt;
use orderflow_core::error::DomainError;
use orderflow_core::event::{DomainEvent, StoredEvent};
use orderflow_core::event_log::{EventLog, EventStream};

/// An event log held in memory. Offsets are assigned exactly like the file
/// log: zero-based and gap-free. `stream` reads a snapshot taken at call
/// time.
#[derive(Debug, Default)]
pub struct InMemoryEventLog {
    events: Mutex<Vec<StoredEvent>>,
}

impl InMemoryEventLog {
    /// Create an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a log already holding `events`, assigned offsets in order.
    #[must_use]
    pub fn with_events(events: impl IntoIterator<Item = DomainEvent>) -> Self {
        let events = events
            .into_iter()
            .enumerate()
            .map(|(offset, event)| StoredEvent::new(event, offset as u64))
            .collect();
        Self {
            events: Mutex::new(events),
        }
    }

    /// Returns a snapshot of all stored events.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn events(&self) -> Vec<StoredEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventLog for InMemoryEventLog {
    async fn append(&self, event: DomainEvent) -> Result<StoredEvent, DomainError> {
        let mut events = self.events.lock().unwrap();
        let stored = StoredEvent::new(event, events.len() as u64);
        events.push(stored.clone());
        Ok(stored)
    }

    fn stream(&self, from_offset: u64) -> EventStream<'_> {
        let snapshot: Vec<Result<StoredEvent, DomainError>> = self
            .events
            .lock()
            .unwrap()
            .iter()
            .filter(|event| event.offset >= from_offset)
            .cloned()
            .map(Ok)
            .collect();
        futures::stream::iter(snapshot).boxed()
    }
}

/// An event log that always returns an infrastructure error. Useful for
/// testing error-handling paths.
#[derive(Debug)]
pub struct FailingEventLog;

#[async_trait]
impl EventLog for FailingEventLog {
    async fn append(&self, _event: DomainEvent) -> Result<StoredEvent, DomainError> {
        Err(DomainError::Infrastructure("disk unavailable".into()))
    }

    fn stream(&self, _from_offset: u64) -> EventStream<'_> {
        futures::stream::once(async {
            Err(DomainError::Infrastructure("disk unavailable".into()))
        })
        .boxed()
    }
}
