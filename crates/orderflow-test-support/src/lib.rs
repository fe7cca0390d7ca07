//! Shared test doubles and utilities for Orderflow.

mod clock;
mod event_log;
mod metrics;

pub use clock::FixedClock;
pub use event_log::{FailingEventLog, InMemoryEventLog};
pub use metrics::RecordingLagRecorder;
