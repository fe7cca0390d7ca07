//! Orderflow event store: the durable, append-only global event log.

pub mod file_event_log;

pub use file_event_log::FileEventLog;
