//! Orderflow Core: shared event-sourcing abstractions.
//!
//! This crate defines the event envelope, the append-only log contract,
//! aggregate folding, the projection contract and the metrics sink that the
//! other crates build on. It contains no infrastructure code beyond the `metrics` facade.

pub mod aggregate;
pub mod clock;
pub mod command;
pub mod error;
pub mod event;
pub mod event_log;
pub mod metrics;
pub mod projection;
