//! Orderflow: Ordering bounded context.
//!
//! Responsible for order creation, the order aggregate and its event
//! vocabulary, and the read-side port used for order lookups.

pub mod application;
pub mod domain;
