//! Orderflow: transactional outbox.
//!
//! Integration events are staged in a SQLite `outbox_messages` table by the
//! [`OutboxRelay`] projection and delivered to the broker by the
//! [`OutboxDispatcher`], at least once, with exponential backoff.

pub mod dispatcher;
pub mod message;
pub mod publisher;
pub mod relay;
pub mod store;

pub use dispatcher::{DispatcherConfig, FaultInjection, OutboxDispatcher};
pub use message::{OutboxMessage, OutboxStatus};
pub use publisher::{IntegrationEventPublisher, RabbitMqPublisher};
pub use relay::{OUTBOX_RELAY_NAME, OutboxRelay};
pub use store::{SqliteOutboxStore, StatusCounts};
