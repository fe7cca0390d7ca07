//! Orderflow: query side.
//!
//! A generic catch-up [`Projector`] folds the event log into a SQLite read
//! model, checkpointing after every event so a restart resumes where it
//! left off.

pub mod checkpoint;
pub mod db;
pub mod order_view_projection;
pub mod order_view_store;
pub mod projector;

pub use checkpoint::SqliteCheckpointStore;
pub use order_view_projection::{ORDER_PROJECTOR_NAME, OrderViewProjection};
pub use order_view_store::SqliteOrderViewStore;
pub use projector::Projector;
