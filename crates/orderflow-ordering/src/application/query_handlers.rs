//! Query handlers for the Ordering context.
//!
//! Point lookups go to the read model. `load_order_state` instead folds the
//! raw log, for callers that cannot tolerate read-model lag.

use futures::TryStreamExt;
use orderflow_core::error::DomainError;
use orderflow_core::event_log::EventLog;

use crate::domain::aggregates::{OrderState, reduce_order};
use crate::domain::events::OrderEvent;
use crate::domain::ports::{OrderView, OrderViewRepository};

/// Retrieves an order from the read model.
///
/// # Errors
///
/// Returns `DomainError::NotFound` if the read model has no such order, or
/// the repository's error if the lookup fails.
pub async fn get_order_by_id(
    order_id: &str,
    repo: &dyn OrderViewRepository,
) -> Result<OrderView, DomainError> {
    repo.find_by_id(order_id)
        .await?
        .ok_or_else(|| DomainError::NotFound(format!("order {order_id} not found")))
}

/// Rebuilds an order's state from its events in the log.
///
/// # Errors
///
/// Returns the log's error if reading fails, or `DomainError::Serialization`
/// if one of the order's events is malformed.
pub async fn load_order_state(
    order_id: &str,
    log: &dyn EventLog,
) -> Result<OrderState, DomainError> {
    let events: Vec<OrderEvent> = log
        .stream(0)
        .try_filter(|stored| futures::future::ready(stored.metadata.aggregate_id == order_id))
        .and_then(|stored| futures::future::ready(OrderEvent::from_stored(&stored)))
        .try_collect()
        .await?;
    Ok(reduce_order(&events))
}
