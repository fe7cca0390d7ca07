//! Ports the Ordering context depends on.

use async_trait::async_trait;
use orderflow_core::error::DomainError;
use serde::Serialize;
use uuid::Uuid;

use super::aggregates::OrderStatus;
use super::events::OrderItem;

/// Denormalized read-model row for one order, keyed by `order_id`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderView {
    /// The order identifier.
    pub order_id: String,
    /// Idempotency key of the creating command.
    pub client_request_id: Uuid,
    /// The ordering customer.
    pub customer_id: Uuid,
    /// Order lines.
    pub items: Vec<OrderItem>,
    /// Order total.
    pub total_amount: f64,
    /// ISO 4217 currency code.
    pub currency: String,
    /// Lifecycle status.
    pub status: OrderStatus,
    /// Whether payment has been requested.
    pub payment_requested: bool,
    /// Version of the last applied event.
    pub version: i64,
    /// `ts` of the `order.created` event.
    pub created_at: String,
    /// `ts` of the last applied event.
    pub updated_at: String,
}

/// Read access to the order read model.
#[async_trait]
pub trait OrderViewRepository: Send + Sync {
    /// Looks up one order by id.
    async fn find_by_id(&self, order_id: &str) -> Result<Option<OrderView>, DomainError>;
}
