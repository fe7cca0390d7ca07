//! SQLite-backed order read model.
//!
//! Both writes are idempotent: replaying an event after a crash leaves the
//! row exactly as the first application did.

use async_trait::async_trait;
use orderflow_core::error::DomainError;
use orderflow_core::event::EventMetadata;
use orderflow_ordering::domain::aggregates::OrderStatus;
use orderflow_ordering::domain::events::{OrderCreated, OrderItem, PaymentRequested};
use orderflow_ordering::domain::ports::{OrderView, OrderViewRepository};
use sqlx::SqlitePool;
use uuid::Uuid;

/// Read-model store for `OrderView` rows.
#[derive(Debug, Clone)]
pub struct SqliteOrderViewStore {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct OrderViewRow {
    order_id: String,
    client_request_id: String,
    customer_id: String,
    items_json: String,
    total_amount: f64,
    currency: String,
    status: String,
    payment_requested: i64,
    version: i64,
    created_at: String,
    updated_at: String,
}

impl TryFrom<OrderViewRow> for OrderView {
    type Error = DomainError;

    fn try_from(row: OrderViewRow) -> Result<Self, Self::Error> {
        let items: Vec<OrderItem> = serde_json::from_str(&row.items_json)?;
        Ok(Self {
            client_request_id: parse_uuid(&row.client_request_id)?,
            customer_id: parse_uuid(&row.customer_id)?,
            status: row.status.parse()?,
            order_id: row.order_id,
            items,
            total_amount: row.total_amount,
            currency: row.currency,
            payment_requested: row.payment_requested != 0,
            version: row.version,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn parse_uuid(value: &str) -> Result<Uuid, DomainError> {
    Uuid::parse_str(value)
        .map_err(|e| DomainError::Serialization(format!("invalid uuid {value:?}: {e}")))
}

fn sql_error(action: &str, err: &sqlx::Error) -> DomainError {
    DomainError::Infrastructure(format!("failed to {action}: {err}"))
}

impl SqliteOrderViewStore {
    /// Creates a store over `pool`.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Inserts the order, or overwrites every column if it already exists
    /// at the same or an older version. A view that has moved past the
    /// creation event is left alone.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the write fails.
    pub async fn upsert_created(
        &self,
        created: &OrderCreated,
        metadata: &EventMetadata,
    ) -> Result<(), DomainError> {
        let items_json = serde_json::to_string(&created.items)?;
        sqlx::query(
            "INSERT INTO order_views (
                order_id, client_request_id, customer_id, items_json, total_amount,
                currency, status, payment_requested, version, created_at, updated_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?, 0, ?, ?, ?)
             ON CONFLICT(order_id) DO UPDATE SET
                client_request_id = excluded.client_request_id,
                customer_id = excluded.customer_id,
                items_json = excluded.items_json,
                total_amount = excluded.total_amount,
                currency = excluded.currency,
                status = excluded.status,
                payment_requested = excluded.payment_requested,
                version = excluded.version,
                created_at = excluded.created_at,
                updated_at = excluded.updated_at
             WHERE order_views.version <= excluded.version",
        )
        .bind(&created.order_id)
        .bind(created.client_request_id.to_string())
        .bind(created.customer_id.to_string())
        .bind(items_json)
        .bind(created.total_amount)
        .bind(&created.currency)
        .bind(OrderStatus::Created.as_str())
        .bind(metadata.version)
        .bind(&metadata.ts)
        .bind(&metadata.ts)
        .execute(&self.pool)
        .await
        .map_err(|e| sql_error("upsert order view", &e))?;
        Ok(())
    }

    /// Marks the order as payment-requested. A missing order is left alone.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the write fails.
    pub async fn mark_payment_requested(
        &self,
        requested: &PaymentRequested,
        metadata: &EventMetadata,
    ) -> Result<(), DomainError> {
        let result = sqlx::query(
            "UPDATE order_views
             SET status = ?, payment_requested = 1, version = ?, updated_at = ?
             WHERE order_id = ?",
        )
        .bind(OrderStatus::PaymentRequested.as_str())
        .bind(metadata.version)
        .bind(&metadata.ts)
        .bind(&requested.order_id)
        .execute(&self.pool)
        .await
        .map_err(|e| sql_error("mark payment requested", &e))?;

        if result.rows_affected() == 0 {
            tracing::warn!(
                order_id = %requested.order_id,
                "payment.requested for an order missing from the read model"
            );
        }
        Ok(())
    }
}

#[async_trait]
impl OrderViewRepository for SqliteOrderViewStore {
    async fn find_by_id(&self, order_id: &str) -> Result<Option<OrderView>, DomainError> {
        let row: Option<OrderViewRow> = sqlx::query_as(
            "SELECT order_id, client_request_id, customer_id, items_json, total_amount,
                    currency, status, payment_requested, version, created_at, updated_at
             FROM order_views
             WHERE order_id = ?",
        )
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| sql_error("load order view", &e))?;

        row.map(OrderView::try_from).transpose()
    }
}
