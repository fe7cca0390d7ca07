//! Routes for the Ordering context.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tracing::{info, instrument};

use orderflow_ordering::application::{command_handlers, query_handlers};
use orderflow_ordering::domain::commands::CreateOrder;
use orderflow_ordering::domain::ports::OrderView;

use crate::error::ApiError;
use crate::state::AppState;

/// Response body of POST /orders.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderResponse {
    /// The created, or previously created, order.
    pub order_id: String,
}

/// POST /orders
///
/// 201 when the order was created, 200 when `clientRequestId` was already
/// used.
#[instrument(skip(state, request))]
async fn create_order(
    State(state): State<AppState>,
    request: Result<Json<CreateOrder>, JsonRejection>,
) -> Result<(StatusCode, Json<CreateOrderResponse>), ApiError> {
    let Json(command) = request?;

    info!(client_request_id = %command.client_request_id, "handling create_order command");

    let result = command_handlers::handle_create_order(
        &command,
        state.clock.as_ref(),
        &*state.event_log,
        &state.request_index,
    )
    .await?;

    let status = if result.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((
        status,
        Json(CreateOrderResponse {
            order_id: result.order_id,
        }),
    ))
}

/// GET /orders/{order_id}
#[instrument(skip(state))]
async fn get_order(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
) -> Result<Json<OrderView>, ApiError> {
    let view = query_handlers::get_order_by_id(&order_id, &*state.order_views).await?;
    Ok(Json(view))
}

/// Returns the router for the ordering context.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/orders", post(create_order))
        .route("/orders/{order_id}", get(get_order))
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use chrono::{TimeZone, Utc};
    use metrics_exporter_prometheus::PrometheusBuilder;
    use orderflow_core::clock::Clock;
    use orderflow_core::error::DomainError;
    use orderflow_core::event_log::EventLog;
    use orderflow_ordering::domain::ports::OrderViewRepository;
    use orderflow_outbox::SqliteOutboxStore;
    use orderflow_test_support::{FailingEventLog, FixedClock, InMemoryEventLog};
    use serde_json::Value;
    use sqlx::SqlitePool;
    use tower::ServiceExt;
    use uuid::Uuid;

    struct EmptyViews;

    #[async_trait]
    impl OrderViewRepository for EmptyViews {
        async fn find_by_id(&self, _order_id: &str) -> Result<Option<OrderView>, DomainError> {
            Ok(None)
        }
    }

    struct FailingViews;

    #[async_trait]
    impl OrderViewRepository for FailingViews {
        async fn find_by_id(&self, _order_id: &str) -> Result<Option<OrderView>, DomainError> {
            Err(DomainError::Infrastructure("read model unavailable".into()))
        }
    }

    fn app_state_with(
        event_log: Arc<dyn EventLog>,
        order_views: Arc<dyn OrderViewRepository>,
    ) -> AppState {
        let pool = SqlitePool::connect_lazy("sqlite::memory:").unwrap();
        let clock: Arc<dyn Clock> = Arc::new(FixedClock(
            Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap(),
        ));
        let outbox = SqliteOutboxStore::new(pool, Arc::clone(&clock));
        AppState::new(
            clock,
            event_log,
            order_views,
            outbox,
            PrometheusBuilder::new().build_recorder().handle(),
        )
    }

    fn order_body() -> Value {
        serde_json::json!({
            "clientRequestId": Uuid::new_v4(),
            "customerId": Uuid::new_v4(),
            "currency": "EUR",
            "items": [{"sku": "SKU-1", "quantity": 1, "unitPrice": 12.5}]
        })
    }

    fn post_order(body: &Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/orders")
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(body).unwrap()))
            .unwrap()
    }

    async fn json_of(response: axum::response::Response) -> Value {
        let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body_bytes).unwrap()
    }

    #[tokio::test]
    async fn test_create_order_returns_201_with_order_id() {
        // Arrange
        let log = Arc::new(InMemoryEventLog::new());
        let app = router().with_state(app_state_with(log.clone(), Arc::new(EmptyViews)));

        // Act
        let response = app.oneshot(post_order(&order_body())).await.unwrap();

        // Assert
        assert_eq!(response.status(), StatusCode::CREATED);
        let json = json_of(response).await;
        let order_id = json["orderId"].as_str().unwrap();
        Uuid::parse_str(order_id).unwrap();
        assert_eq!(log.events().len(), 1);
    }

    #[tokio::test]
    async fn test_create_order_returns_400_for_missing_fields() {
        // Arrange
        let app = router().with_state(app_state_with(
            Arc::new(InMemoryEventLog::new()),
            Arc::new(EmptyViews),
        ));

        // Act
        let response = app
            .oneshot(post_order(&serde_json::json!({"currency": "EUR"})))
            .await
            .unwrap();

        // Assert
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_of(response).await["error"], "validation_error");
    }

    #[tokio::test]
    async fn test_create_order_returns_500_when_log_fails() {
        // Arrange
        let app = router().with_state(app_state_with(
            Arc::new(FailingEventLog),
            Arc::new(EmptyViews),
        ));

        // Act
        let response = app.oneshot(post_order(&order_body())).await.unwrap();

        // Assert
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json_of(response).await["error"], "infrastructure_error");
    }

    #[tokio::test]
    async fn test_get_order_returns_500_when_read_model_fails() {
        let app = router().with_state(app_state_with(
            Arc::new(InMemoryEventLog::new()),
            Arc::new(FailingViews),
        ));
        let request = Request::builder()
            .method("GET")
            .uri("/orders/order-1")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
