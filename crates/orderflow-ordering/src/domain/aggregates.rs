//! The order aggregate, rebuilt by folding its events.

use std::str::FromStr;

use orderflow_core::aggregate::{Aggregate, fold};
use orderflow_core::error::DomainError;
use serde::Serialize;
use uuid::Uuid;

use super::events::{OrderEvent, OrderEventKind};

/// Lifecycle status of an order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum OrderStatus {
    /// No `order.created` seen yet.
    #[default]
    Empty,
    /// The order exists; payment has not been requested.
    Created,
    /// Payment has been requested. Terminal in this scope.
    PaymentRequested,
}

impl OrderStatus {
    /// Returns the wire name of the status.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Created => "created",
            Self::PaymentRequested => "payment-requested",
        }
    }
}

impl FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "empty" => Ok(Self::Empty),
            "created" => Ok(Self::Created),
            "payment-requested" => Ok(Self::PaymentRequested),
            other => Err(DomainError::Serialization(format!(
                "unknown order status: {other}"
            ))),
        }
    }
}

/// Current state of one order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderState {
    /// Lifecycle status.
    pub status: OrderStatus,
    /// The order identifier, once created.
    pub order_id: Option<String>,
    /// Version of the last applied event.
    pub version: i64,
    /// Idempotency key of the creating command.
    pub client_request_id: Option<Uuid>,
    /// Order total.
    pub total_amount: Option<f64>,
    /// ISO 4217 currency code.
    pub currency: Option<String>,
    /// Whether payment has been requested.
    pub payment_requested: bool,
}

impl Aggregate for OrderState {
    type Event = OrderEvent;

    fn apply(&mut self, event: &OrderEvent) {
        match (&event.kind, self.status) {
            (OrderEventKind::OrderCreated(payload), OrderStatus::Empty) => {
                *self = Self {
                    status: OrderStatus::Created,
                    order_id: Some(payload.order_id.clone()),
                    version: event.metadata.version,
                    client_request_id: Some(payload.client_request_id),
                    total_amount: Some(payload.total_amount),
                    currency: Some(payload.currency.clone()),
                    payment_requested: false,
                };
            }
            (OrderEventKind::PaymentRequested(_), OrderStatus::Created) => {
                self.status = OrderStatus::PaymentRequested;
                self.version = event.metadata.version;
                self.payment_requested = true;
            }
            // Illegal transitions and unknown event types leave the state
            // unchanged.
            _ => {}
        }
    }
}

/// Folds an order's events, in offset order, into its current state.
#[must_use]
pub fn reduce_order(events: &[OrderEvent]) -> OrderState {
    fold(events)
}

#[cfg(test)]
mod tests {
    use orderflow_core::event::EventMetadata;
    use serde_json::json;

    use super::*;
    use crate::domain::events::{OrderCreated, OrderItem, PaymentRequested};

    fn metadata(version: i64) -> EventMetadata {
        EventMetadata {
            event_id: Uuid::new_v4(),
            aggregate_id: "order-1".to_owned(),
            version,
            ts: "2026-01-15T10:00:00.000Z".to_owned(),
        }
    }

    fn created(client_request_id: Uuid) -> OrderEvent {
        OrderEvent {
            metadata: metadata(1),
            kind: OrderEventKind::OrderCreated(OrderCreated {
                order_id: "order-1".to_owned(),
                client_request_id,
                customer_id: Uuid::new_v4(),
                items: vec![OrderItem {
                    sku: "SKU-1".to_owned(),
                    quantity: 3,
                    unit_price: 2.5,
                }],
                total_amount: 7.5,
                currency: "USD".to_owned(),
            }),
        }
    }

    fn payment_requested(version: i64) -> OrderEvent {
        OrderEvent {
            metadata: metadata(version),
            kind: OrderEventKind::PaymentRequested(PaymentRequested {
                order_id: "order-1".to_owned(),
                client_request_id: Uuid::new_v4(),
                amount: 7.5,
                currency: "USD".to_owned(),
                method: "card".to_owned(),
            }),
        }
    }

    fn unrecognized(version: i64) -> OrderEvent {
        OrderEvent {
            metadata: metadata(version),
            kind: OrderEventKind::Unrecognized {
                event_type: "order.shipped".to_owned(),
                payload: json!({}),
            },
        }
    }

    #[test]
    fn test_reduce_of_no_events_is_empty() {
        let state = reduce_order(&[]);

        assert_eq!(state, OrderState::default());
        assert_eq!(state.status, OrderStatus::Empty);
        assert_eq!(state.version, 0);
    }

    #[test]
    fn test_order_created_sets_order_fields() {
        let client_request_id = Uuid::new_v4();

        let state = reduce_order(&[created(client_request_id)]);

        assert_eq!(state.status, OrderStatus::Created);
        assert_eq!(state.order_id.as_deref(), Some("order-1"));
        assert_eq!(state.version, 1);
        assert_eq!(state.client_request_id, Some(client_request_id));
        assert_eq!(state.total_amount, Some(7.5));
        assert_eq!(state.currency.as_deref(), Some("USD"));
        assert!(!state.payment_requested);
    }

    #[test]
    fn test_payment_requested_after_created() {
        let state = reduce_order(&[created(Uuid::new_v4()), payment_requested(2)]);

        assert_eq!(state.status, OrderStatus::PaymentRequested);
        assert_eq!(state.version, 2);
        assert!(state.payment_requested);
        assert_eq!(state.total_amount, Some(7.5));
    }

    #[test]
    fn test_payment_requested_on_empty_order_is_ignored() {
        let state = reduce_order(&[payment_requested(2)]);

        assert_eq!(state, OrderState::default());
    }

    #[test]
    fn test_no_transition_out_of_payment_requested() {
        let first = Uuid::new_v4();

        let state = reduce_order(&[
            created(first),
            payment_requested(2),
            created(Uuid::new_v4()),
            payment_requested(4),
        ]);

        assert_eq!(state.status, OrderStatus::PaymentRequested);
        assert_eq!(state.version, 2);
        assert_eq!(state.client_request_id, Some(first));
    }

    #[test]
    fn test_unrecognized_event_leaves_state_unchanged() {
        let before = reduce_order(&[created(Uuid::new_v4())]);

        let after = reduce_order(&[
            created(before.client_request_id.unwrap()),
            unrecognized(2),
        ]);

        assert_eq!(after, before);
    }

    #[test]
    fn test_status_wire_names() {
        assert_eq!(OrderStatus::Empty.as_str(), "empty");
        assert_eq!(OrderStatus::Created.as_str(), "created");
        assert_eq!(OrderStatus::PaymentRequested.as_str(), "payment-requested");
        assert_eq!(
            "payment-requested".parse::<OrderStatus>().unwrap(),
            OrderStatus::PaymentRequested
        );
        assert!("shipped".parse::<OrderStatus>().is_err());
    }
}
