//! Domain events for the Ordering context.

use orderflow_core::error::DomainError;
use orderflow_core::event::{DomainEvent, EventMetadata, StoredEvent};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Event type string for `OrderCreated`.
pub const ORDER_CREATED_EVENT_TYPE: &str = "order.created";
/// Event type string for `PaymentRequested`.
pub const PAYMENT_REQUESTED_EVENT_TYPE: &str = "payment.requested";

/// A single order line as recorded in `order.created`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    /// Stock keeping unit.
    pub sku: String,
    /// Quantity ordered, at least 1.
    pub quantity: i64,
    /// Price per unit, non-negative.
    pub unit_price: f64,
}

/// Emitted when an order is created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCreated {
    /// The order identifier.
    pub order_id: String,
    /// Caller-supplied idempotency key.
    pub client_request_id: Uuid,
    /// The ordering customer.
    pub customer_id: Uuid,
    /// Order lines.
    pub items: Vec<OrderItem>,
    /// Sum of `quantity * unit_price` over all items.
    pub total_amount: f64,
    /// ISO 4217 currency code.
    pub currency: String,
}

/// Emitted when payment is requested for an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequested {
    /// The order identifier.
    pub order_id: String,
    /// Caller-supplied idempotency key of the creating command.
    pub client_request_id: Uuid,
    /// Requested amount.
    pub amount: f64,
    /// ISO 4217 currency code.
    pub currency: String,
    /// Payment method, e.g. `card`.
    pub method: String,
}

/// Event payload variants for the Ordering context.
///
/// Event types this version does not know are kept as `Unrecognized` so
/// that newer producers never break older consumers.
#[derive(Debug, Clone, PartialEq)]
pub enum OrderEventKind {
    /// An order has been created.
    OrderCreated(OrderCreated),
    /// Payment has been requested for an order.
    PaymentRequested(PaymentRequested),
    /// Any other event type, payload untouched.
    Unrecognized {
        /// The original event type.
        event_type: String,
        /// The original payload.
        payload: serde_json::Value,
    },
}

impl OrderEventKind {
    /// Decodes a payload according to its event type.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Serialization` if a known event type carries a
    /// payload that does not match its schema.
    pub fn decode(event_type: &str, payload: &serde_json::Value) -> Result<Self, DomainError> {
        let kind = match event_type {
            ORDER_CREATED_EVENT_TYPE => Self::OrderCreated(decode_payload(event_type, payload)?),
            PAYMENT_REQUESTED_EVENT_TYPE => {
                Self::PaymentRequested(decode_payload(event_type, payload)?)
            }
            other => Self::Unrecognized {
                event_type: other.to_owned(),
                payload: payload.clone(),
            },
        };
        Ok(kind)
    }

    /// Returns the dotted event type name.
    #[must_use]
    pub fn event_type(&self) -> &str {
        match self {
            Self::OrderCreated(_) => ORDER_CREATED_EVENT_TYPE,
            Self::PaymentRequested(_) => PAYMENT_REQUESTED_EVENT_TYPE,
            Self::Unrecognized { event_type, .. } => event_type,
        }
    }

    /// Serializes the payload to JSON.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Serialization` if the payload cannot be encoded.
    pub fn to_payload(&self) -> Result<serde_json::Value, DomainError> {
        let payload = match self {
            Self::OrderCreated(payload) => serde_json::to_value(payload)?,
            Self::PaymentRequested(payload) => serde_json::to_value(payload)?,
            Self::Unrecognized { payload, .. } => payload.clone(),
        };
        Ok(payload)
    }
}

fn decode_payload<T: serde::de::DeserializeOwned>(
    event_type: &str,
    payload: &serde_json::Value,
) -> Result<T, DomainError> {
    T::deserialize(payload).map_err(|e| {
        DomainError::Serialization(format!("invalid {event_type} payload: {e}"))
    })
}

/// Domain event envelope for the Ordering context.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderEvent {
    /// Event metadata.
    pub metadata: EventMetadata,
    /// Event-specific payload.
    pub kind: OrderEventKind,
}

impl OrderEvent {
    /// Decodes a record read from the event log.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Serialization` if the payload does not match the
    /// schema of its event type.
    pub fn from_stored(stored: &StoredEvent) -> Result<Self, DomainError> {
        Ok(Self {
            metadata: stored.metadata.clone(),
            kind: OrderEventKind::decode(&stored.event_type, &stored.payload)?,
        })
    }

    /// Converts the event into the untyped envelope the log appends.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Serialization` if the payload cannot be encoded.
    pub fn to_domain_event(&self) -> Result<DomainEvent, DomainError> {
        Ok(DomainEvent {
            event_type: self.kind.event_type().to_owned(),
            payload: self.kind.to_payload()?,
            metadata: self.metadata.clone(),
        })
    }
}
