//! Command handlers for the Ordering context.
//!
//! This module contains application-level command handler functions that
//! orchestrate domain logic: validate, check idempotency, append events.

use orderflow_core::clock::{Clock, to_event_timestamp};
use orderflow_core::command::Command;
use orderflow_core::error::DomainError;
use orderflow_core::event::EventMetadata;
use orderflow_core::event_log::EventLog;
use tracing::info;
use uuid::Uuid;

use crate::application::request_index::ClientRequestIndex;
use crate::domain::commands::CreateOrder;
use crate::domain::events::{
    OrderCreated, OrderEvent, OrderEventKind, OrderItem, PaymentRequested,
};

/// Result of a successfully handled `CreateOrder`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateOrderResult {
    /// The created (or previously created) order.
    pub order_id: String,
    /// `false` when the command was a duplicate of an earlier one.
    pub created: bool,
}

/// Handles the `CreateOrder` command.
///
/// Returns the existing order unchanged when the `client_request_id` has
/// already been used. Otherwise appends `order.created` (version 1) and, when
/// a payment is supplied, `payment.requested` (version 2). The two appends
/// are independent: a failure of the second leaves the order created
/// without a payment request.
///
/// # Errors
///
/// Returns `DomainError::Validation` if the command is malformed or its
/// payment does not match the order, and the log's error if reading or
/// appending fails.
pub async fn handle_create_order(
    command: &CreateOrder,
    clock: &dyn Clock,
    log: &dyn EventLog,
    index: &ClientRequestIndex,
) -> Result<CreateOrderResult, DomainError> {
    command.validate()?;

    let mut requests = index.lock().await;
    requests.catch_up(log).await?;
    if let Some(order_id) = requests.order_for(command.idempotency_key()) {
        info!(
            client_request_id = %command.client_request_id,
            order_id,
            "duplicate create order request"
        );
        return Ok(CreateOrderResult {
            order_id: order_id.to_owned(),
            created: false,
        });
    }

    let total_amount = command.total_amount();
    command.validate_payment(total_amount)?;

    let order_id = Uuid::new_v4().to_string();
    let created = OrderEvent {
        metadata: metadata(&order_id, 1, clock),
        kind: OrderEventKind::OrderCreated(OrderCreated {
            order_id: order_id.clone(),
            client_request_id: command.client_request_id,
            customer_id: command.customer_id,
            items: command
                .items
                .iter()
                .map(|item| OrderItem {
                    sku: item.sku.clone(),
                    quantity: item.quantity,
                    unit_price: item.unit_price,
                })
                .collect(),
            total_amount,
            currency: command.currency.clone(),
        }),
    };
    let stored = log.append(created.to_domain_event()?).await?;
    requests.observe(&stored);
    info!(
        command = command.command_type(),
        order_id = %order_id,
        offset = stored.offset,
        "order created"
    );

    if let Some(payment) = &command.payment {
        let requested = OrderEvent {
            metadata: metadata(&order_id, 2, clock),
            kind: OrderEventKind::PaymentRequested(PaymentRequested {
                order_id: order_id.clone(),
                client_request_id: command.client_request_id,
                amount: payment.amount,
                currency: payment.currency.clone(),
                method: payment.method.clone(),
            }),
        };
        let stored = log.append(requested.to_domain_event()?).await?;
        requests.observe(&stored);
        info!(order_id = %order_id, offset = stored.offset, "payment requested");
    }

    Ok(CreateOrderResult {
        order_id,
        created: true,
    })
}

fn metadata(order_id: &str, version: i64, clock: &dyn Clock) -> EventMetadata {
    EventMetadata {
        event_id: Uuid::new_v4(),
        aggregate_id: order_id.to_owned(),
        version,
        ts: to_event_timestamp(clock.now()),
    }
}
