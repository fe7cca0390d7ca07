//! Commands for the Ordering context.

use orderflow_core::command::Command;
use orderflow_core::error::DomainError;
use serde::Deserialize;
use uuid::Uuid;

/// Maximum allowed difference between a payment amount and the order total.
pub const AMOUNT_TOLERANCE: f64 = 1e-6;

/// One requested order line.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemInput {
    /// Stock keeping unit.
    pub sku: String,
    /// Quantity ordered.
    pub quantity: i64,
    /// Price per unit.
    pub unit_price: f64,
}

/// Optional payment request attached to an order.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInput {
    /// Payment method, e.g. `card`.
    pub method: String,
    /// Amount to request; must match the order total.
    pub amount: f64,
    /// Must match the order currency.
    pub currency: String,
}

/// Command to create an order, optionally requesting payment for it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrder {
    /// Caller-supplied idempotency key.
    pub client_request_id: Uuid,
    /// The ordering customer.
    pub customer_id: Uuid,
    /// ISO 4217 currency code.
    pub currency: String,
    /// Order lines.
    pub items: Vec<OrderItemInput>,
    /// Optional payment request.
    #[serde(default)]
    pub payment: Option<PaymentInput>,
}

impl Command for CreateOrder {
    fn command_type(&self) -> &'static str {
        "ordering.create_order"
    }

    fn idempotency_key(&self) -> Uuid {
        self.client_request_id
    }
}

impl CreateOrder {
    /// Checks the shape of the command: currency codes, item lines, and
    /// payment fields.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` naming the first offending field.
    pub fn validate(&self) -> Result<(), DomainError> {
        if !is_currency_code(&self.currency) {
            return Err(invalid("currency must be a 3-letter uppercase code"));
        }
        if self.items.is_empty() {
            return Err(invalid("items must not be empty"));
        }
        for (index, item) in self.items.iter().enumerate() {
            if item.sku.trim().is_empty() {
                return Err(invalid(format!("items[{index}].sku must not be blank")));
            }
            if item.quantity < 1 {
                return Err(invalid(format!("items[{index}].quantity must be at least 1")));
            }
            if !is_non_negative(item.unit_price) {
                return Err(invalid(format!(
                    "items[{index}].unitPrice must be a non-negative number"
                )));
            }
        }
        if let Some(payment) = &self.payment {
            if payment.method.trim().is_empty() {
                return Err(invalid("payment.method must not be blank"));
            }
            if !is_non_negative(payment.amount) {
                return Err(invalid("payment.amount must be a non-negative number"));
            }
            if !is_currency_code(&payment.currency) {
                return Err(invalid("payment.currency must be a 3-letter uppercase code"));
            }
        }
        Ok(())
    }

    /// Sum of `quantity * unit_price` over all items.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn total_amount(&self) -> f64 {
        self.items
            .iter()
            .map(|item| item.quantity as f64 * item.unit_price)
            .sum()
    }

    /// Checks the payment against the order: same currency, and an amount
    /// within [`AMOUNT_TOLERANCE`] of `total_amount`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` on a currency or amount mismatch.
    pub fn validate_payment(&self, total_amount: f64) -> Result<(), DomainError> {
        let Some(payment) = &self.payment else {
            return Ok(());
        };
        if payment.currency != self.currency {
            return Err(invalid("payment currency must match order currency"));
        }
        if (payment.amount - total_amount).abs() > AMOUNT_TOLERANCE {
            return Err(invalid("payment amount must match order total"));
        }
        Ok(())
    }
}

fn is_currency_code(value: &str) -> bool {
    value.len() == 3 && value.bytes().all(|b| b.is_ascii_uppercase())
}

fn is_non_negative(value: f64) -> bool {
    value.is_finite() && value >= 0.0
}

fn invalid(message: impl Into<String>) -> DomainError {
    DomainError::Validation(message.into())
}
