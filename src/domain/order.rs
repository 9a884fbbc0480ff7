use std::fmt;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::DomainError;
use super::status::OrderStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMethod {
    Delivery,
    Pickup,
}

impl DeliveryMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryMethod::Delivery => "delivery",
            DeliveryMethod::Pickup => "pickup",
        }
    }
}

impl fmt::Display for DeliveryMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeliveryMethod {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "delivery" => Ok(DeliveryMethod::Delivery),
            "pickup" => Ok(DeliveryMethod::Pickup),
            other => Err(DomainError::InvalidInput(format!(
                "unknown delivery method '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
    Expired,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Expired => "expired",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "paid" => Ok(PaymentStatus::Paid),
            "failed" => Ok(PaymentStatus::Failed),
            "expired" => Ok(PaymentStatus::Expired),
            other => Err(DomainError::InvalidInput(format!(
                "unknown payment status '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderItemInput {
    pub title: String,
    pub quantity: i32,
    pub unit_price: BigDecimal,
}

/// Checkout hand-off: everything needed to record a new order.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    pub delivery_method: DeliveryMethod,
    pub shipping_address: Option<String>,
    pub items: Vec<OrderItemInput>,
    pub shipping_fee: BigDecimal,
    pub discount: BigDecimal,
    pub coupon_code: Option<String>,
}

impl NewOrder {
    pub fn subtotal(&self) -> BigDecimal {
        self.items
            .iter()
            .map(|i| &i.unit_price * BigDecimal::from(i.quantity))
            .sum()
    }

    pub fn total(&self) -> BigDecimal {
        self.subtotal() + &self.shipping_fee - &self.discount
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.items.is_empty() {
            return Err(DomainError::InvalidInput(
                "an order needs at least one item".to_string(),
            ));
        }
        if let Some(item) = self.items.iter().find(|i| i.quantity <= 0) {
            return Err(DomainError::InvalidInput(format!(
                "quantity for '{}' must be positive",
                item.title
            )));
        }
        if self.total() < BigDecimal::from(0) {
            return Err(DomainError::InvalidInput(
                "discount exceeds order value".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderItem {
    pub id: Uuid,
    pub title: String,
    pub quantity: i32,
    pub unit_price: BigDecimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub id: Uuid,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    pub delivery_method: DeliveryMethod,
    pub status: OrderStatus,
    pub shipping_address: Option<String>,
    pub items: Vec<OrderItem>,
    pub subtotal: BigDecimal,
    pub shipping_fee: BigDecimal,
    pub discount: BigDecimal,
    pub total_amount: BigDecimal,
    pub coupon_code: Option<String>,
    pub payment_status: PaymentStatus,
    pub payment_method: Option<String>,
    pub payment_intent_id: Option<String>,
    pub payment_method_id: Option<String>,
    pub payment_id: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub failed_at: Option<DateTime<Utc>>,
    pub qr_code_expired_at: Option<DateTime<Utc>>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub payment_failed_reason: Option<String>,
    pub payment_failed_code: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Gateway identifiers recorded once an attach has succeeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentAttempt {
    pub payment_intent_id: String,
    pub payment_method_id: String,
    pub payment_method: String,
}

/// Outcome reported by the gateway for one payment intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentOutcome {
    Paid {
        payment_id: Option<String>,
    },
    Failed {
        reason: Option<String>,
        code: Option<String>,
    },
    Expired,
}

impl PaymentOutcome {
    pub fn payment_status(&self) -> PaymentStatus {
        match self {
            PaymentOutcome::Paid { .. } => PaymentStatus::Paid,
            PaymentOutcome::Failed { .. } => PaymentStatus::Failed,
            PaymentOutcome::Expired => PaymentStatus::Expired,
        }
    }
}

/// Result of applying a [`PaymentOutcome`] to the order keyed by intent id.
#[derive(Debug, Clone, PartialEq)]
pub enum OutcomeApplied {
    Applied(Order),
    /// The order was already paid; nothing was written.
    AlreadySettled(Uuid),
    /// A failure or expiry for an intent the order has since replaced.
    Superseded(Uuid),
    UnknownIntent,
}

/// Result of a staff status change.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusChange {
    pub order: Order,
    pub previous: OrderStatus,
}

impl StatusChange {
    pub fn changed(&self) -> bool {
        self.previous != self.order.status
    }
}
