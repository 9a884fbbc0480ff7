//! Order fulfillment state machine.
//!
//! Stored status strings may use the legacy vocabulary (`confirmed`,
//! `preparing`). They are normalised once by [`OrderStatus::parse`]; everything
//! past that boundary works with canonical variants only.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::DomainError;
use super::order::DeliveryMethod;

/// Literal written by the `payment.paid` reconciliation. Reads back as
/// [`OrderStatus::Pending`].
pub const CONFIRMED_LITERAL: &str = "confirmed";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Processing,
    ReadyForPickup,
    Shipped,
    Delivered,
    Completed,
    PaymentFailed,
    QrcodeExpired,
}

impl OrderStatus {
    /// Parse a stored or incoming status, folding legacy aliases onto the
    /// current vocabulary.
    pub fn parse(raw: &str) -> Option<Self> {
        let status = match raw {
            "pending" | "confirmed" => OrderStatus::Pending,
            "processing" | "preparing" => OrderStatus::Processing,
            "ready_for_pickup" => OrderStatus::ReadyForPickup,
            "shipped" => OrderStatus::Shipped,
            "delivered" => OrderStatus::Delivered,
            "completed" => OrderStatus::Completed,
            "payment_failed" => OrderStatus::PaymentFailed,
            "qrcode_expired" => OrderStatus::QrcodeExpired,
            _ => return None,
        };
        Some(status)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::ReadyForPickup => "ready_for_pickup",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Completed => "completed",
            OrderStatus::PaymentFailed => "payment_failed",
            OrderStatus::QrcodeExpired => "qrcode_expired",
        }
    }

    /// Every stored literal that parses to this status.
    pub fn stored_aliases(&self) -> &'static [&'static str] {
        match self {
            OrderStatus::Pending => &["pending", "confirmed"],
            OrderStatus::Processing => &["processing", "preparing"],
            OrderStatus::ReadyForPickup => &["ready_for_pickup"],
            OrderStatus::Shipped => &["shipped"],
            OrderStatus::Delivered => &["delivered"],
            OrderStatus::Completed => &["completed"],
            OrderStatus::PaymentFailed => &["payment_failed"],
            OrderStatus::QrcodeExpired => &["qrcode_expired"],
        }
    }

    /// Next status along the chain for `method`. Terminal statuses (and the
    /// payment exits) map to themselves.
    pub fn next(self, method: DeliveryMethod) -> Self {
        match (self, method) {
            (OrderStatus::Pending, _) => OrderStatus::Processing,
            (OrderStatus::Processing, DeliveryMethod::Pickup) => OrderStatus::ReadyForPickup,
            (OrderStatus::Processing, DeliveryMethod::Delivery) => OrderStatus::Shipped,
            (OrderStatus::Shipped, _) => OrderStatus::Delivered,
            (OrderStatus::Delivered, _) => OrderStatus::Completed,
            (terminal, _) => terminal,
        }
    }

    pub fn is_terminal(self, method: DeliveryMethod) -> bool {
        self.next(method) == self
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::parse(s)
            .ok_or_else(|| DomainError::InvalidInput(format!("unknown order status '{}'", s)))
    }
}
