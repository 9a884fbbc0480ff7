//! Gateway-facing payment types shared by the orchestrator, the gateway
//! client and the webhook processor.

use std::time::Duration;

use bigdecimal::{BigDecimal, RoundingMode, ToPrimitive, Zero};
use serde_json::Value;

use super::errors::DomainError;

/// Payment method type used for every intent created by this service.
pub const QRPH: &str = "qrph";
pub const CURRENCY: &str = "PHP";
/// How long a generated QR code stays redeemable.
pub const QR_VALIDITY: Duration = Duration::from_secs(30 * 60);

/// Convert a major-unit amount into gateway minor units, rounding half up.
pub fn to_minor_units(amount: &BigDecimal) -> Result<i64, DomainError> {
    if amount <= &BigDecimal::zero() {
        return Err(DomainError::InvalidInput(format!(
            "amount must be positive, got {}",
            amount
        )));
    }
    let minor = (amount * BigDecimal::from(100)).with_scale_round(0, RoundingMode::HalfUp);
    minor
        .to_i64()
        .ok_or_else(|| DomainError::InvalidInput(format!("amount {} is out of range", amount)))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BillingDetails {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
}

/// State of a payment intent as returned by attach or a fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct IntentSnapshot {
    pub id: String,
    pub status: Option<String>,
    pub next_action: Option<Value>,
}

impl IntentSnapshot {
    /// QR image carried by the intent's next action, if any.
    pub fn qr_image_url(&self) -> Option<&str> {
        self.next_action
            .as_ref()?
            .get("code")?
            .get("image_url")?
            .as_str()
            .filter(|url| !url.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayEventKind {
    PaymentPaid,
    PaymentFailed,
    QrphExpired,
    Other(String),
}

impl GatewayEventKind {
    pub fn from_type(event_type: &str) -> Self {
        match event_type {
            "payment.paid" => GatewayEventKind::PaymentPaid,
            "payment.failed" => GatewayEventKind::PaymentFailed,
            "qrph.expired" => GatewayEventKind::QrphExpired,
            other => GatewayEventKind::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            GatewayEventKind::PaymentPaid => "payment.paid",
            GatewayEventKind::PaymentFailed => "payment.failed",
            GatewayEventKind::QrphExpired => "qrph.expired",
            GatewayEventKind::Other(other) => other,
        }
    }
}

/// One inbound gateway notification. Not persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayEvent {
    pub id: Option<String>,
    pub kind: GatewayEventKind,
    pub payment_intent_id: Option<String>,
    pub payment_id: Option<String>,
    pub failed_code: Option<String>,
    pub failed_message: Option<String>,
    pub payload: Value,
}
