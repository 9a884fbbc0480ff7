use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Order not found")]
    NotFound,
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Failure reported by, or while talking to, the payment gateway.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// Non-2xx response. `code` is the gateway's machine-readable error code.
    #[error("Gateway rejected request ({status}): {detail}")]
    Api {
        status: u16,
        code: Option<String>,
        detail: String,
        body: Value,
    },
    /// Timeouts, connection resets and other failures before a response arrived.
    #[error("Gateway transport error: {0}")]
    Transport(String),
    #[error("Unexpected gateway response: {0}")]
    Decode(String),
}

impl GatewayError {
    pub fn code(&self) -> Option<&str> {
        match self {
            GatewayError::Api { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    /// Diagnostic payload surfaced to API callers.
    pub fn details(&self) -> Value {
        match self {
            GatewayError::Api {
                status,
                code,
                detail,
                body,
            } => serde_json::json!({
                "status": status,
                "code": code,
                "detail": detail,
                "response": body,
            }),
            GatewayError::Transport(msg) | GatewayError::Decode(msg) => {
                serde_json::json!({ "detail": msg })
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("Invalid payment request: {0}")]
    InvalidRequest(String),
    #[error("Order not found")]
    OrderNotFound,
    #[error("Order has already been paid")]
    AlreadyPaid,
    #[error("Failed to create payment intent: {0}")]
    IntentCreation(#[source] GatewayError),
    #[error("Failed to create payment method: {0}")]
    MethodCreation(#[source] GatewayError),
    #[error("Failed to attach payment method after {attempts} attempt(s): {source}")]
    PaymentAttachFailed {
        attempts: u32,
        #[source]
        source: GatewayError,
    },
    #[error("Gateway response for intent {intent_id} carried no QR code")]
    MissingQrCode { intent_id: String },
    #[error("Failed to record payment attempt: {0}")]
    Persistence(#[source] DomainError),
}
