use actix_web::error::BlockingError;
use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use serde_json::{json, Value};
use thiserror::Error;

use crate::domain::errors::{DomainError, GatewayError, PaymentError};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found")]
    NotFound,

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Conflict(String),

    /// A payment step failed; `details` carries the gateway diagnostics.
    #[error("{message}")]
    Payment {
        status: StatusCode,
        message: String,
        details: Value,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<DomainError> for AppError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::NotFound => AppError::NotFound,
            DomainError::InvalidInput(msg) => AppError::BadRequest(msg),
            DomainError::Conflict(msg) => AppError::Conflict(msg),
            DomainError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

impl From<BlockingError> for AppError {
    fn from(e: BlockingError) -> Self {
        AppError::Internal(e.to_string())
    }
}

impl From<PaymentError> for AppError {
    fn from(e: PaymentError) -> Self {
        let message = e.to_string();
        match e {
            PaymentError::InvalidRequest(msg) => AppError::BadRequest(msg),
            PaymentError::OrderNotFound => AppError::NotFound,
            PaymentError::AlreadyPaid => AppError::Conflict(message),
            PaymentError::IntentCreation(source)
            | PaymentError::MethodCreation(source)
            | PaymentError::PaymentAttachFailed { source, .. } => {
                let status = match source {
                    GatewayError::Api { status, .. } if status < 500 => StatusCode::BAD_REQUEST,
                    _ => StatusCode::INTERNAL_SERVER_ERROR,
                };
                AppError::Payment {
                    status,
                    message,
                    details: source.details(),
                }
            }
            PaymentError::MissingQrCode { ref intent_id } => AppError::Payment {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                details: json!({ "paymentIntentId": intent_id }),
                message,
            },
            PaymentError::Persistence(inner) => AppError::Internal(inner.to_string()),
        }
    }
}

impl actix_web::ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Payment { status, .. } => *status,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            AppError::Payment { message, details, .. } => json!({
                "error": message,
                "details": details,
            }),
            AppError::Internal(msg) => {
                log::error!("Request failed: {}", msg);
                json!({ "error": "Internal server error" })
            }
            _ => json!({ "error": self.to_string() }),
        };
        HttpResponse::build(self.status_code()).json(body)
    }
}
