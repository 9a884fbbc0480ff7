use std::str::FromStr;

use actix_web::{web, HttpResponse};
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::application::payment_orchestrator::{PaymentRequest, QrPayment};
use crate::domain::errors::PaymentError;
use crate::domain::order::Order;
use crate::errors::AppError;
use crate::AppState;

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateQrPaymentRequest {
    pub order_id: Option<Uuid>,
    /// Major units, as a JSON number or a decimal string.
    #[schema(value_type = Option<f64>, example = 149.99)]
    pub amount: Option<Value>,
    pub description: Option<String>,
    pub email: Option<String>,
    pub name: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QrPaymentResponse {
    pub payment_intent_id: String,
    pub payment_method_id: String,
    /// QR image to show the customer.
    pub qr_code: String,
    /// Charged amount in minor units (centavos).
    pub amount: i64,
    pub currency: String,
    pub payment_method: String,
    /// Seconds the QR code stays valid.
    pub expires_in: u64,
}

impl From<QrPayment> for QrPaymentResponse {
    fn from(p: QrPayment) -> Self {
        Self {
            payment_intent_id: p.payment_intent_id,
            payment_method_id: p.payment_method_id,
            qr_code: p.qr_code_url,
            amount: p.amount_minor,
            currency: p.currency.to_string(),
            payment_method: p.payment_method.to_string(),
            expires_in: p.expires_in.as_secs(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentStatusResponse {
    pub order_id: Uuid,
    pub payment_status: String,
    pub status: String,
    pub amount: String,
    pub payment_method: Option<String>,
    pub payment_intent_id: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub failed_at: Option<DateTime<Utc>>,
    pub qr_code_expired_at: Option<DateTime<Utc>>,
    pub payment_failed_reason: Option<String>,
    pub payment_failed_code: Option<String>,
}

impl From<Order> for PaymentStatusResponse {
    fn from(o: Order) -> Self {
        Self {
            order_id: o.id,
            payment_status: o.payment_status.to_string(),
            status: o.status.to_string(),
            amount: o.total_amount.to_string(),
            payment_method: o.payment_method,
            payment_intent_id: o.payment_intent_id,
            paid_at: o.paid_at,
            failed_at: o.failed_at,
            qr_code_expired_at: o.qr_code_expired_at,
            payment_failed_reason: o.payment_failed_reason,
            payment_failed_code: o.payment_failed_code,
        }
    }
}

/// Numbers are parsed from their JSON text so `149.99` stays exact.
fn parse_amount(raw: &Value) -> Result<BigDecimal, PaymentError> {
    let text = match raw {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        other => {
            return Err(PaymentError::InvalidRequest(format!(
                "amount must be a number, got {}",
                other
            )))
        }
    };
    BigDecimal::from_str(&text)
        .map_err(|_| PaymentError::InvalidRequest(format!("amount '{}' is not a number", text)))
}

impl CreateQrPaymentRequest {
    fn into_domain(self) -> Result<PaymentRequest, PaymentError> {
        let amount = match self.amount {
            None | Some(Value::Null) => None,
            Some(raw) => Some(parse_amount(&raw)?),
        };
        Ok(PaymentRequest {
            order_id: self.order_id,
            amount,
            description: self.description,
            name: self.name,
            email: self.email,
            phone: self.phone,
        })
    }
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// POST /payments/qrph
///
/// Creates a QR Ph payment for an order and returns the QR code to display.
/// The gateway work (intent, method, attach with retry) runs on the blocking
/// pool.
#[utoipa::path(
    post,
    path = "/payments/qrph",
    request_body = CreateQrPaymentRequest,
    responses(
        (status = 201, description = "QR code generated", body = QrPaymentResponse),
        (status = 400, description = "Missing fields or payment rejected by the gateway"),
        (status = 404, description = "Order not found"),
        (status = 409, description = "Order already paid"),
        (status = 500, description = "Gateway unreachable or returned no QR code"),
    ),
    tag = "payments"
)]
pub async fn create_qrph_payment(
    state: web::Data<AppState>,
    body: web::Json<CreateQrPaymentRequest>,
) -> Result<HttpResponse, AppError> {
    let request = body.into_inner().into_domain()?;
    let orchestrator = state.payments.clone();
    let payment = web::block(move || orchestrator.initiate(request))
        .await?
        .map_err(|e| {
            log::warn!("QR payment initiation failed: {}", e);
            AppError::from(e)
        })?;
    Ok(HttpResponse::Created().json(QrPaymentResponse::from(payment)))
}

/// GET /payments/{orderId}/status
#[utoipa::path(
    get,
    path = "/payments/{orderId}/status",
    params(
        ("orderId" = Uuid, Path, description = "Order UUID"),
    ),
    responses(
        (status = 200, description = "Current payment state", body = PaymentStatusResponse),
        (status = 404, description = "Order not found"),
    ),
    tag = "payments"
)]
pub async fn payment_status(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();
    let service = state.orders.clone();
    let order = web::block(move || service.get_order(order_id))
        .await??
        .ok_or(AppError::NotFound)?;
    Ok(HttpResponse::Ok().json(PaymentStatusResponse::from(order)))
}
