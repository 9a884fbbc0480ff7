use std::time::Duration;

use bigdecimal::BigDecimal;
use uuid::Uuid;

use crate::domain::errors::{DomainError, GatewayError, PaymentError};
use crate::domain::order::{PaymentAttempt, PaymentStatus};
use crate::domain::payment::{
    to_minor_units, BillingDetails, IntentSnapshot, CURRENCY, QRPH, QR_VALIDITY,
};
use crate::domain::ports::{OrderRepository, PaymentGateway};

use super::retry::{classify_attach_error, AttachFailure, RetryPolicy};

const PLACEHOLDER_NAME: &str = "Customer";
const PLACEHOLDER_EMAIL: &str = "customer@example.com";

#[derive(Debug, Clone, Default)]
pub struct PaymentRequest {
    pub order_id: Option<Uuid>,
    pub amount: Option<BigDecimal>,
    pub description: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QrPayment {
    pub payment_intent_id: String,
    pub payment_method_id: String,
    pub qr_code_url: String,
    pub amount_minor: i64,
    pub currency: &'static str,
    pub payment_method: &'static str,
    pub expires_in: Duration,
}

/// Drives the intent → method → attach handshake for one order.
pub struct PaymentOrchestrator<R, G> {
    repo: R,
    gateway: G,
    policy: RetryPolicy,
}

impl<R: OrderRepository, G: PaymentGateway> PaymentOrchestrator<R, G> {
    pub fn new(repo: R, gateway: G, policy: RetryPolicy) -> Self {
        Self {
            repo,
            gateway,
            policy,
        }
    }

    pub fn initiate(&self, request: PaymentRequest) -> Result<QrPayment, PaymentError> {
        let order_id = request
            .order_id
            .ok_or_else(|| PaymentError::InvalidRequest("orderId is required".to_string()))?;
        let amount = request
            .amount
            .as_ref()
            .ok_or_else(|| PaymentError::InvalidRequest("amount is required".to_string()))?;
        let amount_minor = to_minor_units(amount).map_err(|e| match e {
            DomainError::InvalidInput(msg) => PaymentError::InvalidRequest(msg),
            other => PaymentError::Persistence(other),
        })?;

        let order = self
            .repo
            .find_by_id(order_id)
            .map_err(PaymentError::Persistence)?
            .ok_or(PaymentError::OrderNotFound)?;
        if order.payment_status == PaymentStatus::Paid {
            return Err(PaymentError::AlreadyPaid);
        }

        let description = request
            .description
            .clone()
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| format!("Order {}", order_id));
        let intent_id = self
            .gateway
            .create_intent(amount_minor, CURRENCY, &description)
            .map_err(PaymentError::IntentCreation)?;
        log::info!("Created payment intent {} for order {}", intent_id, order_id);

        let billing = billing_details(&request);
        let method_id = self
            .gateway
            .create_method(&billing)
            .map_err(PaymentError::MethodCreation)?;

        let snapshot = self.attach_with_recovery(&intent_id, &method_id)?;
        let qr_code_url = snapshot
            .qr_image_url()
            .ok_or_else(|| PaymentError::MissingQrCode {
                intent_id: intent_id.clone(),
            })?
            .to_string();

        let attempt = PaymentAttempt {
            payment_intent_id: intent_id.clone(),
            payment_method_id: method_id.clone(),
            payment_method: QRPH.to_string(),
        };
        self.repo
            .record_payment_attempt(order_id, &attempt)
            .map_err(|e| match e {
                DomainError::NotFound => PaymentError::OrderNotFound,
                DomainError::Conflict(_) => PaymentError::AlreadyPaid,
                other => PaymentError::Persistence(other),
            })?;

        Ok(QrPayment {
            payment_intent_id: intent_id,
            payment_method_id: method_id,
            qr_code_url,
            amount_minor,
            currency: CURRENCY,
            payment_method: QRPH,
            expires_in: QR_VALIDITY,
        })
    }

    fn attach_with_recovery(
        &self,
        intent_id: &str,
        method_id: &str,
    ) -> Result<IntentSnapshot, PaymentError> {
        let mut retries_left = self.policy.max_retries;
        let mut attempts = 0;
        loop {
            attempts += 1;
            let err: GatewayError = match self.gateway.attach(intent_id, method_id) {
                Ok(snapshot) => return Ok(snapshot),
                Err(e) => e,
            };

            match classify_attach_error(&err) {
                AttachFailure::AlreadyAttached => {
                    log::info!(
                        "Method {} already attached to intent {}; fetching intent",
                        method_id,
                        intent_id
                    );
                    return self
                        .gateway
                        .get_intent(intent_id)
                        .map_err(|source| PaymentError::PaymentAttachFailed { attempts, source });
                }
                AttachFailure::Transient if retries_left > 0 => {
                    retries_left -= 1;
                    log::warn!(
                        "Attach attempt {} for intent {} failed ({}); retrying in {:?}",
                        attempts,
                        intent_id,
                        err,
                        self.policy.backoff
                    );
                    std::thread::sleep(self.policy.backoff);
                }
                _ => {
                    log::error!(
                        "Attach for intent {} failed after {} attempt(s): {}",
                        intent_id,
                        attempts,
                        err
                    );
                    return Err(PaymentError::PaymentAttachFailed {
                        attempts,
                        source: err,
                    });
                }
            }
        }
    }
}

fn billing_details(request: &PaymentRequest) -> BillingDetails {
    let non_blank = |v: &Option<String>| {
        v.as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };
    BillingDetails {
        name: non_blank(&request.name).unwrap_or_else(|| PLACEHOLDER_NAME.to_string()),
        email: non_blank(&request.email).unwrap_or_else(|| PLACEHOLDER_EMAIL.to_string()),
        phone: non_blank(&request.phone),
    }
}
