use chrono::Utc;
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::order::{Order, OutcomeApplied, PaymentOutcome};
use crate::domain::payment::{GatewayEvent, GatewayEventKind};
use crate::domain::ports::{CouponLedger, Notifier, OrderRepository};

use super::side_effects::NonCriticalTasks;

/// What the processor did with one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    Paid(Uuid),
    Failed(Uuid),
    Expired(Uuid),
    /// The order was already paid; the event changed nothing.
    AlreadySettled(Uuid),
    /// Failure or expiry of an intent the order no longer waits on.
    Superseded(Uuid),
    UnknownIntent,
    /// Event type not handled, or a handled type without an intent id.
    Ignored(String),
}

#[derive(Debug)]
pub struct WebhookOutcome {
    pub disposition: Disposition,
    /// Side effects to run after the acknowledgment has been decided.
    pub followups: NonCriticalTasks,
}

impl WebhookOutcome {
    fn bare(disposition: Disposition) -> Self {
        Self {
            disposition,
            followups: NonCriticalTasks::new(),
        }
    }
}

/// Reconciles gateway events against order records.
pub struct WebhookProcessor<R, C, N> {
    repo: R,
    coupons: C,
    notifier: N,
}

impl<R, C, N> WebhookProcessor<R, C, N>
where
    R: OrderRepository,
    C: CouponLedger + Clone,
    N: Notifier + Clone,
{
    pub fn new(repo: R, coupons: C, notifier: N) -> Self {
        Self {
            repo,
            coupons,
            notifier,
        }
    }

    /// Apply `event` to its order. Only the core mutation can fail; the
    /// returned follow-ups are never run here.
    pub fn process(&self, event: &GatewayEvent) -> Result<WebhookOutcome, DomainError> {
        let outcome = match &event.kind {
            GatewayEventKind::PaymentPaid => PaymentOutcome::Paid {
                payment_id: event.payment_id.clone(),
            },
            GatewayEventKind::PaymentFailed => PaymentOutcome::Failed {
                reason: event.failed_message.clone(),
                code: event.failed_code.clone(),
            },
            GatewayEventKind::QrphExpired => PaymentOutcome::Expired,
            GatewayEventKind::Other(kind) => {
                log::info!("Ignoring unhandled gateway event type '{}'", kind);
                return Ok(WebhookOutcome::bare(Disposition::Ignored(kind.clone())));
            }
        };

        let Some(intent_id) = event.payment_intent_id.as_deref() else {
            log::warn!(
                "Gateway event {:?} ({}) carried no payment intent id",
                event.id,
                event.kind.as_str()
            );
            return Ok(WebhookOutcome::bare(Disposition::Ignored(
                event.kind.as_str().to_string(),
            )));
        };

        match self.repo.apply_payment_outcome(intent_id, &outcome, Utc::now())? {
            OutcomeApplied::UnknownIntent => {
                log::warn!(
                    "No order for payment intent {} ({}); acknowledging",
                    intent_id,
                    event.kind.as_str()
                );
                Ok(WebhookOutcome::bare(Disposition::UnknownIntent))
            }
            OutcomeApplied::AlreadySettled(order_id) => {
                log::info!(
                    "Order {} already paid; {} for intent {} ignored",
                    order_id,
                    event.kind.as_str(),
                    intent_id
                );
                Ok(WebhookOutcome::bare(Disposition::AlreadySettled(order_id)))
            }
            OutcomeApplied::Superseded(order_id) => {
                log::info!(
                    "Order {} has moved on from intent {}; {} ignored",
                    order_id,
                    intent_id,
                    event.kind.as_str()
                );
                Ok(WebhookOutcome::bare(Disposition::Superseded(order_id)))
            }
            OutcomeApplied::Applied(order) => {
                log::info!(
                    "Order {} reconciled: payment {} (intent {})",
                    order.id,
                    order.payment_status,
                    intent_id
                );
                let disposition = match outcome {
                    PaymentOutcome::Paid { .. } => Disposition::Paid(order.id),
                    PaymentOutcome::Failed { .. } => Disposition::Failed(order.id),
                    PaymentOutcome::Expired => Disposition::Expired(order.id),
                };
                let followups = match &disposition {
                    Disposition::Paid(_) => self.paid_followups(order),
                    _ => NonCriticalTasks::new(),
                };
                Ok(WebhookOutcome {
                    disposition,
                    followups,
                })
            }
        }
    }

    fn paid_followups(&self, order: Order) -> NonCriticalTasks {
        let mut tasks = NonCriticalTasks::new();

        if let Some(code) = order.coupon_code.clone() {
            let coupons = self.coupons.clone();
            tasks.push("coupon_usage", move || coupons.increment_usage(&code));
        }

        let notifier = self.notifier.clone();
        let confirmed = order.clone();
        tasks.push("order_confirmation_email", move || {
            notifier.send_order_confirmation(&confirmed)
        });

        let notifier = self.notifier.clone();
        tasks.push("staff_order_alert", move || {
            notifier.send_staff_order_alert(&order)
        });

        tasks
    }
}
