use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::errors::{DomainError, GatewayError};
use super::order::{NewOrder, Order, OutcomeApplied, PaymentAttempt, PaymentOutcome, StatusChange};
use super::payment::{BillingDetails, IntentSnapshot};
use super::status::OrderStatus;

pub trait OrderRepository: Send + Sync + 'static {
    fn create(&self, order: NewOrder) -> Result<Uuid, DomainError>;
    fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, DomainError>;
    /// Store gateway ids for a new attempt. Fails with `NotFound` or, when the
    /// order is already paid, `Conflict`.
    fn record_payment_attempt(&self, id: Uuid, attempt: &PaymentAttempt)
        -> Result<(), DomainError>;
    /// Apply a gateway outcome in one write keyed by intent id. Paid orders are
    /// never rewritten. A payment on any intent the order ever issued settles
    /// it; failures and expiries only count for the current intent.
    fn apply_payment_outcome(
        &self,
        payment_intent_id: &str,
        outcome: &PaymentOutcome,
        at: DateTime<Utc>,
    ) -> Result<OutcomeApplied, DomainError>;
    /// Compare-and-set on the fulfillment status. `Conflict` if the stored
    /// status no longer parses to `from`.
    fn transition_status(
        &self,
        id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<StatusChange, DomainError>;
}

pub trait PaymentGateway: Send + Sync + 'static {
    fn create_intent(
        &self,
        amount_minor: i64,
        currency: &str,
        description: &str,
    ) -> Result<String, GatewayError>;
    fn create_method(&self, billing: &BillingDetails) -> Result<String, GatewayError>;
    fn attach(&self, intent_id: &str, method_id: &str) -> Result<IntentSnapshot, GatewayError>;
    fn get_intent(&self, intent_id: &str) -> Result<IntentSnapshot, GatewayError>;
}

pub trait CouponLedger: Send + Sync + 'static {
    fn increment_usage(&self, code: &str) -> Result<(), DomainError>;
}

pub trait Notifier: Send + Sync + 'static {
    fn send_order_confirmation(&self, order: &Order) -> Result<(), DomainError>;
    fn send_staff_order_alert(&self, order: &Order) -> Result<(), DomainError>;
    fn send_status_update(&self, order: &Order, previous: OrderStatus) -> Result<(), DomainError>;
}

impl<T: OrderRepository + ?Sized> OrderRepository for Arc<T> {
    fn create(&self, order: NewOrder) -> Result<Uuid, DomainError> {
        (**self).create(order)
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, DomainError> {
        (**self).find_by_id(id)
    }

    fn record_payment_attempt(
        &self,
        id: Uuid,
        attempt: &PaymentAttempt,
    ) -> Result<(), DomainError> {
        (**self).record_payment_attempt(id, attempt)
    }

    fn apply_payment_outcome(
        &self,
        payment_intent_id: &str,
        outcome: &PaymentOutcome,
        at: DateTime<Utc>,
    ) -> Result<OutcomeApplied, DomainError> {
        (**self).apply_payment_outcome(payment_intent_id, outcome, at)
    }

    fn transition_status(
        &self,
        id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<StatusChange, DomainError> {
        (**self).transition_status(id, from, to)
    }
}

impl<T: PaymentGateway + ?Sized> PaymentGateway for Arc<T> {
    fn create_intent(
        &self,
        amount_minor: i64,
        currency: &str,
        description: &str,
    ) -> Result<String, GatewayError> {
        (**self).create_intent(amount_minor, currency, description)
    }

    fn create_method(&self, billing: &BillingDetails) -> Result<String, GatewayError> {
        (**self).create_method(billing)
    }

    fn attach(&self, intent_id: &str, method_id: &str) -> Result<IntentSnapshot, GatewayError> {
        (**self).attach(intent_id, method_id)
    }

    fn get_intent(&self, intent_id: &str) -> Result<IntentSnapshot, GatewayError> {
        (**self).get_intent(intent_id)
    }
}

impl<T: CouponLedger + ?Sized> CouponLedger for Arc<T> {
    fn increment_usage(&self, code: &str) -> Result<(), DomainError> {
        (**self).increment_usage(code)
    }
}

impl<T: Notifier + ?Sized> Notifier for Arc<T> {
    fn send_order_confirmation(&self, order: &Order) -> Result<(), DomainError> {
        (**self).send_order_confirmation(order)
    }

    fn send_staff_order_alert(&self, order: &Order) -> Result<(), DomainError> {
        (**self).send_staff_order_alert(order)
    }

    fn send_status_update(&self, order: &Order, previous: OrderStatus) -> Result<(), DomainError> {
        (**self).send_status_update(order, previous)
    }
}
