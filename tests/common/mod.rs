//! In-memory collaborators for the application and HTTP tests.
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde_json::json;
use uuid::Uuid;

use qrph_checkout::application::retry::{RetryPolicy, ALREADY_ATTACHED, PROCESSING};
use qrph_checkout::domain::errors::{DomainError, GatewayError};
use qrph_checkout::domain::order::{
    DeliveryMethod, NewOrder, Order, OrderItem, OrderItemInput, OutcomeApplied, PaymentAttempt,
    PaymentOutcome, PaymentStatus, StatusChange,
};
use qrph_checkout::domain::payment::{BillingDetails, IntentSnapshot};
use qrph_checkout::domain::ports::{CouponLedger, Notifier, OrderRepository, PaymentGateway};
use qrph_checkout::domain::status::{OrderStatus, CONFIRMED_LITERAL};
use qrph_checkout::AppState;

pub fn decimal(v: &str) -> BigDecimal {
    BigDecimal::from_str(v).expect("valid decimal")
}

pub fn new_order(method: DeliveryMethod, coupon: Option<&str>) -> NewOrder {
    NewOrder {
        customer_name: Some("Maria Santos".to_string()),
        customer_email: Some("maria@example.ph".to_string()),
        customer_phone: Some("09171234567".to_string()),
        delivery_method: method,
        shipping_address: Some("12 Mabini St, Quezon City".to_string()),
        items: vec![OrderItemInput {
            title: "Ube halaya".to_string(),
            quantity: 1,
            unit_price: decimal("149.99"),
        }],
        shipping_fee: decimal("0"),
        discount: decimal("0"),
        coupon_code: coupon.map(str::to_string),
    }
}

pub fn no_backoff() -> RetryPolicy {
    RetryPolicy::new(2, Duration::ZERO)
}

// ── Orders ───────────────────────────────────────────────────────────────────

/// Mirrors the guards of the Postgres repository: paid orders are never
/// rewritten, every issued intent stays matchable for payment, and status
/// changes are compare-and-set.
#[derive(Default)]
pub struct InMemoryOrders {
    orders: Mutex<HashMap<Uuid, Order>>,
    /// intent id → (order id, method id)
    attempts: Mutex<HashMap<String, (Uuid, String)>>,
    pub outcome_writes: AtomicUsize,
}

impl InMemoryOrders {
    pub fn get(&self, id: Uuid) -> Option<Order> {
        self.orders.lock().unwrap().get(&id).cloned()
    }

    pub fn seed(&self, order: NewOrder) -> Uuid {
        self.create(order).expect("seed order")
    }

    /// Seed an order that already has a recorded attempt for `intent_id`.
    pub fn seed_with_intent(&self, order: NewOrder, intent_id: &str) -> Uuid {
        let id = self.seed(order);
        self.update(id, |o| o.payment_intent_id = Some(intent_id.to_string()));
        id
    }

    pub fn update(&self, id: Uuid, f: impl FnOnce(&mut Order)) {
        let mut orders = self.orders.lock().unwrap();
        f(orders.get_mut(&id).expect("order exists"));
    }
}

impl OrderRepository for InMemoryOrders {
    fn create(&self, order: NewOrder) -> Result<Uuid, DomainError> {
        let now = Utc::now();
        let id = Uuid::new_v4();
        let record = Order {
            id,
            subtotal: order.subtotal(),
            total_amount: order.total(),
            customer_name: order.customer_name,
            customer_email: order.customer_email,
            customer_phone: order.customer_phone,
            delivery_method: order.delivery_method,
            status: OrderStatus::Pending,
            shipping_address: order.shipping_address,
            items: order
                .items
                .into_iter()
                .map(|i| OrderItem {
                    id: Uuid::new_v4(),
                    title: i.title,
                    quantity: i.quantity,
                    unit_price: i.unit_price,
                })
                .collect(),
            shipping_fee: order.shipping_fee,
            discount: order.discount,
            coupon_code: order.coupon_code,
            payment_status: PaymentStatus::Pending,
            payment_method: None,
            payment_intent_id: None,
            payment_method_id: None,
            payment_id: None,
            paid_at: None,
            failed_at: None,
            qr_code_expired_at: None,
            confirmed_at: None,
            payment_failed_reason: None,
            payment_failed_code: None,
            created_at: now,
            updated_at: now,
        };
        self.orders.lock().unwrap().insert(id, record);
        Ok(id)
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, DomainError> {
        Ok(self.get(id))
    }

    fn record_payment_attempt(
        &self,
        id: Uuid,
        attempt: &PaymentAttempt,
    ) -> Result<(), DomainError> {
        let mut orders = self.orders.lock().unwrap();
        let order = orders.get_mut(&id).ok_or(DomainError::NotFound)?;
        if order.payment_status == PaymentStatus::Paid {
            return Err(DomainError::Conflict("already paid".to_string()));
        }
        order.payment_intent_id = Some(attempt.payment_intent_id.clone());
        order.payment_method_id = Some(attempt.payment_method_id.clone());
        order.payment_method = Some(attempt.payment_method.clone());
        order.payment_status = PaymentStatus::Pending;
        self.attempts.lock().unwrap().insert(
            attempt.payment_intent_id.clone(),
            (id, attempt.payment_method_id.clone()),
        );
        Ok(())
    }

    fn apply_payment_outcome(
        &self,
        payment_intent_id: &str,
        outcome: &PaymentOutcome,
        at: DateTime<Utc>,
    ) -> Result<OutcomeApplied, DomainError> {
        let mut orders = self.orders.lock().unwrap();
        let current = orders
            .values()
            .find(|o| o.payment_intent_id.as_deref() == Some(payment_intent_id))
            .map(|o| (o.id, o.payment_method_id.clone(), true));
        let owner = current.or_else(|| {
            self.attempts
                .lock()
                .unwrap()
                .get(payment_intent_id)
                .map(|(id, method)| (*id, Some(method.clone()), false))
        });
        let Some((order_id, method_id, is_current)) = owner else {
            return Ok(OutcomeApplied::UnknownIntent);
        };
        let order = orders.get_mut(&order_id).expect("attempt belongs to an order");
        if order.payment_status == PaymentStatus::Paid {
            return Ok(OutcomeApplied::AlreadySettled(order.id));
        }
        let paid = matches!(outcome, PaymentOutcome::Paid { .. });
        if !is_current && !paid {
            return Ok(OutcomeApplied::Superseded(order.id));
        }
        self.outcome_writes.fetch_add(1, Ordering::SeqCst);
        order.payment_status = outcome.payment_status();
        order.updated_at = at;
        match outcome {
            PaymentOutcome::Paid { payment_id } => {
                order.payment_intent_id = Some(payment_intent_id.to_string());
                order.payment_method_id = method_id;
                order.payment_id = payment_id.clone();
                order.paid_at = Some(at);
                order.confirmed_at = Some(at);
                order.status = OrderStatus::parse(CONFIRMED_LITERAL).expect("known literal");
            }
            PaymentOutcome::Failed { reason, code } => {
                order.payment_failed_reason = reason.clone();
                order.payment_failed_code = code.clone();
                order.failed_at = Some(at);
                order.status = OrderStatus::PaymentFailed;
            }
            PaymentOutcome::Expired => {
                order.qr_code_expired_at = Some(at);
                order.status = OrderStatus::QrcodeExpired;
            }
        }
        Ok(OutcomeApplied::Applied(order.clone()))
    }

    fn transition_status(
        &self,
        id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<StatusChange, DomainError> {
        let mut orders = self.orders.lock().unwrap();
        let order = orders.get_mut(&id).ok_or(DomainError::NotFound)?;
        if order.status != from {
            return Err(DomainError::Conflict(format!("order is {}", order.status)));
        }
        order.status = to;
        Ok(StatusChange {
            order: order.clone(),
            previous: from,
        })
    }
}

// ── Gateway ──────────────────────────────────────────────────────────────────

pub fn qr_snapshot(intent_id: &str) -> IntentSnapshot {
    IntentSnapshot {
        id: intent_id.to_string(),
        status: Some("awaiting_next_action".to_string()),
        next_action: Some(json!({
            "type": "consume_qr",
            "code": { "image_url": format!("https://qr.example/{}.png", intent_id) }
        })),
    }
}

pub fn api_error(code: &str) -> GatewayError {
    GatewayError::Api {
        status: 400,
        code: Some(code.to_string()),
        detail: format!("{} reported", code),
        body: json!({ "errors": [{ "code": code, "detail": format!("{} reported", code) }] }),
    }
}

pub fn processing() -> GatewayError {
    api_error(PROCESSING)
}

pub fn already_attached() -> GatewayError {
    api_error(ALREADY_ATTACHED)
}

/// Gateway whose attach answers are scripted; every call is counted.
pub struct ScriptedGateway {
    pub intent_id: String,
    attach_script: Mutex<VecDeque<Result<IntentSnapshot, GatewayError>>>,
    get_intent_result: Mutex<Option<Result<IntentSnapshot, GatewayError>>>,
    pub fail_intent: Mutex<Option<GatewayError>>,
    pub billing_seen: Mutex<Vec<BillingDetails>>,
    pub intents_created: AtomicUsize,
    pub methods_created: AtomicUsize,
    pub attach_calls: AtomicUsize,
    pub get_intent_calls: AtomicUsize,
}

impl ScriptedGateway {
    pub fn new(intent_id: &str) -> Self {
        Self {
            intent_id: intent_id.to_string(),
            attach_script: Mutex::new(VecDeque::new()),
            get_intent_result: Mutex::new(None),
            fail_intent: Mutex::new(None),
            billing_seen: Mutex::new(Vec::new()),
            intents_created: AtomicUsize::new(0),
            methods_created: AtomicUsize::new(0),
            attach_calls: AtomicUsize::new(0),
            get_intent_calls: AtomicUsize::new(0),
        }
    }

    /// Queue attach answers; once exhausted, attach succeeds with a QR.
    pub fn script_attach(self, answers: Vec<Result<IntentSnapshot, GatewayError>>) -> Self {
        *self.attach_script.lock().unwrap() = answers.into();
        self
    }

    pub fn on_get_intent(self, answer: Result<IntentSnapshot, GatewayError>) -> Self {
        *self.get_intent_result.lock().unwrap() = Some(answer);
        self
    }

    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

impl PaymentGateway for ScriptedGateway {
    fn create_intent(
        &self,
        _amount_minor: i64,
        _currency: &str,
        _description: &str,
    ) -> Result<String, GatewayError> {
        self.intents_created.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.fail_intent.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(self.intent_id.clone())
    }

    fn create_method(&self, billing: &BillingDetails) -> Result<String, GatewayError> {
        let n = self.methods_created.fetch_add(1, Ordering::SeqCst) + 1;
        self.billing_seen.lock().unwrap().push(billing.clone());
        Ok(format!("pm_{}", n))
    }

    fn attach(&self, intent_id: &str, _method_id: &str) -> Result<IntentSnapshot, GatewayError> {
        self.attach_calls.fetch_add(1, Ordering::SeqCst);
        self.attach_script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(qr_snapshot(intent_id)))
    }

    fn get_intent(&self, intent_id: &str) -> Result<IntentSnapshot, GatewayError> {
        self.get_intent_calls.fetch_add(1, Ordering::SeqCst);
        self.get_intent_result
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| Ok(qr_snapshot(intent_id)))
    }
}

// ── Collaborators ────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    fn record(&self, entry: String) -> Result<(), DomainError> {
        self.sent.lock().unwrap().push(entry);
        Ok(())
    }
}

impl Notifier for RecordingNotifier {
    fn send_order_confirmation(&self, order: &Order) -> Result<(), DomainError> {
        self.record(format!("confirmation:{}", order.id))
    }

    fn send_staff_order_alert(&self, order: &Order) -> Result<(), DomainError> {
        self.record(format!("staff:{}", order.id))
    }

    fn send_status_update(&self, order: &Order, previous: OrderStatus) -> Result<(), DomainError> {
        self.record(format!("status:{}:{}->{}", order.id, previous, order.status))
    }
}

/// Records increments, or fails every one when `broken`.
#[derive(Default)]
pub struct FakeCoupons {
    pub broken: bool,
    pub used: Mutex<Vec<String>>,
}

impl FakeCoupons {
    pub fn broken() -> Self {
        Self {
            broken: true,
            used: Mutex::new(Vec::new()),
        }
    }
}

impl CouponLedger for FakeCoupons {
    fn increment_usage(&self, code: &str) -> Result<(), DomainError> {
        if self.broken {
            return Err(DomainError::Internal("coupon store offline".to_string()));
        }
        self.used.lock().unwrap().push(code.to_string());
        Ok(())
    }
}

// ── Wiring ───────────────────────────────────────────────────────────────────

pub struct Fakes {
    pub orders: Arc<InMemoryOrders>,
    pub gateway: Arc<ScriptedGateway>,
    pub coupons: Arc<FakeCoupons>,
    pub notifier: Arc<RecordingNotifier>,
}

impl Fakes {
    pub fn new(gateway: ScriptedGateway, coupons: FakeCoupons) -> Self {
        Self {
            orders: Arc::new(InMemoryOrders::default()),
            gateway: Arc::new(gateway),
            coupons: Arc::new(coupons),
            notifier: Arc::new(RecordingNotifier::default()),
        }
    }

    pub fn state(&self) -> AppState {
        AppState::new(
            self.orders.clone(),
            self.gateway.clone(),
            self.coupons.clone(),
            self.notifier.clone(),
            no_backoff(),
        )
    }
}

/// Poll until `check` holds; follow-ups run on the blocking pool after the
/// response has been sent.
pub async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..100 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    check()
}
