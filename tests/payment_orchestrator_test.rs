mod common;

use std::sync::Arc;

use qrph_checkout::application::payment_orchestrator::{PaymentOrchestrator, PaymentRequest};
use qrph_checkout::application::retry::RetryPolicy;
use qrph_checkout::domain::errors::{GatewayError, PaymentError};
use qrph_checkout::domain::order::{DeliveryMethod, PaymentStatus};
use qrph_checkout::domain::payment::IntentSnapshot;
use uuid::Uuid;

use common::*;

fn orchestrator(
    orders: &Arc<InMemoryOrders>,
    gateway: &Arc<ScriptedGateway>,
) -> PaymentOrchestrator<Arc<InMemoryOrders>, Arc<ScriptedGateway>> {
    PaymentOrchestrator::new(orders.clone(), gateway.clone(), no_backoff())
}

fn request(order_id: Uuid) -> PaymentRequest {
    PaymentRequest {
        order_id: Some(order_id),
        amount: Some(decimal("149.99")),
        description: None,
        name: Some("Maria Santos".to_string()),
        email: Some("maria@example.ph".to_string()),
        phone: None,
    }
}

#[test]
fn transient_errors_twice_then_success_takes_three_attempts() {
    let orders = Arc::new(InMemoryOrders::default());
    let order_id = orders.seed(new_order(DeliveryMethod::Pickup, None));
    let gateway = Arc::new(
        ScriptedGateway::new("pi_retry").script_attach(vec![Err(processing()), Err(processing())]),
    );

    let payment = orchestrator(&orders, &gateway)
        .initiate(request(order_id))
        .expect("third attach succeeds");

    assert_eq!(ScriptedGateway::count(&gateway.attach_calls), 3);
    assert_eq!(ScriptedGateway::count(&gateway.intents_created), 1);
    assert_eq!(ScriptedGateway::count(&gateway.get_intent_calls), 0);
    assert_eq!(payment.amount_minor, 14999);
    assert_eq!(payment.qr_code_url, "https://qr.example/pi_retry.png");
    assert_eq!(payment.expires_in.as_secs(), 30 * 60);

    let stored = orders.get(order_id).unwrap();
    assert_eq!(stored.payment_intent_id.as_deref(), Some("pi_retry"));
    assert_eq!(stored.payment_method_id.as_deref(), Some("pm_1"));
    assert_eq!(stored.payment_method.as_deref(), Some("qrph"));
    assert_eq!(stored.payment_status, PaymentStatus::Pending);
}

#[test]
fn transport_errors_share_the_retry_budget() {
    let orders = Arc::new(InMemoryOrders::default());
    let order_id = orders.seed(new_order(DeliveryMethod::Delivery, None));
    let timeout = || Err(GatewayError::Transport("operation timed out".to_string()));
    let gateway = Arc::new(
        ScriptedGateway::new("pi_slow").script_attach(vec![timeout(), timeout(), timeout()]),
    );

    let err = orchestrator(&orders, &gateway)
        .initiate(request(order_id))
        .unwrap_err();

    assert!(matches!(
        err,
        PaymentError::PaymentAttachFailed {
            attempts: 3,
            source: GatewayError::Transport(_)
        }
    ));
    assert_eq!(ScriptedGateway::count(&gateway.attach_calls), 3);
    assert_eq!(orders.get(order_id).unwrap().payment_intent_id, None);
}

#[test]
fn gateway_outage_page_is_retried() {
    let orders = Arc::new(InMemoryOrders::default());
    let order_id = orders.seed(new_order(DeliveryMethod::Pickup, None));
    let outage = GatewayError::Api {
        status: 503,
        code: None,
        detail: "no detail provided".to_string(),
        body: serde_json::json!("<html>Service Unavailable</html>"),
    };
    let gateway =
        Arc::new(ScriptedGateway::new("pi_outage").script_attach(vec![Err(outage)]));

    let payment = orchestrator(&orders, &gateway)
        .initiate(request(order_id))
        .expect("second attach succeeds");

    assert_eq!(ScriptedGateway::count(&gateway.attach_calls), 2);
    assert_eq!(payment.payment_intent_id, "pi_outage");
}

#[test]
fn already_attached_recovers_with_one_intent_fetch() {
    let orders = Arc::new(InMemoryOrders::default());
    let order_id = orders.seed(new_order(DeliveryMethod::Pickup, None));
    let gateway = Arc::new(
        ScriptedGateway::new("pi_dup")
            .script_attach(vec![Err(already_attached())])
            .on_get_intent(Ok(qr_snapshot("pi_dup"))),
    );

    let payment = orchestrator(&orders, &gateway)
        .initiate(request(order_id))
        .expect("recovered from prior attach");

    assert_eq!(ScriptedGateway::count(&gateway.intents_created), 1);
    assert_eq!(ScriptedGateway::count(&gateway.methods_created), 1);
    assert_eq!(ScriptedGateway::count(&gateway.attach_calls), 1);
    assert_eq!(ScriptedGateway::count(&gateway.get_intent_calls), 1);
    assert_eq!(payment.qr_code_url, "https://qr.example/pi_dup.png");
    assert_eq!(
        orders.get(order_id).unwrap().payment_intent_id.as_deref(),
        Some("pi_dup")
    );
}

#[test]
fn other_gateway_codes_fail_without_retry() {
    let orders = Arc::new(InMemoryOrders::default());
    let order_id = orders.seed(new_order(DeliveryMethod::Pickup, None));
    let gateway = Arc::new(
        ScriptedGateway::new("pi_bad").script_attach(vec![Err(api_error("parameter_invalid"))]),
    );

    let err = orchestrator(&orders, &gateway)
        .initiate(request(order_id))
        .unwrap_err();

    match err {
        PaymentError::PaymentAttachFailed { attempts, source } => {
            assert_eq!(attempts, 1);
            assert_eq!(source.code(), Some("parameter_invalid"));
        }
        other => panic!("expected PaymentAttachFailed, got {:?}", other),
    }
    assert_eq!(ScriptedGateway::count(&gateway.attach_calls), 1);
    assert_eq!(ScriptedGateway::count(&gateway.get_intent_calls), 0);
}

#[test]
fn zero_retry_policy_makes_a_single_attempt() {
    let orders = Arc::new(InMemoryOrders::default());
    let order_id = orders.seed(new_order(DeliveryMethod::Pickup, None));
    let gateway = Arc::new(ScriptedGateway::new("pi_once").script_attach(vec![Err(processing())]));

    let err = PaymentOrchestrator::new(
        orders.clone(),
        gateway.clone(),
        RetryPolicy::new(0, std::time::Duration::ZERO),
    )
    .initiate(request(order_id))
    .unwrap_err();

    assert!(matches!(
        err,
        PaymentError::PaymentAttachFailed { attempts: 1, .. }
    ));
}

#[test]
fn snapshot_without_qr_is_a_contract_violation() {
    let orders = Arc::new(InMemoryOrders::default());
    let order_id = orders.seed(new_order(DeliveryMethod::Pickup, None));
    let gateway = Arc::new(ScriptedGateway::new("pi_noqr").script_attach(vec![Ok(
        IntentSnapshot {
            id: "pi_noqr".to_string(),
            status: Some("awaiting_next_action".to_string()),
            next_action: None,
        },
    )]));

    let err = orchestrator(&orders, &gateway)
        .initiate(request(order_id))
        .unwrap_err();

    assert!(matches!(err, PaymentError::MissingQrCode { ref intent_id } if intent_id == "pi_noqr"));
    assert_eq!(ScriptedGateway::count(&gateway.attach_calls), 1);
    assert_eq!(orders.get(order_id).unwrap().payment_intent_id, None);
}

#[test]
fn missing_fields_fail_before_any_gateway_call() {
    let orders = Arc::new(InMemoryOrders::default());
    let gateway = Arc::new(ScriptedGateway::new("pi_x"));
    let orchestrator = orchestrator(&orders, &gateway);

    let no_order = orchestrator
        .initiate(PaymentRequest {
            amount: Some(decimal("10")),
            ..Default::default()
        })
        .unwrap_err();
    assert!(matches!(no_order, PaymentError::InvalidRequest(_)));

    let no_amount = orchestrator
        .initiate(PaymentRequest {
            order_id: Some(Uuid::new_v4()),
            ..Default::default()
        })
        .unwrap_err();
    assert!(matches!(no_amount, PaymentError::InvalidRequest(_)));

    assert_eq!(ScriptedGateway::count(&gateway.intents_created), 0);
}

#[test]
fn unknown_order_is_rejected_before_creating_an_intent() {
    let orders = Arc::new(InMemoryOrders::default());
    let gateway = Arc::new(ScriptedGateway::new("pi_x"));

    let err = orchestrator(&orders, &gateway)
        .initiate(request(Uuid::new_v4()))
        .unwrap_err();

    assert!(matches!(err, PaymentError::OrderNotFound));
    assert_eq!(ScriptedGateway::count(&gateway.intents_created), 0);
}

#[test]
fn paid_order_cannot_start_a_new_payment() {
    let orders = Arc::new(InMemoryOrders::default());
    let order_id = orders.seed(new_order(DeliveryMethod::Pickup, None));
    orders.update(order_id, |o| o.payment_status = PaymentStatus::Paid);
    let gateway = Arc::new(ScriptedGateway::new("pi_x"));

    let err = orchestrator(&orders, &gateway)
        .initiate(request(order_id))
        .unwrap_err();

    assert!(matches!(err, PaymentError::AlreadyPaid));
    assert_eq!(ScriptedGateway::count(&gateway.intents_created), 0);
}

#[test]
fn expired_order_can_retry_payment() {
    let orders = Arc::new(InMemoryOrders::default());
    let order_id = orders.seed_with_intent(new_order(DeliveryMethod::Pickup, None), "pi_old");
    orders.update(order_id, |o| o.payment_status = PaymentStatus::Expired);
    let gateway = Arc::new(ScriptedGateway::new("pi_new"));

    orchestrator(&orders, &gateway)
        .initiate(request(order_id))
        .expect("new attempt allowed");

    let stored = orders.get(order_id).unwrap();
    assert_eq!(stored.payment_intent_id.as_deref(), Some("pi_new"));
    assert_eq!(stored.payment_status, PaymentStatus::Pending);
}

#[test]
fn intent_creation_failure_surfaces_gateway_detail() {
    let orders = Arc::new(InMemoryOrders::default());
    let order_id = orders.seed(new_order(DeliveryMethod::Pickup, None));
    let gateway = Arc::new(ScriptedGateway::new("pi_x"));
    *gateway.fail_intent.lock().unwrap() = Some(api_error("amount_below_minimum"));

    let err = orchestrator(&orders, &gateway)
        .initiate(request(order_id))
        .unwrap_err();

    match err {
        PaymentError::IntentCreation(source) => {
            assert_eq!(source.code(), Some("amount_below_minimum"));
        }
        other => panic!("expected IntentCreation, got {:?}", other),
    }
    assert_eq!(ScriptedGateway::count(&gateway.methods_created), 0);
}

#[test]
fn missing_contact_details_use_placeholders() {
    let orders = Arc::new(InMemoryOrders::default());
    let order_id = orders.seed(new_order(DeliveryMethod::Pickup, None));
    let gateway = Arc::new(ScriptedGateway::new("pi_anon"));

    orchestrator(&orders, &gateway)
        .initiate(PaymentRequest {
            order_id: Some(order_id),
            amount: Some(decimal("0.10")),
            ..Default::default()
        })
        .unwrap();

    let billing = gateway.billing_seen.lock().unwrap()[0].clone();
    assert_eq!(billing.name, "Customer");
    assert_eq!(billing.email, "customer@example.com");
    assert_eq!(billing.phone, None);
}
