//! End-to-end booking flow tests against a mocked backend.
//!
//! Each scenario drives the real session state machine, payment bridge and
//! pending store; only the HTTP backend and the payment processor are mocked.

use std::sync::Arc;
use stayflow_booking::{
    BookingSession, FlowSignal, MockProcessor, PaymentBridge, RateLockManager, SessionContext,
    SessionError, SessionState,
};
use stayflow_core::models::{NameField, RoomOccupancy};
use stayflow_core::store::PendingStore;
use stayflow_gateway::ApiGateway;
use stayflow_store::MemoryPendingStore;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const RETURN_URL: &str = "http://localhost:5173/booking/confirmation";

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn context() -> SessionContext {
    SessionContext {
        user_email: "ada@example.com".to_string(),
        hotel_id: "hotel-17".to_string(),
        search_rooms: vec![RoomOccupancy {
            adults: 2,
            children: 0,
        }],
        language: "en".to_string(),
    }
}

async fn mount_rate_lock(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/hotel/prebook"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "hotels": [{ "rates": [{
                "book_hash": "h-locked",
                "daily_prices": ["60.00", "60.00"],
                "payment_options": { "payment_types": [
                    { "type": "now", "amount": "120.00", "currency_code": "USD" },
                    { "type": "deposit", "amount": "20.00", "currency_code": "USD" }
                ]}
            }]}]
        })))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/hotel/booking/form"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": {
                "order_id": "ord-1",
                "partner_order_id": "p-ord-1",
                "item_id": "itm-1",
                "payment_types": [
                    { "type": "now", "amount": "120.00", "currency_code": "USD" },
                    { "type": "deposit", "amount": "20.00", "currency_code": "USD" }
                ]
            }
        })))
        .mount(server)
        .await;
}

async fn mount_intent(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/payment/payment-intent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": true,
            "clientSecret": "pi_42_secret_abc"
        })))
        .mount(server)
        .await;
}

async fn mount_payment_status(server: &MockServer, confirmed: bool) {
    Mock::given(method("GET"))
        .and(path("/api/payment/payment-status/pi_42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": confirmed
        })))
        .mount(server)
        .await;
}

/// Build a session that has collected guest data and sits in
/// `ReadyForPayment`, with the rate locked against the mock backend.
async fn ready_session(
    server: &MockServer,
    store: Arc<MemoryPendingStore>,
) -> (BookingSession, Arc<ApiGateway>) {
    init_tracing();
    let gateway = Arc::new(ApiGateway::new(server.uri()));
    let manager = RateLockManager::new(gateway.clone(), "en");
    let ctx = context();

    let quote = manager
        .lock_rate("h-searched", &ctx.search_rooms)
        .await
        .unwrap();
    let contract = manager.fetch_guest_form_contract(&quote).await;

    let mut session = BookingSession::new(ctx, quote, contract, gateway.clone(), store);
    session
        .set_primary_guest(0, NameField::First, "Ada")
        .unwrap();
    session
        .set_primary_guest(0, NameField::Last, "Lovelace")
        .unwrap();
    session.set_phone("+15550100").unwrap();
    session.proceed_to_payment().unwrap();
    (session, gateway)
}

#[tokio::test]
async fn test_happy_path_pays_now_amount_and_clears_store() {
    let server = MockServer::start().await;
    mount_rate_lock(&server).await;
    mount_payment_status(&server, true).await;

    // The charge must be the pay-now amount in minor units, never the deposit.
    Mock::given(method("POST"))
        .and(path("/api/payment/payment-intent"))
        .and(body_partial_json(serde_json::json!({
            "amount": 12000,
            "currency": "usd"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": true,
            "clientSecret": "pi_42_secret_abc"
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/hotel/booking/finish"))
        .and(body_partial_json(serde_json::json!({
            "order_id": "ord-1",
            "payment_type": { "type": "deposit", "amount": "20.00", "currency_code": "USD" },
            "user": { "email": "ada@example.com", "phone": "+15550100" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "ok": true,
            "reservation_id": "res-9"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryPendingStore::new());
    let (mut session, gateway) = ready_session(&server, store.clone()).await;
    let bridge = PaymentBridge::new(gateway, Arc::new(MockProcessor::succeeding()), RETURN_URL);

    let signal = session.request_payment(&bridge).await.unwrap();
    match signal {
        FlowSignal::Completed { reservation } => {
            assert_eq!(reservation["reservation_id"], "res-9");
        }
        other => panic!("expected completion, got {other:?}"),
    }
    assert_eq!(session.state(), SessionState::Completed);
    // Cleared only on success, and success happened.
    assert!(store.get().await.unwrap().is_none());
}

#[tokio::test]
async fn test_redirect_leaves_payload_staged_and_finalize_untouched() {
    let server = MockServer::start().await;
    mount_rate_lock(&server).await;
    mount_intent(&server).await;

    Mock::given(method("POST"))
        .and(path("/api/hotel/booking/finish"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryPendingStore::new());
    let (mut session, gateway) = ready_session(&server, store.clone()).await;
    let bridge = PaymentBridge::new(
        gateway,
        Arc::new(MockProcessor::requiring_action(Some(
            "https://processor.example/3ds".to_string(),
        ))),
        RETURN_URL,
    );

    let signal = session.request_payment(&bridge).await.unwrap();
    assert!(matches!(signal, FlowSignal::RedirectPending));
    assert_eq!(session.state(), SessionState::AwaitingPaymentConfirmation);

    // The payload was written before the confirmation call went out, so the
    // post-redirect process can finalize without any form state.
    let staged = store.get().await.unwrap().unwrap();
    assert_eq!(staged.user.email, "ada@example.com");
}

#[tokio::test]
async fn test_resume_after_redirect_finalizes_from_store() {
    let server = MockServer::start().await;
    mount_rate_lock(&server).await;
    mount_intent(&server).await;
    mount_payment_status(&server, true).await;

    Mock::given(method("POST"))
        .and(path("/api/hotel/booking/finish"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "ok": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryPendingStore::new());
    let (mut session, gateway) = ready_session(&server, store.clone()).await;
    let bridge = PaymentBridge::new(
        gateway.clone(),
        Arc::new(MockProcessor::requiring_action(None)),
        RETURN_URL,
    );
    session.request_payment(&bridge).await.unwrap();

    // Simulate the redirect wiping the process: only gateway + store survive.
    drop(session);
    let mut resumed = BookingSession::resume(context(), gateway, store.clone());

    let signal = resumed
        .resume_after_redirect(&bridge, "payment_intent=pi_42&redirect_status=succeeded")
        .await
        .unwrap();
    assert!(matches!(signal, FlowSignal::Completed { .. }));
    assert_eq!(resumed.state(), SessionState::Completed);
    assert!(store.get().await.unwrap().is_none());
}

#[tokio::test]
async fn test_spoofed_redirect_status_never_reaches_finalize() {
    let server = MockServer::start().await;
    mount_rate_lock(&server).await;
    mount_intent(&server).await;
    // Backend says the payment did not go through, whatever the query claims.
    mount_payment_status(&server, false).await;

    Mock::given(method("POST"))
        .and(path("/api/hotel/booking/finish"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryPendingStore::new());
    let (mut session, gateway) = ready_session(&server, store.clone()).await;
    let bridge = PaymentBridge::new(
        gateway.clone(),
        Arc::new(MockProcessor::requiring_action(None)),
        RETURN_URL,
    );
    session.request_payment(&bridge).await.unwrap();

    let mut resumed = BookingSession::resume(context(), gateway, store);
    let err = resumed
        .resume_after_redirect(&bridge, "payment_intent=pi_42&redirect_status=succeeded")
        .await
        .unwrap_err();

    assert!(matches!(err, SessionError::PaymentNotConfirmed));
    assert_eq!(resumed.state(), SessionState::Failed);
}

#[tokio::test]
async fn test_processor_decline_is_recoverable_without_repaying_stage() {
    let server = MockServer::start().await;
    mount_rate_lock(&server).await;
    mount_intent(&server).await;

    let store = Arc::new(MemoryPendingStore::new());
    let (mut session, gateway) = ready_session(&server, store.clone()).await;
    let bridge = PaymentBridge::new(
        gateway,
        Arc::new(MockProcessor::failing("card declined")),
        RETURN_URL,
    );

    let signal = session.request_payment(&bridge).await.unwrap();
    match signal {
        FlowSignal::PaymentError { message } => assert_eq!(message, "card declined"),
        other => panic!("expected payment error, got {other:?}"),
    }
    assert_eq!(session.state(), SessionState::Failed);
    assert_eq!(session.failure_reason(), Some("card declined"));

    // Nothing was captured; the user goes back to the payment step.
    session.restart_payment().unwrap();
    assert_eq!(session.state(), SessionState::ReadyForPayment);
    assert!(store.get().await.unwrap().is_some());
}

#[tokio::test]
async fn test_finalize_failure_retains_payload_and_retry_resubmits_it_verbatim() {
    let server = MockServer::start().await;
    mount_rate_lock(&server).await;
    mount_intent(&server).await;
    mount_payment_status(&server, true).await;

    // First finalize attempt dies on the backend; the retry succeeds.
    Mock::given(method("POST"))
        .and(path("/api/hotel/booking/finish"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/hotel/booking/finish"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "ok": true
        })))
        .mount(&server)
        .await;

    let store = Arc::new(MemoryPendingStore::new());
    let (mut session, gateway) = ready_session(&server, store.clone()).await;
    let bridge = PaymentBridge::new(gateway, Arc::new(MockProcessor::succeeding()), RETURN_URL);

    let err = session.request_payment(&bridge).await.unwrap_err();
    assert!(matches!(err, SessionError::PaymentCapturedUnconfirmed(_)));
    assert_eq!(session.state(), SessionState::Failed);
    // Funds are captured; re-paying must not be offered.
    assert!(matches!(
        session.restart_payment(),
        Err(SessionError::InvalidTransition { .. })
    ));
    // The payload survives the failure for the retry.
    assert!(store.get().await.unwrap().is_some());

    let signal = session.retry_finalize(&bridge).await.unwrap();
    assert!(matches!(signal, FlowSignal::Completed { .. }));
    assert_eq!(session.state(), SessionState::Completed);
    assert!(store.get().await.unwrap().is_none());

    // Both finalize attempts must have carried the exact same payload.
    let requests = server.received_requests().await.unwrap();
    let finish_bodies: Vec<_> = requests
        .iter()
        .filter(|r| r.url.path() == "/api/hotel/booking/finish")
        .map(|r| r.body.clone())
        .collect();
    assert_eq!(finish_bodies.len(), 2);
    assert_eq!(finish_bodies[0], finish_bodies[1]);
}

#[tokio::test]
async fn test_payment_requires_phone_number() {
    init_tracing();
    let server = MockServer::start().await;
    mount_rate_lock(&server).await;

    let gateway = Arc::new(ApiGateway::new(server.uri()));
    let manager = RateLockManager::new(gateway.clone(), "en");
    let ctx = context();
    let quote = manager.lock_rate("h", &ctx.search_rooms).await.unwrap();
    let contract = manager.fetch_guest_form_contract(&quote).await;

    let store = Arc::new(MemoryPendingStore::new());
    let mut session = BookingSession::new(ctx, quote, contract, gateway.clone(), store.clone());
    session
        .set_primary_guest(0, NameField::First, "Ada")
        .unwrap();
    session
        .set_primary_guest(0, NameField::Last, "Lovelace")
        .unwrap();
    session.proceed_to_payment().unwrap();

    let bridge = PaymentBridge::new(gateway, Arc::new(MockProcessor::succeeding()), RETURN_URL);
    let err = session.request_payment(&bridge).await.unwrap_err();
    assert!(matches!(err, SessionError::MissingPhone));
    // Guard fired before anything was staged or charged.
    assert_eq!(session.state(), SessionState::ReadyForPayment);
    assert!(store.get().await.unwrap().is_none());
}
