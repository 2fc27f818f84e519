//! End-to-end checkout session lifecycle tests.
//!
//! Each test builds the full application state around a scripted gateway
//! and a temp-dir pending-order store, then drives the session the way
//! the HTTP layer would. The tokio clock is paused, so polling ticks are
//! deterministic.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use rust_decimal_macros::dec;

use folia_core::{AddressData, CartItem, ChargeResult, CustomerData};
use folia_integration_tests::ScriptedGateway;
use folia_storefront::config::{AnalyticsConfig, CheckoutConfig, GatewayConfig};
use folia_storefront::gateway::GatewayError;
use folia_storefront::state::AppState;

fn config(orders_path: &Path) -> CheckoutConfig {
    CheckoutConfig {
        host: "127.0.0.1".parse().expect("valid ip"),
        port: 0,
        gateway: GatewayConfig {
            api_url: "https://gateway.invalid/v1".to_string(),
            secret_key: secrecy_key(),
        },
        orders_path: orders_path.to_path_buf(),
        analytics: AnalyticsConfig::default(),
        sentry_dsn: None,
        sentry_environment: None,
    }
}

fn secrecy_key() -> secrecy::SecretString {
    secrecy::SecretString::from("sk_test_mK2nL5pQ7rT0uW4zC6")
}

fn customer() -> CustomerData {
    CustomerData {
        name: "Maria Souza".to_string(),
        email: "maria@example.com".to_string(),
        phone: "(11) 98765-4321".to_string(),
        document: "123.456.789-09".to_string(),
    }
}

fn address() -> AddressData {
    AddressData {
        postal_code: "01310-100".to_string(),
        city: "São Paulo".to_string(),
        neighborhood: "Bela Vista".to_string(),
        street: "Avenida Paulista".to_string(),
        number: "1000".to_string(),
        complement: Some("Apto 42".to_string()),
    }
}

fn cart() -> Vec<CartItem> {
    vec![
        CartItem {
            name: "Combo Feijoada".to_string(),
            quantity: 2,
            price: dec!(34.90),
        },
        CartItem {
            name: "Guaraná 2L".to_string(),
            quantity: 1,
            price: dec!(9.90),
        },
    ]
}

fn charge(transaction_id: &str) -> ChargeResult {
    ChargeResult {
        transaction_id: transaction_id.to_string(),
        pix_code: "00020126580014br.gov.bcb.pix...".to_string(),
        qr_code_url: "https://api.qrserver.com/v1/create-qr-code/?data=x".to_string(),
        expires_at: None,
        amount: dec!(79.70),
    }
}

#[tokio::test(start_paused = true)]
async fn full_flow_confirms_via_polling() {
    let dir = tempfile::tempdir().expect("tempdir");
    let gateway = Arc::new(ScriptedGateway::new(
        vec![Ok(charge("tx_live_1"))],
        vec![
            Ok(ScriptedGateway::status("pending")),
            Ok(ScriptedGateway::status("paid")),
        ],
    ));
    let state = AppState::with_gateway(config(&dir.path().join("orders.json")), gateway.clone());

    let session = state.create_session(dec!(79.70), cart());
    assert_eq!(session.phase().name(), "form");

    session.submit_customer(customer()).expect("customer step");
    assert_eq!(gateway.create_calls.load(Ordering::SeqCst), 0);

    let phase = session.submit_address(address()).await.expect("address step");
    assert_eq!(phase.name(), "awaiting_payment");
    assert_eq!(gateway.create_calls.load(Ordering::SeqCst), 1);

    // The charge is on record while unconfirmed
    let records = state.orders().list();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].transaction_id, "tx_live_1");
    assert_eq!(records[0].customer_name, "Maria Souza");

    // One conversion event queued for the tag collector
    let events = state.tag_events().drain();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].transaction_id, "tx_live_1");

    // First tick: pending. Second tick: paid.
    tokio::time::sleep(Duration::from_secs(6)).await;
    assert_eq!(session.phase().name(), "awaiting_payment");
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(session.phase().name(), "confirmed");

    // Confirmation clears the record and stops the poller
    assert!(state.orders().list().is_empty());
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(gateway.status_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn failed_creation_retries_without_duplicate_charge() {
    let dir = tempfile::tempdir().expect("tempdir");
    let gateway = Arc::new(ScriptedGateway::new(
        vec![
            Err(GatewayError::Api {
                status: 500,
                message: "saldo insuficiente".to_string(),
            }),
            Ok(charge("tx_live_2")),
        ],
        vec![],
    ));
    let state = AppState::with_gateway(config(&dir.path().join("orders.json")), gateway.clone());

    let session = state.create_session(dec!(79.70), cart());
    session.submit_customer(customer()).expect("customer step");

    // Gateway refuses: the session fails with the gateway's message
    let phase = session.submit_address(address()).await.expect("address step");
    let json = serde_json::to_value(&phase).expect("phase json");
    assert_eq!(json["phase"], "failed");
    assert_eq!(json["message"], "saldo insuficiente");
    assert!(state.orders().list().is_empty());
    assert!(state.tag_events().drain().is_empty());

    // Retry returns to the form with entered values retained
    session.retry().expect("retry");
    assert_eq!(session.phase().name(), "form");
    assert_eq!(session.customer().expect("retained").name, "Maria Souza");

    // Second attempt succeeds; exactly two creation calls total
    session.submit_customer(customer()).expect("customer step");
    let phase = session.submit_address(address()).await.expect("address step");
    assert_eq!(phase.name(), "awaiting_payment");
    assert_eq!(gateway.create_calls.load(Ordering::SeqCst), 2);

    let records = state.orders().list();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].transaction_id, "tx_live_2");
}

#[tokio::test(start_paused = true)]
async fn manual_confirmation_beats_polling() {
    let dir = tempfile::tempdir().expect("tempdir");
    let gateway = Arc::new(ScriptedGateway::new(vec![Ok(charge("tx_live_3"))], vec![]));
    let state = AppState::with_gateway(config(&dir.path().join("orders.json")), gateway.clone());

    let session = state.create_session(dec!(19.90), cart());
    session.submit_customer(customer()).expect("customer step");
    session.submit_address(address()).await.expect("address step");

    // Customer taps "I already paid" before the first poll tick
    let phase = session.confirm_paid().expect("manual confirm");
    assert_eq!(phase.name(), "confirmed");
    assert!(state.orders().list().is_empty());

    // The canceled timer never queries the gateway
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(gateway.status_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn session_teardown_stops_polling_and_keeps_record() {
    let dir = tempfile::tempdir().expect("tempdir");
    let gateway = Arc::new(ScriptedGateway::new(vec![Ok(charge("tx_live_4"))], vec![]));
    let state = AppState::with_gateway(config(&dir.path().join("orders.json")), gateway.clone());

    let session = state.create_session(dec!(19.90), cart());
    let id = session.id();
    session.submit_customer(customer()).expect("customer step");
    session.submit_address(address()).await.expect("address step");

    // Navigation away: the session goes, the pending record stays
    assert!(state.remove_session(id));
    assert!(state.session(id).is_none());
    assert_eq!(state.orders().list().len(), 1);

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(gateway.status_calls.load(Ordering::SeqCst), 0);

    // Removing twice is not a thing
    assert!(!state.remove_session(id));
}

#[tokio::test]
async fn sessions_are_isolated() {
    let dir = tempfile::tempdir().expect("tempdir");
    let gateway = Arc::new(ScriptedGateway::new(
        vec![Ok(charge("tx_a")), Ok(charge("tx_b"))],
        vec![],
    ));
    let state = AppState::with_gateway(config(&dir.path().join("orders.json")), gateway.clone());

    // Two tabs, two sessions; each dispatches its own conversion
    let first = state.create_session(dec!(10), cart());
    let second = state.create_session(dec!(20), cart());
    assert_ne!(first.id(), second.id());

    first.submit_customer(customer()).expect("customer step");
    first.submit_address(address()).await.expect("address step");
    second.submit_customer(customer()).expect("customer step");
    second.submit_address(address()).await.expect("address step");

    assert_eq!(state.orders().list().len(), 2);
    assert_eq!(state.tag_events().drain().len(), 2);
}
