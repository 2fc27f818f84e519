//! Folia Delivery checkout service.
//!
//! This binary serves the PIX checkout API on port 3000.
//!
//! # Architecture
//!
//! - Axum JSON API driving the checkout session state machine
//! - MedusaPay gateway client for PIX charge creation and status polling
//! - Local JSON file for pending-order bookkeeping
//! - ViaCEP for postal-code lookups
//!
//! # Security
//!
//! The gateway secret key lives only in this process. Browsers talk to
//! the proxy routes; the key is never embedded in any client payload.

#![cfg_attr(not(test), forbid(unsafe_code))]
// Modules are shared with the library target; not every item is reachable
// from the binary alone
#![allow(dead_code)]

mod analytics;
mod checkout;
mod config;
mod error;
mod gateway;
mod orders;
mod routes;
mod services;
mod state;

use sentry::integrations::tracing as sentry_tracing;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::CheckoutConfig;
use state::AppState;

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &CheckoutConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    // Load configuration from environment (needed for Sentry init)
    let config = CheckoutConfig::from_env().expect("Failed to load configuration");

    let _sentry_guard = init_sentry(&config);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,folia_storefront=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let addr = config.socket_addr();
    let state = AppState::new(config).expect("Failed to build application state");

    let app = routes::router(state).layer(TraceLayer::new_for_http());

    tracing::info!(%addr, "Starting Folia checkout service");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listener");
    axum::serve(listener, app).await.expect("Server error");
}
