//! Application state shared across handlers.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use rust_decimal::Decimal;
use uuid::Uuid;

use folia_core::CartItem;

use crate::analytics::{AnalyticsHooks, ConversionDispatcher, TagEventQueue};
use crate::checkout::Checkout;
use crate::config::CheckoutConfig;
use crate::gateway::{GatewayError, MedusaClient, PixGateway};
use crate::orders::PendingOrderStore;
use crate::services::viacep::ViaCepClient;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources: the gateway client, the pending-order store, the
/// analytics plumbing and the live checkout sessions.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: CheckoutConfig,
    gateway: Arc<dyn PixGateway>,
    orders: PendingOrderStore,
    tag_events: TagEventQueue,
    hooks: AnalyticsHooks,
    viacep: ViaCepClient,
    sessions: Mutex<HashMap<Uuid, Arc<Checkout>>>,
}

impl AppState {
    /// Create application state with the production gateway client.
    ///
    /// # Errors
    ///
    /// Returns an error if the gateway HTTP client cannot be built from
    /// the configured credentials.
    pub fn new(config: CheckoutConfig) -> Result<Self, GatewayError> {
        let gateway = Arc::new(MedusaClient::new(&config.gateway)?);
        Ok(Self::with_gateway(config, gateway))
    }

    /// Create application state around an arbitrary gateway (tests).
    #[must_use]
    pub fn with_gateway(config: CheckoutConfig, gateway: Arc<dyn PixGateway>) -> Self {
        let orders = PendingOrderStore::open(config.orders_path.clone());
        Self {
            inner: Arc::new(AppStateInner {
                config,
                gateway,
                orders,
                tag_events: TagEventQueue::new(),
                hooks: AnalyticsHooks::new(),
                viacep: ViaCepClient::new(),
                sessions: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Get a reference to the service configuration.
    #[must_use]
    pub fn config(&self) -> &CheckoutConfig {
        &self.inner.config
    }

    /// Get the payment gateway client.
    #[must_use]
    pub fn gateway(&self) -> Arc<dyn PixGateway> {
        Arc::clone(&self.inner.gateway)
    }

    /// Get a handle to the pending-order store.
    #[must_use]
    pub fn orders(&self) -> &PendingOrderStore {
        &self.inner.orders
    }

    /// Get the shared tag-event queue.
    #[must_use]
    pub fn tag_events(&self) -> &TagEventQueue {
        &self.inner.tag_events
    }

    /// Get the analytics hook registry.
    #[must_use]
    pub fn analytics_hooks(&self) -> &AnalyticsHooks {
        &self.inner.hooks
    }

    /// Get the postal-code lookup client.
    #[must_use]
    pub fn viacep(&self) -> &ViaCepClient {
        &self.inner.viacep
    }

    /// Start a new checkout session for the given cart.
    pub fn create_session(&self, amount: Decimal, items: Vec<CartItem>) -> Arc<Checkout> {
        let dispatcher = ConversionDispatcher::new(
            self.inner.tag_events.clone(),
            self.inner.hooks.clone(),
            self.inner.config.analytics.conversion_send_to(),
        );
        let session = Arc::new(Checkout::new(
            amount,
            items,
            self.gateway(),
            self.inner.orders.clone(),
            dispatcher,
        ));
        self.lock_sessions().insert(session.id(), Arc::clone(&session));
        tracing::debug!(session = %session.id(), %amount, "Checkout session created");
        session
    }

    /// Look up a live checkout session.
    #[must_use]
    pub fn session(&self, id: Uuid) -> Option<Arc<Checkout>> {
        self.lock_sessions().get(&id).cloned()
    }

    /// Remove a session, stopping its polling timer.
    pub fn remove_session(&self, id: Uuid) -> bool {
        let Some(session) = self.lock_sessions().remove(&id) else {
            return false;
        };
        session.teardown();
        tracing::debug!(session = %id, "Checkout session removed");
        true
    }

    fn lock_sessions(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, Arc<Checkout>>> {
        self.inner
            .sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
