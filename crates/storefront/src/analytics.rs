//! Conversion analytics dispatch.
//!
//! Reports a successful charge creation to the marketing collectors
//! exactly once per checkout session. Collectors load asynchronously and
//! independently of the checkout flow, so every branch is best-effort:
//!
//! - a structured event is pushed onto a shared queue consumed by the
//!   tag-management collector (always possible);
//! - the conversion-tracking hook is invoked if registered, with exactly
//!   one delayed retry if it is not there yet (its collector may still be
//!   loading);
//! - the purchase-tracking pixel hook is invoked if registered, with
//!   item/quantity aggregation and no retry.
//!
//! A missing hook is a missed report, never an error, and no branch may
//! block another. Nothing in this module is visible to the customer.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use rust_decimal::Decimal;
use serde::Serialize;

use folia_core::CartItem;

/// All conversion values are reported in BRL; the checkout is
/// single-currency.
const CURRENCY: &str = "BRL";

/// How long to wait before the single conversion-hook retry.
const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Structured event pushed onto the tag-management queue.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TagEvent {
    pub event: String,
    pub transaction_id: String,
    pub value: Decimal,
    pub currency: String,
}

/// Conversion event passed to the conversion-tracking hook.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversionEvent {
    /// Collector-specific conversion target (e.g. Google Ads `send_to`).
    pub send_to: Option<String>,
    pub transaction_id: String,
    pub value: Decimal,
    pub currency: String,
}

/// Purchase event passed to the pixel hook.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PurchaseEvent {
    pub value: Decimal,
    pub currency: String,
    pub content_type: String,
    pub contents: Vec<PurchaseContent>,
    pub num_items: u32,
}

/// One aggregated line of a [`PurchaseEvent`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PurchaseContent {
    pub id: String,
    pub quantity: u32,
    pub item_price: Decimal,
}

/// Conversion-tracking collector hook.
pub trait ConversionHook: Send + Sync {
    fn conversion(&self, event: &ConversionEvent);
}

/// Purchase-pixel collector hook.
pub trait PurchaseHook: Send + Sync {
    fn purchase(&self, event: &PurchaseEvent);
}

/// Shared queue of tag events awaiting the tag-management consumer.
#[derive(Clone, Default)]
pub struct TagEventQueue {
    events: Arc<Mutex<VecDeque<TagEvent>>>,
}

impl TagEventQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event for the consumer.
    pub fn push(&self, event: TagEvent) {
        self.lock().push_back(event);
    }

    /// Take every queued event, leaving the queue empty.
    #[must_use]
    pub fn drain(&self) -> Vec<TagEvent> {
        self.lock().drain(..).collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<TagEvent>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Registry of optional collector hooks.
///
/// Collector integrations register themselves whenever they finish
/// loading, which may be after checkout sessions have already advanced.
/// Consumers therefore re-read the slots instead of caching them.
#[derive(Clone, Default)]
pub struct AnalyticsHooks {
    inner: Arc<HookSlots>,
}

#[derive(Default)]
struct HookSlots {
    conversion: RwLock<Option<Arc<dyn ConversionHook>>>,
    purchase: RwLock<Option<Arc<dyn PurchaseHook>>>,
}

impl AnalyticsHooks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_conversion(&self, hook: Arc<dyn ConversionHook>) {
        *self
            .inner
            .conversion
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(hook);
    }

    pub fn register_purchase(&self, hook: Arc<dyn PurchaseHook>) {
        *self
            .inner
            .purchase
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(hook);
    }

    #[must_use]
    pub fn conversion(&self) -> Option<Arc<dyn ConversionHook>> {
        self.inner
            .conversion
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn purchase(&self) -> Option<Arc<dyn PurchaseHook>> {
        self.inner
            .purchase
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Session-scoped conversion dispatcher with a one-shot gate.
///
/// Each checkout session owns its own dispatcher, so a re-render entering
/// the payment-visible phase twice (or a second tab's session) cannot
/// double-count. The second `dispatch` call within a session is a no-op
/// regardless of arguments.
pub struct ConversionDispatcher {
    queue: TagEventQueue,
    hooks: AnalyticsHooks,
    /// Conversion target from config, forwarded on every conversion event.
    send_to: Option<String>,
    retry_delay: Duration,
    fired: AtomicBool,
}

impl ConversionDispatcher {
    #[must_use]
    pub fn new(queue: TagEventQueue, hooks: AnalyticsHooks, send_to: Option<String>) -> Self {
        Self {
            queue,
            hooks,
            send_to,
            retry_delay: DEFAULT_RETRY_DELAY,
            fired: AtomicBool::new(false),
        }
    }

    /// Override the conversion-retry delay (tests).
    #[must_use]
    pub const fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Report the charge creation to every collector, at most once per
    /// session. Must be called from within a tokio runtime (the retry
    /// branch spawns a delayed task).
    pub fn dispatch(&self, transaction_id: &str, amount: Decimal, items: &[CartItem]) {
        if self.fired.swap(true, Ordering::SeqCst) {
            tracing::debug!(transaction_id, "Conversion already dispatched for this session");
            return;
        }

        tracing::info!(transaction_id, %amount, "Dispatching conversion events");

        self.push_tag_event(transaction_id, amount);
        self.fire_conversion(transaction_id, amount);
        self.fire_purchase(amount, items);
    }

    /// Branch (a): tag-management event queue.
    fn push_tag_event(&self, transaction_id: &str, amount: Decimal) {
        self.queue.push(TagEvent {
            event: "compra_aprovada".to_string(),
            transaction_id: transaction_id.to_string(),
            value: amount,
            currency: CURRENCY.to_string(),
        });
    }

    /// Branch (b): conversion hook, with one delayed retry when absent.
    fn fire_conversion(&self, transaction_id: &str, amount: Decimal) {
        let event = ConversionEvent {
            send_to: self.send_to.clone(),
            transaction_id: transaction_id.to_string(),
            value: amount,
            currency: CURRENCY.to_string(),
        };

        if let Some(hook) = self.hooks.conversion() {
            hook.conversion(&event);
            return;
        }

        tracing::debug!("Conversion hook not registered yet, retrying once");
        let hooks = self.hooks.clone();
        let delay = self.retry_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(hook) = hooks.conversion() {
                hook.conversion(&event);
            } else {
                tracing::debug!("Conversion hook still not registered after retry");
            }
        });
    }

    /// Branch (c): purchase pixel hook, no retry.
    fn fire_purchase(&self, amount: Decimal, items: &[CartItem]) {
        let Some(hook) = self.hooks.purchase() else {
            tracing::debug!("Purchase hook not registered");
            return;
        };

        let contents = items
            .iter()
            .enumerate()
            .map(|(index, item)| PurchaseContent {
                id: format!("product_{index}"),
                quantity: item.quantity,
                item_price: item.price,
            })
            .collect();

        hook.purchase(&PurchaseEvent {
            value: amount,
            currency: CURRENCY.to_string(),
            content_type: "product".to_string(),
            contents,
            num_items: CartItem::total_quantity(items),
        });
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use rust_decimal_macros::dec;

    use super::*;

    #[derive(Default)]
    struct CountingHook {
        conversions: AtomicUsize,
        purchases: AtomicUsize,
        last_purchase: Mutex<Option<PurchaseEvent>>,
    }

    impl ConversionHook for CountingHook {
        fn conversion(&self, _event: &ConversionEvent) {
            self.conversions.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl PurchaseHook for CountingHook {
        fn purchase(&self, event: &PurchaseEvent) {
            self.purchases.fetch_add(1, Ordering::SeqCst);
            *self.last_purchase.lock().unwrap() = Some(event.clone());
        }
    }

    fn items() -> Vec<CartItem> {
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

    #[tokio::test]
    async fn test_dispatch_pushes_tag_event() {
        let queue = TagEventQueue::new();
        let dispatcher = ConversionDispatcher::new(queue.clone(), AnalyticsHooks::new(), None);

        dispatcher.dispatch("tx_1", dec!(79.70), &items());

        let events = queue.drain();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event, "compra_aprovada");
        assert_eq!(events[0].transaction_id, "tx_1");
        assert_eq!(events[0].value, dec!(79.70));
        assert_eq!(events[0].currency, "BRL");
    }

    #[tokio::test]
    async fn test_dispatch_is_one_shot() {
        let queue = TagEventQueue::new();
        let hook = Arc::new(CountingHook::default());
        let hooks = AnalyticsHooks::new();
        hooks.register_conversion(hook.clone());
        hooks.register_purchase(hook.clone());
        let dispatcher = ConversionDispatcher::new(queue.clone(), hooks, None);

        dispatcher.dispatch("tx_1", dec!(10), &items());
        dispatcher.dispatch("tx_1", dec!(10), &items());
        dispatcher.dispatch("tx_other", dec!(99), &[]);

        assert_eq!(queue.drain().len(), 1);
        assert_eq!(hook.conversions.load(Ordering::SeqCst), 1);
        assert_eq!(hook.purchases.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_purchase_event_aggregates_items() {
        let hook = Arc::new(CountingHook::default());
        let hooks = AnalyticsHooks::new();
        hooks.register_purchase(hook.clone());
        let dispatcher = ConversionDispatcher::new(TagEventQueue::new(), hooks, None);

        dispatcher.dispatch("tx_1", dec!(79.70), &items());

        let event = hook.last_purchase.lock().unwrap().clone().unwrap();
        assert_eq!(event.num_items, 3);
        assert_eq!(event.contents.len(), 2);
        assert_eq!(event.contents[0].id, "product_0");
        assert_eq!(event.contents[0].quantity, 2);
        assert_eq!(event.content_type, "product");
    }

    #[tokio::test(start_paused = true)]
    async fn test_conversion_retries_once_for_late_hook() {
        let hook = Arc::new(CountingHook::default());
        let hooks = AnalyticsHooks::new();
        let dispatcher = ConversionDispatcher::new(TagEventQueue::new(), hooks.clone(), None)
            .with_retry_delay(Duration::from_millis(100));

        // Hook is absent at dispatch time
        dispatcher.dispatch("tx_1", dec!(10), &[]);
        assert_eq!(hook.conversions.load(Ordering::SeqCst), 0);

        // Collector finishes loading before the retry fires
        hooks.register_conversion(hook.clone());
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(hook.conversions.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_conversion_gives_up_after_single_retry() {
        let hook = Arc::new(CountingHook::default());
        let hooks = AnalyticsHooks::new();
        let dispatcher = ConversionDispatcher::new(TagEventQueue::new(), hooks.clone(), None)
            .with_retry_delay(Duration::from_millis(100));

        dispatcher.dispatch("tx_1", dec!(10), &[]);
        tokio::time::sleep(Duration::from_millis(300)).await;

        // Registering after the retry window must not resurrect the event
        hooks.register_conversion(hook.clone());
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(hook.conversions.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_hooks_do_not_block_queue_branch() {
        let queue = TagEventQueue::new();
        let dispatcher = ConversionDispatcher::new(queue.clone(), AnalyticsHooks::new(), None);

        dispatcher.dispatch("tx_1", dec!(10), &[]);
        assert_eq!(queue.drain().len(), 1);
    }

    #[tokio::test]
    async fn test_send_to_forwarded_to_conversion_hook() {
        struct CaptureHook(Mutex<Option<ConversionEvent>>);
        impl ConversionHook for CaptureHook {
            fn conversion(&self, event: &ConversionEvent) {
                *self.0.lock().unwrap() = Some(event.clone());
            }
        }

        let hook = Arc::new(CaptureHook(Mutex::new(None)));
        let hooks = AnalyticsHooks::new();
        hooks.register_conversion(hook.clone());
        let dispatcher = ConversionDispatcher::new(
            TagEventQueue::new(),
            hooks,
            Some("AW-17934359668/b5kPCJ_O3_gbEPS44udC".to_string()),
        );

        dispatcher.dispatch("tx_1", dec!(10), &[]);

        let event = hook.0.lock().unwrap().clone().unwrap();
        assert_eq!(
            event.send_to.as_deref(),
            Some("AW-17934359668/b5kPCJ_O3_gbEPS44udC")
        );
    }
}
