//! Checkout session state machine.
//!
//! Drives the multi-step PIX payment flow:
//!
//! ```text
//! Form --submit(valid customer)--> Address
//! Address --submit(valid address)--> Creating
//! Creating --gateway success--> AwaitingPayment   (save pending order,
//!                                                  dispatch conversion once)
//! Creating --gateway failure--> Failed
//! AwaitingPayment --poll sees Paid | manual confirm--> Confirmed
//!                                                  (remove pending order)
//! Failed --retry--> Form
//! ```
//!
//! One session per checkout invocation; one transition in flight at a
//! time (out-of-phase calls are rejected, so a double submission while a
//! charge creation is outstanding cannot create a second charge). While
//! awaiting payment a polling task queries the gateway every
//! [`POLL_INTERVAL`], one query at a time, each awaited before the next
//! tick. Leaving the awaiting phase for any reason invalidates the poll
//! epoch before side effects of late responses can land, and aborts the
//! task.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use uuid::Uuid;

use folia_core::{AddressData, CartItem, ChargeRequest, ChargeResult, CustomerData};

use crate::analytics::ConversionDispatcher;
use crate::gateway::{GatewayError, PixGateway};
use crate::orders::PendingOrderStore;

/// How often the awaiting-payment phase queries the gateway.
pub const POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Customer-facing message for create failures without a gateway message.
const GENERIC_PAYMENT_ERROR: &str = "Erro ao processar pagamento";

/// Errors surfaced to the caller of a session operation.
///
/// A failed charge creation is not among them: that is a phase
/// ([`SessionPhase::Failed`]), reported through the phase view with the
/// gateway's message.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// A required field is missing; the step transition is blocked.
    #[error("{0}")]
    Validation(String),

    /// Operation is not allowed in the session's current phase.
    #[error("operation not allowed in the {0} phase")]
    InvalidPhase(&'static str),
}

/// The session's current position in the checkout flow.
///
/// Exactly one phase is active per session. Not persisted: a page reload
/// loses the in-flight phase, while the pending-order store retains the
/// record for the recovery view.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "phase", rename_all = "camelCase")]
pub enum SessionPhase {
    /// Collecting customer identification.
    Form,
    /// Collecting the delivery address.
    Address { customer: CustomerData },
    /// Charge creation request outstanding.
    Creating {
        customer: CustomerData,
        address: AddressData,
    },
    /// Charge created; QR code visible, polling for payment.
    AwaitingPayment { charge: ChargeResult },
    /// Payment observed or manually confirmed. Terminal.
    Confirmed { transaction_id: String },
    /// Charge creation failed; the customer may retry.
    Failed { message: String },
}

impl SessionPhase {
    /// Short phase name for errors and logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Form => "form",
            Self::Address { .. } => "address",
            Self::Creating { .. } => "creating",
            Self::AwaitingPayment { .. } => "awaiting_payment",
            Self::Confirmed { .. } => "confirmed",
            Self::Failed { .. } => "failed",
        }
    }
}

/// Mutable session state behind the lock.
struct SessionState {
    phase: SessionPhase,
    /// Entered values, retained across a failed creation so a retry does
    /// not force the customer to retype everything.
    customer: Option<CustomerData>,
    address: Option<AddressData>,
    /// Incremented on every entry into and exit out of awaiting-payment,
    /// and on teardown. A polling task only applies results while its
    /// epoch is current, so a stale Paid response cannot resurrect a
    /// vacated state; an in-flight charge creation checks it the same way
    /// before committing side effects.
    poll_epoch: u64,
}

/// A single checkout session.
///
/// Owns the gateway handle, the pending-order store handle and a
/// session-scoped conversion dispatcher.
pub struct Checkout {
    id: Uuid,
    amount: Decimal,
    items: Vec<CartItem>,
    gateway: Arc<dyn PixGateway>,
    store: PendingOrderStore,
    dispatcher: ConversionDispatcher,
    poll_interval: Duration,
    state: Arc<Mutex<SessionState>>,
    poll_task: Mutex<Option<JoinHandle<()>>>,
}

impl Checkout {
    /// Create a session at the `Form` phase with the standard polling
    /// interval.
    #[must_use]
    pub fn new(
        amount: Decimal,
        items: Vec<CartItem>,
        gateway: Arc<dyn PixGateway>,
        store: PendingOrderStore,
        dispatcher: ConversionDispatcher,
    ) -> Self {
        Self::with_poll_interval(amount, items, gateway, store, dispatcher, POLL_INTERVAL)
    }

    /// Create a session with a custom polling interval (tests).
    #[must_use]
    pub fn with_poll_interval(
        amount: Decimal,
        items: Vec<CartItem>,
        gateway: Arc<dyn PixGateway>,
        store: PendingOrderStore,
        dispatcher: ConversionDispatcher,
        poll_interval: Duration,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            amount,
            items,
            gateway,
            store,
            dispatcher,
            poll_interval,
            state: Arc::new(Mutex::new(SessionState {
                phase: SessionPhase::Form,
                customer: None,
                address: None,
                poll_epoch: 0,
            })),
            poll_task: Mutex::new(None),
        }
    }

    /// Session identifier.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Cart total in major units.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.amount
    }

    /// Current phase snapshot.
    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.lock_state().phase.clone()
    }

    /// Previously entered customer data, retained for prefill after a
    /// failed creation.
    #[must_use]
    pub fn customer(&self) -> Option<CustomerData> {
        self.lock_state().customer.clone()
    }

    /// Previously entered address data.
    #[must_use]
    pub fn address(&self) -> Option<AddressData> {
        self.lock_state().address.clone()
    }

    /// Submit the customer form: `Form -> Address`.
    ///
    /// # Errors
    ///
    /// [`CheckoutError::Validation`] when any field is empty,
    /// [`CheckoutError::InvalidPhase`] outside the `Form` phase.
    pub fn submit_customer(&self, customer: CustomerData) -> Result<SessionPhase, CheckoutError> {
        let mut state = self.lock_state();
        if !matches!(state.phase, SessionPhase::Form) {
            return Err(CheckoutError::InvalidPhase(state.phase.name()));
        }
        if !customer.is_complete() {
            return Err(CheckoutError::Validation(
                "Preencha todos os campos".to_string(),
            ));
        }

        state.customer = Some(customer.clone());
        state.phase = SessionPhase::Address { customer };
        Ok(state.phase.clone())
    }

    /// Submit the address form and create the charge:
    /// `Address -> Creating -> AwaitingPayment | Failed`.
    ///
    /// A gateway failure is not an `Err`: the session moves to `Failed`
    /// carrying the gateway's message and the returned phase reports it.
    /// The charge is never retried automatically.
    ///
    /// # Errors
    ///
    /// [`CheckoutError::Validation`] when a required field is empty,
    /// [`CheckoutError::InvalidPhase`] outside the `Address` phase - in
    /// particular while a creation request is already outstanding.
    pub async fn submit_address(
        &self,
        address: AddressData,
    ) -> Result<SessionPhase, CheckoutError> {
        let (request, epoch_before) = {
            let mut state = self.lock_state();
            let SessionPhase::Address { customer } = &state.phase else {
                return Err(CheckoutError::InvalidPhase(state.phase.name()));
            };
            if !address.is_complete() {
                return Err(CheckoutError::Validation(
                    "Preencha todos os campos do endereço".to_string(),
                ));
            }

            let customer = customer.clone();
            let request = ChargeRequest {
                amount: self.amount,
                customer: customer.clone(),
                items: self.items.clone(),
            };
            state.address = Some(address.clone());
            state.phase = SessionPhase::Creating { customer, address };
            (request, state.poll_epoch)
        };

        // Lock released while the request is in flight; any concurrent
        // submission now sees the Creating phase and is rejected.
        let outcome = self.gateway.create_charge(&request).await;

        let (phase, created) = {
            let mut state = self.lock_state();
            if state.poll_epoch != epoch_before
                || !matches!(state.phase, SessionPhase::Creating { .. })
            {
                // Torn down while the request was in flight (the epoch
                // moved on); drop the outcome without saving a record,
                // dispatching a conversion or starting a poller.
                return Ok(state.phase.clone());
            }

            match outcome {
                Ok(charge) => {
                    let customer_name = state
                        .customer
                        .as_ref()
                        .map(|c| c.name.clone())
                        .unwrap_or_default();
                    state.poll_epoch += 1;
                    let epoch = state.poll_epoch;
                    state.phase = SessionPhase::AwaitingPayment {
                        charge: charge.clone(),
                    };
                    (state.phase.clone(), Some((charge, customer_name, epoch)))
                }
                Err(e) => {
                    tracing::warn!(session = %self.id, error = %e, "Charge creation failed");
                    state.phase = SessionPhase::Failed {
                        message: failure_message(&e),
                    };
                    (state.phase.clone(), None)
                }
            }
        };

        if let Some((charge, customer_name, epoch)) = created {
            self.record_pending(&charge, customer_name);
            self.dispatcher
                .dispatch(&charge.transaction_id, self.amount, &self.items);
            self.spawn_polling(charge.transaction_id, epoch);
        }
        Ok(phase)
    }

    /// Manually confirm payment: `AwaitingPayment -> Confirmed`.
    ///
    /// Invalidates the poll epoch before aborting the timer, so a status
    /// response already in flight can no longer apply.
    ///
    /// # Errors
    ///
    /// [`CheckoutError::InvalidPhase`] outside `AwaitingPayment`.
    pub fn confirm_paid(&self) -> Result<SessionPhase, CheckoutError> {
        let epoch = {
            let state = self.lock_state();
            if !matches!(state.phase, SessionPhase::AwaitingPayment { .. }) {
                return Err(CheckoutError::InvalidPhase(state.phase.name()));
            }
            state.poll_epoch
        };

        apply_paid(&self.state, &self.store, epoch);
        self.abort_polling();
        Ok(self.phase())
    }

    /// Return to the form after a failed creation: `Failed -> Form`.
    ///
    /// Entered customer and address values are retained for prefill.
    ///
    /// # Errors
    ///
    /// [`CheckoutError::InvalidPhase`] outside the `Failed` phase.
    pub fn retry(&self) -> Result<SessionPhase, CheckoutError> {
        let mut state = self.lock_state();
        if !matches!(state.phase, SessionPhase::Failed { .. }) {
            return Err(CheckoutError::InvalidPhase(state.phase.name()));
        }
        state.phase = SessionPhase::Form;
        Ok(state.phase.clone())
    }

    /// Tear the session down (page navigation away). Stops the polling
    /// timer and invalidates any in-flight charge creation; an
    /// already-saved pending-order record is kept for later recovery.
    pub fn teardown(&self) {
        self.lock_state().poll_epoch += 1;
        self.abort_polling();
    }

    /// Save the pending-order record. Store failures are logged and
    /// swallowed; the session continues without recovery support.
    fn record_pending(&self, charge: &ChargeResult, customer_name: String) {
        let order =
            folia_core::PendingOrder::from_charge(charge, self.items.clone(), customer_name);
        if let Err(e) = self.store.save(order) {
            tracing::warn!(session = %self.id, error = %e, "Failed to save pending order");
        }
    }

    /// Start the status-polling task for the current awaiting epoch.
    ///
    /// One query per tick, each awaited before the next tick is taken, so
    /// queries never overlap. The task exits as soon as the phase or
    /// epoch no longer matches.
    fn spawn_polling(&self, transaction_id: String, epoch: u64) {
        let state = Arc::clone(&self.state);
        let store = self.store.clone();
        let gateway = Arc::clone(&self.gateway);
        let interval = self.poll_interval;
        let session_id = self.id;

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick of a tokio interval completes immediately;
            // consume it so the first query happens one interval in.
            ticker.tick().await;

            loop {
                ticker.tick().await;
                if !is_awaiting(&state, epoch) {
                    break;
                }

                match gateway.query_status(&transaction_id).await {
                    Ok(snapshot) if snapshot.status.is_paid() => {
                        tracing::info!(session = %session_id, %transaction_id, "Payment confirmed by polling");
                        apply_paid(&state, &store, epoch);
                        break;
                    }
                    Ok(snapshot) => {
                        tracing::debug!(session = %session_id, raw_status = %snapshot.raw_status, "Charge still pending");
                    }
                    Err(e) => {
                        // Transient miss; the next tick tries again.
                        tracing::debug!(session = %session_id, error = %e, "Status query failed");
                    }
                }
            }
        });

        if let Some(previous) = self
            .poll_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(handle)
        {
            previous.abort();
        }
    }

    /// Stop the polling timer if one is running.
    fn abort_polling(&self) {
        if let Some(handle) = self
            .poll_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            handle.abort();
        }
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for Checkout {
    fn drop(&mut self) {
        self.abort_polling();
    }
}

/// Whether the session is still awaiting payment under the given epoch.
fn is_awaiting(state: &Mutex<SessionState>, epoch: u64) -> bool {
    let state = state.lock().unwrap_or_else(PoisonError::into_inner);
    state.poll_epoch == epoch && matches!(state.phase, SessionPhase::AwaitingPayment { .. })
}

/// Apply a payment confirmation under the lock, if the session is still
/// awaiting payment under the given epoch. Removes the pending-order
/// record and moves to `Confirmed`. Returns whether it applied.
fn apply_paid(state: &Mutex<SessionState>, store: &PendingOrderStore, epoch: u64) -> bool {
    let mut state = state.lock().unwrap_or_else(PoisonError::into_inner);
    if state.poll_epoch != epoch {
        return false;
    }
    let SessionPhase::AwaitingPayment { charge } = &state.phase else {
        return false;
    };

    let transaction_id = charge.transaction_id.clone();
    if let Err(e) = store.remove(&transaction_id) {
        tracing::warn!(%transaction_id, error = %e, "Failed to remove pending order");
    }
    state.poll_epoch += 1;
    state.phase = SessionPhase::Confirmed { transaction_id };
    true
}

/// Customer-facing message for a failed charge creation: the gateway's
/// message when it sent one, otherwise a generic fallback.
fn failure_message(error: &GatewayError) -> String {
    match error {
        GatewayError::Api { message, .. } | GatewayError::Invalid(message) => message.clone(),
        GatewayError::Http(_) | GatewayError::Parse(_) => GENERIC_PAYMENT_ERROR.to_string(),
    }
}
