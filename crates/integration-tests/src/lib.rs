//! Integration tests for the Folia Delivery checkout.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p folia-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `checkout_flow` - Full session lifecycle against a scripted gateway
//! - `pending_orders` - Store durability across reopen
//!
//! Tests run fully in-process: the storefront library is driven directly
//! with a scripted [`folia_storefront::gateway::PixGateway`]
//! implementation, a temp-dir pending-order store and a paused tokio
//! clock, so no network or running server is required.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use folia_core::{ChargeRequest, ChargeResult, PaymentStatus};
use folia_storefront::gateway::{GatewayError, PixGateway, StatusSnapshot};

/// Scripted gateway double shared by the integration tests.
///
/// `create_charge` replays a fixed outcome and counts calls;
/// `query_status` replays a script, repeating `Pending` once exhausted.
pub struct ScriptedGateway {
    create_outcomes: Mutex<VecDeque<Result<ChargeResult, GatewayError>>>,
    pub create_calls: AtomicUsize,
    statuses: Mutex<VecDeque<Result<StatusSnapshot, GatewayError>>>,
    pub status_calls: AtomicUsize,
}

impl ScriptedGateway {
    #[must_use]
    pub fn new(
        create_outcomes: Vec<Result<ChargeResult, GatewayError>>,
        statuses: Vec<Result<StatusSnapshot, GatewayError>>,
    ) -> Self {
        Self {
            create_outcomes: Mutex::new(create_outcomes.into_iter().collect()),
            create_calls: AtomicUsize::new(0),
            statuses: Mutex::new(statuses.into_iter().collect()),
            status_calls: AtomicUsize::new(0),
        }
    }

    /// Snapshot with the given raw status code.
    #[must_use]
    pub fn status(raw: &str) -> StatusSnapshot {
        StatusSnapshot {
            status: PaymentStatus::from_gateway(raw),
            raw_status: raw.to_string(),
        }
    }
}

#[async_trait]
impl PixGateway for ScriptedGateway {
    async fn create_charge(&self, request: &ChargeRequest) -> Result<ChargeResult, GatewayError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        self.create_outcomes
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .pop_front()
            .unwrap_or_else(|| {
                Ok(ChargeResult {
                    transaction_id: "tx_default".to_string(),
                    pix_code: "00020126...".to_string(),
                    qr_code_url: String::new(),
                    expires_at: None,
                    amount: request.amount,
                })
            })
    }

    async fn query_status(&self, _transaction_id: &str) -> Result<StatusSnapshot, GatewayError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        self.statuses
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .pop_front()
            .unwrap_or_else(|| Ok(Self::status("pending")))
    }
}
