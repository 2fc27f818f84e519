//! PIX payment gateway client.
//!
//! # Architecture
//!
//! - [`PixGateway`] is the seam the checkout flow talks through: one call
//!   to create a charge, one call to ask whether it was paid
//! - [`MedusaClient`] is the production implementation over the
//!   MedusaPay-shaped HTTP API; tests substitute scripted gateways
//! - The gateway secret stays server-side; browsers only ever reach the
//!   proxy routes in [`crate::routes`]
//!
//! # Failure policy
//!
//! Charge creation is never retried automatically - a failure surfaces to
//! the customer, who may resubmit. Status queries that fail are treated by
//! the polling loop as a transient miss, not a fatal condition.

mod medusa;

pub use medusa::MedusaClient;

use async_trait::async_trait;
use thiserror::Error;

use folia_core::{ChargeRequest, ChargeResult, PaymentStatus};

/// Errors that can occur when interacting with the payment gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// HTTP request failed (network, TLS, timeout).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Gateway returned a non-success response.
    #[error("Gateway error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Request rejected before it was sent (empty fields, bad amount).
    #[error("Invalid charge request: {0}")]
    Invalid(String),

    /// Failed to parse the gateway response.
    #[error("Parse error: {0}")]
    Parse(String),
}

impl GatewayError {
    /// HTTP status to mirror back through the proxy, when one applies.
    #[must_use]
    pub const fn status_code(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Result of a status query: the domain status plus the raw gateway code,
/// which the status proxy echoes for debugging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusSnapshot {
    pub status: PaymentStatus,
    pub raw_status: String,
}

/// Gateway operations the checkout flow depends on.
#[async_trait]
pub trait PixGateway: Send + Sync {
    /// Create a PIX charge for the given request.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Invalid`] when preconditions fail (amount
    /// not positive, required customer fields empty) and
    /// [`GatewayError::Api`]/[`GatewayError::Http`] on remote failure.
    /// Callers must not retry automatically.
    async fn create_charge(&self, request: &ChargeRequest) -> Result<ChargeResult, GatewayError>;

    /// Query the payment status of a previously created charge.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError`] on network or non-success responses; the
    /// polling loop swallows these and tries again on the next tick.
    async fn query_status(&self, transaction_id: &str) -> Result<StatusSnapshot, GatewayError>;
}
