//! HTTP route handlers for the checkout service.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                        - Health check
//!
//! # Gateway proxy (trusted; the secret never reaches the browser)
//! POST   /api/pix                       - Create a PIX charge
//! GET    /api/pix/status                - Query charge payment status
//!
//! # Checkout sessions
//! POST   /api/checkout                  - Start a session for a cart
//! GET    /api/checkout/{id}             - Session phase view
//! POST   /api/checkout/{id}/customer    - Submit customer form
//! POST   /api/checkout/{id}/address     - Submit address, create charge
//! POST   /api/checkout/{id}/confirm     - Manual payment confirmation
//! POST   /api/checkout/{id}/retry       - Back to the form after failure
//! DELETE /api/checkout/{id}             - Tear the session down
//!
//! # Helpers
//! GET    /api/address/{cep}             - Postal-code lookup (best effort)
//! GET    /api/orders/pending            - Unconfirmed orders (recovery view)
//! ```

pub mod address;
pub mod checkout;
pub mod orders;
pub mod pix;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Build the full application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/pix", post(pix::create_charge))
        .route("/api/pix/status", get(pix::query_status))
        .route("/api/checkout", post(checkout::create_session))
        .route(
            "/api/checkout/{id}",
            get(checkout::get_session).delete(checkout::remove_session),
        )
        .route("/api/checkout/{id}/customer", post(checkout::submit_customer))
        .route("/api/checkout/{id}/address", post(checkout::submit_address))
        .route("/api/checkout/{id}/confirm", post(checkout::confirm_paid))
        .route("/api/checkout/{id}/retry", post(checkout::retry))
        .route("/api/address/{cep}", get(address::lookup))
        .route("/api/orders/pending", get(orders::list_pending))
        .with_state(state)
}

/// Health check endpoint.
async fn health() -> &'static str {
    "OK"
}
