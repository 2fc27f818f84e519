//! Pending-order route handlers.
//!
//! Read-only surface for the pending-orders recovery view. Staleness
//! policy (hiding old records) is the view's concern, not the store's.

use axum::Json;
use axum::extract::State;

use folia_core::PendingOrder;

use crate::state::AppState;

/// List every charge awaiting confirmation, in no guaranteed order.
pub async fn list_pending(State(state): State<AppState>) -> Json<Vec<PendingOrder>> {
    Json(state.orders().list())
}
