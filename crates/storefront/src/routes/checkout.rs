//! Checkout session route handlers.
//!
//! Thin HTTP layer over [`crate::checkout::Checkout`]: each handler looks
//! the session up, applies one transition and answers with the session
//! view. Out-of-phase calls surface as 409, validation misses as 400.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use folia_core::{AddressData, CartItem, CustomerData};

use crate::checkout::{Checkout, SessionPhase};
use crate::error::{AppError, Result};
use crate::state::AppState;

/// Body for starting a session.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionBody {
    pub amount: Decimal,
    #[serde(default)]
    pub items: Vec<CartItem>,
}

/// Session view returned by every session endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub session_id: Uuid,
    pub amount: Decimal,
    #[serde(flatten)]
    pub phase: SessionPhase,
}

impl SessionView {
    fn of(session: &Checkout) -> Self {
        Self {
            session_id: session.id(),
            amount: session.amount(),
            phase: session.phase(),
        }
    }

    fn with_phase(session: &Checkout, phase: SessionPhase) -> Self {
        Self {
            session_id: session.id(),
            amount: session.amount(),
            phase,
        }
    }
}

/// Start a checkout session for a cart.
#[instrument(skip(state, body), fields(amount = %body.amount))]
pub async fn create_session(
    State(state): State<AppState>,
    Json(body): Json<CreateSessionBody>,
) -> Result<(StatusCode, Json<SessionView>)> {
    if body.amount <= Decimal::ZERO {
        return Err(AppError::BadRequest(
            "amount must be positive".to_string(),
        ));
    }

    let session = state.create_session(body.amount, body.items);
    Ok((StatusCode::CREATED, Json(SessionView::of(&session))))
}

/// Current phase of a session.
pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>> {
    let session = lookup(&state, id)?;
    Ok(Json(SessionView::of(&session)))
}

/// Submit the customer form.
#[instrument(skip(state, customer))]
pub async fn submit_customer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(customer): Json<CustomerData>,
) -> Result<Json<SessionView>> {
    let session = lookup(&state, id)?;
    let phase = session.submit_customer(customer)?;
    Ok(Json(SessionView::with_phase(&session, phase)))
}

/// Submit the address form, creating the charge.
///
/// A gateway refusal is not an error response: the returned view carries
/// the `failed` phase with the gateway's message.
#[instrument(skip(state, address))]
pub async fn submit_address(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(address): Json<AddressData>,
) -> Result<Json<SessionView>> {
    let session = lookup(&state, id)?;
    let phase = session.submit_address(address).await?;
    Ok(Json(SessionView::with_phase(&session, phase)))
}

/// Manually confirm that the charge was paid.
#[instrument(skip(state))]
pub async fn confirm_paid(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>> {
    let session = lookup(&state, id)?;
    let phase = session.confirm_paid()?;
    Ok(Json(SessionView::with_phase(&session, phase)))
}

/// Return to the form after a failed charge creation.
#[instrument(skip(state))]
pub async fn retry(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>> {
    let session = lookup(&state, id)?;
    let phase = session.retry()?;
    Ok(Json(SessionView::with_phase(&session, phase)))
}

/// Tear a session down (navigation away). The pending-order record, if
/// any, stays for the recovery view.
#[instrument(skip(state))]
pub async fn remove_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    if state.remove_session(id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("session {id}")))
    }
}

fn lookup(state: &AppState, id: Uuid) -> Result<Arc<Checkout>> {
    state
        .session(id)
        .ok_or_else(|| AppError::NotFound(format!("session {id}")))
}
