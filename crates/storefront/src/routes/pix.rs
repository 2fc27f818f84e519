//! Gateway proxy route handlers.
//!
//! These are the only places the gateway is reachable from outside: the
//! browser talks to this trusted proxy, which holds the secret key. The
//! request/response shapes mirror what the storefront UI expects.

use axum::Json;
use axum::extract::{Query, State};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use folia_core::{CartItem, ChargeRequest, CustomerData};

use crate::error::{AppError, Result};
use crate::state::AppState;

/// Create-charge request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateChargeBody {
    pub amount: Decimal,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_document: String,
    #[serde(default)]
    pub customer_phone: Option<String>,
    #[serde(default)]
    pub items: Vec<CartItem>,
}

/// Create-charge success response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateChargeResponse {
    pub success: bool,
    pub transaction_id: String,
    pub pix_code: String,
    pub pix_qr_code_image: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub amount: Decimal,
}

/// Status-query parameters.
#[derive(Debug, Deserialize)]
pub struct StatusParams {
    pub transaction_id: String,
}

/// Status-query response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub status: &'static str,
    pub raw_status: String,
}

/// Create a PIX charge through the gateway.
///
/// Failures mirror the gateway's HTTP status and carry its message when
/// one was sent; the caller must not retry automatically.
#[instrument(skip(state, body), fields(amount = %body.amount))]
pub async fn create_charge(
    State(state): State<AppState>,
    Json(body): Json<CreateChargeBody>,
) -> Result<Json<CreateChargeResponse>> {
    if body.amount <= Decimal::ZERO
        || body.customer_name.trim().is_empty()
        || body.customer_email.trim().is_empty()
        || body.customer_document.trim().is_empty()
    {
        return Err(AppError::BadRequest("Dados incompletos".to_string()));
    }

    let request = ChargeRequest {
        amount: body.amount,
        customer: CustomerData {
            name: body.customer_name,
            email: body.customer_email,
            phone: body.customer_phone.unwrap_or_default(),
            document: body.customer_document,
        },
        items: body.items,
    };

    let charge = state.gateway().create_charge(&request).await?;

    Ok(Json(CreateChargeResponse {
        success: true,
        transaction_id: charge.transaction_id,
        pix_code: charge.pix_code,
        pix_qr_code_image: charge.qr_code_url,
        expires_at: charge.expires_at,
        amount: charge.amount,
    }))
}

/// Query the payment status of a charge.
#[instrument(skip(state), fields(transaction_id = %params.transaction_id))]
pub async fn query_status(
    State(state): State<AppState>,
    Query(params): Query<StatusParams>,
) -> Result<Json<StatusResponse>> {
    if params.transaction_id.trim().is_empty() {
        return Err(AppError::BadRequest(
            "transaction_id é obrigatório".to_string(),
        ));
    }

    let snapshot = state.gateway().query_status(&params.transaction_id).await?;

    Ok(Json(StatusResponse {
        status: snapshot.status.display_label(),
        raw_status: snapshot.raw_status,
    }))
}
