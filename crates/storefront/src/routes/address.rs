//! Postal-code lookup route handler.

use axum::Json;
use axum::extract::{Path, State};
use serde::Serialize;
use tracing::instrument;

use crate::state::AppState;

/// Lookup response; fields are empty when the code could not be resolved.
#[derive(Debug, Serialize, Default)]
pub struct AddressLookupResponse {
    pub city: String,
    pub neighborhood: String,
    pub street: String,
}

/// Resolve a CEP to address fields, best effort.
///
/// Always answers 200: a failed or unknown lookup returns empty fields
/// and the customer fills the address in manually.
#[instrument(skip(state))]
pub async fn lookup(
    State(state): State<AppState>,
    Path(cep): Path<String>,
) -> Json<AddressLookupResponse> {
    let response = state
        .viacep()
        .lookup(&cep)
        .await
        .map(|found| AddressLookupResponse {
            city: found.city,
            neighborhood: found.neighborhood,
            street: found.street,
        })
        .unwrap_or_default();

    Json(response)
}
