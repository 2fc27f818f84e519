//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server-side errors to
//! Sentry before responding to the client. Route handlers return
//! `Result<T, AppError>`.
//!
//! Propagation policy: only validation failures and charge-creation
//! gateway errors carry a meaningful message to the client. Store and
//! analytics failures never reach this type - they are absorbed at their
//! origin.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::checkout::CheckoutError;
use crate::gateway::GatewayError;

/// Application-level error type for the checkout service.
#[derive(Debug, Error)]
pub enum AppError {
    /// Payment gateway operation failed.
    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// Checkout session operation rejected.
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server-side failures to Sentry; client mistakes and
        // gateway refusals are expected traffic.
        if matches!(
            self,
            Self::Internal(_) | Self::Gateway(GatewayError::Http(_) | GatewayError::Parse(_))
        ) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status = match &self {
            // Mirror the gateway's HTTP status through the proxy
            Self::Gateway(err) => err
                .status_code()
                .and_then(|code| StatusCode::from_u16(code).ok())
                .unwrap_or(match err {
                    GatewayError::Invalid(_) => StatusCode::BAD_REQUEST,
                    _ => StatusCode::BAD_GATEWAY,
                }),
            Self::Checkout(CheckoutError::Validation(_)) => StatusCode::BAD_REQUEST,
            Self::Checkout(CheckoutError::InvalidPhase(_)) => StatusCode::CONFLICT,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Gateway(GatewayError::Api { message, .. }) => message.clone(),
            Self::Gateway(GatewayError::Invalid(message)) => message.clone(),
            Self::Gateway(_) => "Erro ao comunicar com o gateway de pagamento".to_string(),
            Self::Checkout(err) => err.to_string(),
            Self::Internal(_) => "Erro interno do servidor".to_string(),
            Self::NotFound(_) | Self::BadRequest(_) => self.to_string(),
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;
