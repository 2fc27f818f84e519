//! MedusaPay HTTP client implementation of [`PixGateway`].

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, Utc};
use rand::Rng;
use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::Deserialize;

use folia_core::{CartItem, ChargeRequest, ChargeResult, PaymentStatus, to_minor_units};

use crate::config::GatewayConfig;

use super::{GatewayError, PixGateway, StatusSnapshot};

/// Prefix for locally generated transaction ids.
const TRANSACTION_ID_PREFIX: &str = "FOLIA";

/// Fixed customer-visible label for the synthetic gateway line item. The
/// gateway shows this title to the payer instead of a literal item list.
const CHARGE_ITEM_TITLE: &str = "Combo Escolhido";

/// PIX charges expire after one day.
const PIX_EXPIRES_IN_DAYS: u32 = 1;

/// Public QR-rendering endpoint. The gateway returns only the raw PIX
/// payload, not an image.
const QR_RENDER_URL: &str = "https://api.qrserver.com/v1/create-qr-code/";

/// Fallback message when the gateway fails without a usable `message`.
const GENERIC_CREATE_ERROR: &str = "Erro ao criar cobrança PIX";
const GENERIC_STATUS_ERROR: &str = "Erro ao consultar status";

/// MedusaPay API client.
#[derive(Clone)]
pub struct MedusaClient {
    client: reqwest::Client,
    api_url: String,
}

impl MedusaClient {
    /// Create a new gateway client with basic-auth headers derived from
    /// the server-held secret key.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let mut headers = HeaderMap::new();

        // MedusaPay basic auth: the secret key is the username, "x" the password
        let credentials = BASE64.encode(format!("{}:x", config.secret_key.expose_secret()));
        let mut auth_value = HeaderValue::from_str(&format!("Basic {credentials}"))
            .map_err(|e| GatewayError::Parse(format!("Invalid secret key format: {e}")))?;
        auth_value.set_sensitive(true);
        headers.insert("Authorization", auth_value);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl PixGateway for MedusaClient {
    async fn create_charge(&self, request: &ChargeRequest) -> Result<ChargeResult, GatewayError> {
        validate_request(request)?;

        let amount_cents =
            to_minor_units(request.amount).map_err(|e| GatewayError::Invalid(e.to_string()))?;
        let local_id = local_transaction_id();
        let body = transaction_body(request, amount_cents, &local_id);

        tracing::debug!(order_id = %local_id, amount_cents, "Sending charge creation to gateway");

        let url = format!("{}/transactions", self.api_url);
        let response = self.client.post(&url).json(&body).send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = error_message(response.text().await.ok(), GENERIC_CREATE_ERROR);
            tracing::warn!(status = status.as_u16(), %message, "Gateway refused charge creation");
            return Err(GatewayError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let data: CreateTransactionResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::Parse(e.to_string()))?;

        // The pix payload field is lowercase "qrcode" on this API
        let pix_code = data
            .pix
            .as_ref()
            .and_then(|pix| pix.qrcode.clone())
            .unwrap_or_default();
        let expires_at = data
            .pix
            .as_ref()
            .and_then(|pix| pix.expires_at.as_deref())
            .or(data.expires_at.as_deref())
            .and_then(parse_expiry);

        Ok(ChargeResult {
            transaction_id: data.id.or(data.transaction_id).unwrap_or(local_id),
            qr_code_url: qr_image_url(&pix_code),
            pix_code,
            expires_at,
            amount: request.amount,
        })
    }

    async fn query_status(&self, transaction_id: &str) -> Result<StatusSnapshot, GatewayError> {
        let url = format!("{}/transactions/{transaction_id}", self.api_url);
        let response = self.client.get(&url).send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = error_message(response.text().await.ok(), GENERIC_STATUS_ERROR);
            return Err(GatewayError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let data: TransactionStatusResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::Parse(e.to_string()))?;

        let raw_status = data.status.unwrap_or_default().to_lowercase();
        Ok(StatusSnapshot {
            status: PaymentStatus::from_gateway(&raw_status),
            raw_status,
        })
    }
}

/// Check the preconditions for charge creation.
fn validate_request(request: &ChargeRequest) -> Result<(), GatewayError> {
    let customer = &request.customer;
    if customer.name.trim().is_empty()
        || customer.email.trim().is_empty()
        || customer.document.trim().is_empty()
    {
        return Err(GatewayError::Invalid(
            "customer name, email and document are required".to_string(),
        ));
    }
    Ok(())
}

/// Build the gateway request body.
///
/// Items are collapsed into one synthetic line item carrying the full
/// amount; only the metadata description reflects the real quantity.
fn transaction_body(
    request: &ChargeRequest,
    amount_cents: i64,
    local_id: &str,
) -> serde_json::Value {
    let customer = &request.customer;
    let phone = customer.phone_digits();
    let total_quantity = CartItem::total_quantity(&request.items).max(1);

    serde_json::json!({
        "amount": amount_cents,
        "paymentMethod": "pix",
        "items": [{
            "id": "item-1",
            "title": CHARGE_ITEM_TITLE,
            "unitPrice": amount_cents,
            "quantity": 1,
            "tangible": true,
        }],
        "customer": {
            "name": customer.name,
            "email": customer.email,
            "phone": if phone.is_empty() { None } else { Some(phone) },
            "document": {
                "number": customer.document_digits(),
                "type": customer.document_type().as_str(),
            },
        },
        "pix": {
            "expiresInDays": PIX_EXPIRES_IN_DAYS,
        },
        "metadata": {
            "order_id": local_id,
            "description": format!("{total_quantity}x {CHARGE_ITEM_TITLE}"),
        },
    })
}

/// Generate a local transaction id of the form `FOLIA-<millis>-<random>`,
/// used as the metadata order id and as a fallback when the gateway omits
/// its own id.
fn local_transaction_id() -> String {
    let suffix: String = rand::rng()
        .sample_iter(rand::distr::Alphanumeric)
        .take(6)
        .map(char::from)
        .collect::<String>()
        .to_lowercase();
    format!(
        "{TRANSACTION_ID_PREFIX}-{}-{suffix}",
        Utc::now().timestamp_millis()
    )
}

/// Render URL for the QR image of a PIX payload; empty when there is no
/// payload to encode.
fn qr_image_url(pix_code: &str) -> String {
    if pix_code.is_empty() {
        return String::new();
    }
    format!(
        "{QR_RENDER_URL}?size=300x300&data={}",
        urlencoding::encode(pix_code)
    )
}

/// Best-effort parse of the gateway expiry timestamp.
fn parse_expiry(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}

/// Pull a human-readable message out of a gateway error body.
fn error_message(body: Option<String>, fallback: &str) -> String {
    body.and_then(|text| serde_json::from_str::<ErrorBody>(&text).ok())
        .and_then(|body| body.message.or(body.error))
        .filter(|message| !message.trim().is_empty())
        .unwrap_or_else(|| fallback.to_string())
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreateTransactionResponse {
    id: Option<String>,
    #[serde(rename = "transactionId")]
    transaction_id: Option<String>,
    pix: Option<PixPayload>,
    #[serde(rename = "expiresAt")]
    expires_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PixPayload {
    qrcode: Option<String>,
    #[serde(rename = "expiresAt", alias = "expires_at")]
    expires_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TransactionStatusResponse {
    status: Option<String>,
}
