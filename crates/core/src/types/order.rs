//! Charge request/result shapes and the pending-order record.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::customer::CustomerData;

/// One line of the customer's cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub name: String,
    pub quantity: u32,
    /// Unit price in major units (reais).
    pub price: Decimal,
}

impl CartItem {
    /// Total quantity across a set of items.
    #[must_use]
    pub fn total_quantity(items: &[Self]) -> u32 {
        items.iter().map(|item| item.quantity).sum()
    }
}

/// Everything the gateway needs to create a PIX charge.
///
/// Built by the checkout once customer and address steps are complete.
/// Items are kept as entered; the gateway client collapses them into a
/// single synthetic line item, since the gateway shows the customer only
/// a fixed label rather than a literal item list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargeRequest {
    /// Amount in major units (reais). Must be positive.
    pub amount: Decimal,
    pub customer: CustomerData,
    pub items: Vec<CartItem>,
}

/// Outcome of a successful charge creation. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargeResult {
    /// Gateway-assigned id, or a locally generated fallback when the
    /// gateway omits one.
    pub transaction_id: String,
    /// Raw PIX copy-paste payload. Empty when the gateway did not return
    /// one.
    pub pix_code: String,
    /// URL of a rendered QR image for [`Self::pix_code`]. Empty when
    /// there is no code to encode.
    pub qr_code_url: String,
    pub expires_at: Option<DateTime<Utc>>,
    /// Amount in major units, echoed from the request.
    pub amount: Decimal,
}

/// A charge that was created but not yet confirmed paid.
///
/// Stored locally so a customer who closes the app can be reminded of the
/// open charge. Keyed by transaction id; deleted on confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingOrder {
    pub transaction_id: String,
    pub pix_code: String,
    pub qr_code_url: String,
    pub amount: Decimal,
    pub items: Vec<CartItem>,
    pub customer_name: String,
    pub created_at: DateTime<Utc>,
}

impl PendingOrder {
    /// Build the pending record for a freshly created charge.
    #[must_use]
    pub fn from_charge(charge: &ChargeResult, items: Vec<CartItem>, customer_name: String) -> Self {
        Self {
            transaction_id: charge.transaction_id.clone(),
            pix_code: charge.pix_code.clone(),
            qr_code_url: charge.qr_code_url.clone(),
            amount: charge.amount,
            items,
            customer_name,
            created_at: Utc::now(),
        }
    }
}
