//! Delivery address data collected by the checkout flow.

use serde::{Deserialize, Serialize};

use super::customer::digits_only;

/// Number of digits in a Brazilian postal code (CEP).
pub const CEP_DIGITS: usize = 8;

/// Delivery address captured on the second checkout step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AddressData {
    /// Postal code (CEP), possibly formatted as `00000-000`.
    pub postal_code: String,
    pub city: String,
    pub neighborhood: String,
    pub street: String,
    pub number: String,
    /// Apartment, block, reference point. The only optional field.
    #[serde(default)]
    pub complement: Option<String>,
}

impl AddressData {
    /// Whether every required field is filled in. Complement is optional.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.postal_code.trim().is_empty()
            && !self.city.trim().is_empty()
            && !self.neighborhood.trim().is_empty()
            && !self.street.trim().is_empty()
            && !self.number.trim().is_empty()
    }

    /// Postal code with formatting stripped.
    #[must_use]
    pub fn postal_code_digits(&self) -> String {
        digits_only(&self.postal_code)
    }

    /// A normalized postal code is exactly eight digits; only then is a
    /// lookup against the postal-code service worth issuing.
    #[must_use]
    pub fn has_lookup_ready_postal_code(&self) -> bool {
        self.postal_code_digits().len() == CEP_DIGITS
    }
}
