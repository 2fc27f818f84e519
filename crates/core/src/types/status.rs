//! Payment status mapping.
//!
//! The gateway reports a free-form status vocabulary ("paid", "pending",
//! "refused", ...). The checkout flow only cares about one question: has
//! the charge been paid yet?

use serde::{Deserialize, Serialize};

/// Gateway status codes that mean the charge was paid, matched
/// case-insensitively.
const PAID_SYNONYMS: &[&str] = &["paid", "approved", "pago"];

/// Two-valued payment status as seen by the polling loop.
///
/// Anything the gateway reports that is not a known paid synonym maps to
/// `Pending`, including vocabulary we have never seen. The polling loop
/// tolerates transient pendingness, so unknown codes fail open toward
/// "not yet paid" instead of erroring; they must never map to `Paid`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PaymentStatus {
    Paid,
    #[default]
    Pending,
}

impl PaymentStatus {
    /// Map a raw gateway status code to the domain status.
    #[must_use]
    pub fn from_gateway(raw: &str) -> Self {
        let raw = raw.trim().to_lowercase();
        if PAID_SYNONYMS.contains(&raw.as_str()) {
            Self::Paid
        } else {
            Self::Pending
        }
    }

    /// Whether this status confirms payment.
    #[must_use]
    pub const fn is_paid(self) -> bool {
        matches!(self, Self::Paid)
    }

    /// Customer-facing label used by the status endpoint.
    #[must_use]
    pub const fn display_label(self) -> &'static str {
        match self {
            Self::Paid => "Pago",
            Self::Pending => "Pendente",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paid_synonyms() {
        assert_eq!(PaymentStatus::from_gateway("paid"), PaymentStatus::Paid);
        assert_eq!(PaymentStatus::from_gateway("approved"), PaymentStatus::Paid);
        assert_eq!(PaymentStatus::from_gateway("pago"), PaymentStatus::Paid);
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(PaymentStatus::from_gateway("PAID"), PaymentStatus::Paid);
        assert_eq!(PaymentStatus::from_gateway(" Pago "), PaymentStatus::Paid);
    }

    #[test]
    fn test_pending_and_refused() {
        assert_eq!(
            PaymentStatus::from_gateway("pending"),
            PaymentStatus::Pending
        );
        assert_eq!(
            PaymentStatus::from_gateway("refused"),
            PaymentStatus::Pending
        );
    }

    #[test]
    fn test_unknown_vocabulary_fails_open() {
        assert_eq!(
            PaymentStatus::from_gateway("chargeback_requested"),
            PaymentStatus::Pending
        );
        assert_eq!(PaymentStatus::from_gateway(""), PaymentStatus::Pending);
    }

    #[test]
    fn test_display_labels() {
        assert_eq!(PaymentStatus::Paid.display_label(), "Pago");
        assert_eq!(PaymentStatus::Pending.display_label(), "Pendente");
    }
}
