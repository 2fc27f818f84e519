//! Customer identification data collected by the checkout form.

use serde::{Deserialize, Serialize};

/// Customer data captured on the first checkout step.
///
/// Phone and document are stored as typed by the customer (masks and all);
/// [`CustomerData::phone_digits`] and [`CustomerData::document_digits`]
/// strip the formatting for the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CustomerData {
    pub name: String,
    pub email: String,
    pub phone: String,
    /// Tax id (CPF or CNPJ), possibly formatted with punctuation.
    pub document: String,
}

/// Brazilian tax document kind, derived from the digit count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    /// Individual taxpayer id (up to 11 digits).
    Cpf,
    /// Business taxpayer id (more than 11 digits).
    Cnpj,
}

impl DocumentType {
    /// Gateway wire value for this document kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cpf => "cpf",
            Self::Cnpj => "cnpj",
        }
    }
}

impl CustomerData {
    /// Whether every field is filled in, which is all the form step
    /// requires to advance.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.name.trim().is_empty()
            && !self.email.trim().is_empty()
            && !self.phone.trim().is_empty()
            && !self.document.trim().is_empty()
    }

    /// Phone number with all non-digits stripped.
    #[must_use]
    pub fn phone_digits(&self) -> String {
        digits_only(&self.phone)
    }

    /// Document number with all non-digits stripped.
    #[must_use]
    pub fn document_digits(&self) -> String {
        digits_only(&self.document)
    }

    /// Document kind: ≤ 11 digits is a CPF, anything longer a CNPJ.
    #[must_use]
    pub fn document_type(&self) -> DocumentType {
        if self.document_digits().len() > 11 {
            DocumentType::Cnpj
        } else {
            DocumentType::Cpf
        }
    }
}

/// Strip everything but ASCII digits.
#[must_use]
pub fn digits_only(value: &str) -> String {
    value.chars().filter(char::is_ascii_digit).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn customer(document: &str) -> CustomerData {
        CustomerData {
            name: "Maria Souza".to_string(),
            email: "maria@example.com".to_string(),
            phone: "(11) 98765-4321".to_string(),
            document: document.to_string(),
        }
    }

    #[test]
    fn test_digits_only_strips_mask() {
        assert_eq!(digits_only("123.456.789-09"), "12345678909");
        assert_eq!(digits_only("(11) 98765-4321"), "11987654321");
    }

    #[test]
    fn test_cpf_at_eleven_digits() {
        assert_eq!(
            customer("123.456.789-09").document_type(),
            DocumentType::Cpf
        );
    }

    #[test]
    fn test_cnpj_above_eleven_digits() {
        assert_eq!(
            customer("12.345.678/0001-95").document_type(),
            DocumentType::Cnpj
        );
    }

    #[test]
    fn test_is_complete_requires_all_fields() {
        assert!(customer("12345678909").is_complete());

        let mut missing = customer("12345678909");
        missing.email = "   ".to_string();
        assert!(!missing.is_complete());
    }
}
