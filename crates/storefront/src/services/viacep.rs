//! ViaCEP postal-code lookup client.
//!
//! Consulted read-only to prefill city/neighborhood/street from a CEP.
//! Every failure mode - short code, network error, unknown CEP - yields
//! `None` and is otherwise silent: the customer just types the address in
//! manually.

use serde::{Deserialize, Serialize};

use folia_core::address::CEP_DIGITS;
use folia_core::customer::digits_only;

/// ViaCEP API base URL.
const BASE_URL: &str = "https://viacep.com.br/ws";

/// Address fields resolved from a postal code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddressLookup {
    pub city: String,
    pub neighborhood: String,
    pub street: String,
}

/// ViaCEP HTTP client.
#[derive(Clone, Default)]
pub struct ViaCepClient {
    client: reqwest::Client,
}

impl ViaCepClient {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Best-effort lookup of a postal code.
    ///
    /// Returns `None` unless the code normalizes to exactly eight digits
    /// and the service answers with a known CEP.
    pub async fn lookup(&self, postal_code: &str) -> Option<AddressLookup> {
        let digits = digits_only(postal_code);
        if digits.len() != CEP_DIGITS {
            return None;
        }

        let url = format!("{BASE_URL}/{digits}/json/");
        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!(cep = %digits, error = %e, "CEP lookup failed");
                return None;
            }
        };

        let data: ViaCepResponse = match response.json().await {
            Ok(data) => data,
            Err(e) => {
                tracing::debug!(cep = %digits, error = %e, "CEP response unparsable");
                return None;
            }
        };

        // ViaCEP signals an unknown CEP with an `erro` marker field
        if data.erro.is_some() {
            return None;
        }

        Some(AddressLookup {
            city: data.localidade.unwrap_or_default(),
            neighborhood: data.bairro.unwrap_or_default(),
            street: data.logradouro.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct ViaCepResponse {
    erro: Option<serde_json::Value>,
    localidade: Option<String>,
    bairro: Option<String>,
    logradouro: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_short_code_skips_network() {
        // Fewer than eight digits never triggers a request
        let client = ViaCepClient::new();
        assert_eq!(client.lookup("0131").await, None);
        assert_eq!(client.lookup("").await, None);
    }

    #[test]
    fn test_error_marker_parses() {
        let data: ViaCepResponse = serde_json::from_str(r#"{"erro": true}"#).unwrap();
        assert!(data.erro.is_some());

        let data: ViaCepResponse = serde_json::from_str(
            r#"{"localidade": "São Paulo", "bairro": "Bela Vista", "logradouro": "Avenida Paulista"}"#,
        )
        .unwrap();
        assert!(data.erro.is_none());
        assert_eq!(data.localidade.as_deref(), Some("São Paulo"));
    }
}
