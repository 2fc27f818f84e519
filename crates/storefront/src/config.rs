//! Checkout service configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `PIX_GATEWAY_SECRET_KEY` - Gateway API secret (server-side only,
//!   never sent to the browser)
//!
//! ## Optional
//! - `FOLIA_HOST` - Bind address (default: 127.0.0.1)
//! - `FOLIA_PORT` - Listen port (default: 3000)
//! - `PIX_GATEWAY_URL` - Gateway API base URL
//!   (default: `https://api.v2.medusapay.com.br/v1`)
//! - `FOLIA_ORDERS_PATH` - Pending-order store file
//!   (default: data/pending-orders.json)
//! - `GOOGLE_ADS_ID` - Google Ads conversion ID
//! - `GOOGLE_ADS_CONVERSION_LABEL` - Google Ads conversion label
//! - `META_PIXEL_ID` - Meta (Facebook) pixel ID
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use secrecy::SecretString;
use thiserror::Error;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Checkout service configuration.
#[derive(Debug, Clone)]
pub struct CheckoutConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// PIX gateway configuration
    pub gateway: GatewayConfig,
    /// File backing the pending-order store
    pub orders_path: PathBuf,
    /// Analytics tracking configuration
    pub analytics: AnalyticsConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name (e.g. production, staging)
    pub sentry_environment: Option<String>,
}

/// PIX gateway API configuration.
///
/// Implements `Debug` manually to redact the secret key.
#[derive(Clone)]
pub struct GatewayConfig {
    /// Gateway API base URL
    pub api_url: String,
    /// Gateway API secret key (used as basic-auth username)
    pub secret_key: SecretString,
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("api_url", &self.api_url)
            .field("secret_key", &"[REDACTED]")
            .finish()
    }
}

/// Analytics and tracking pixel configuration.
#[derive(Debug, Clone, Default)]
pub struct AnalyticsConfig {
    /// Google Ads conversion ID
    pub google_ads_id: Option<String>,
    /// Google Ads conversion label
    pub google_ads_conversion_label: Option<String>,
    /// Meta (Facebook) pixel ID
    pub meta_pixel_id: Option<String>,
}

impl AnalyticsConfig {
    /// Google Ads `send_to` target, when both parts are configured.
    #[must_use]
    pub fn conversion_send_to(&self) -> Option<String> {
        match (&self.google_ads_id, &self.google_ads_conversion_label) {
            (Some(id), Some(label)) => Some(format!("{id}/{label}")),
            _ => None,
        }
    }
}

impl CheckoutConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid,
    /// or if the gateway secret looks like a placeholder.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = get_env_or_default("FOLIA_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("FOLIA_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("FOLIA_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("FOLIA_PORT".to_string(), e.to_string()))?;

        let gateway = GatewayConfig::from_env()?;
        let orders_path =
            PathBuf::from(get_env_or_default("FOLIA_ORDERS_PATH", "data/pending-orders.json"));
        let analytics = AnalyticsConfig::from_env();
        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");

        Ok(Self {
            host,
            port,
            gateway,
            orders_path,
            analytics,
            sentry_dsn,
            sentry_environment,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl GatewayConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            api_url: get_env_or_default("PIX_GATEWAY_URL", "https://api.v2.medusapay.com.br/v1"),
            secret_key: get_validated_secret("PIX_GATEWAY_SECRET_KEY")?,
        })
    }
}

impl AnalyticsConfig {
    fn from_env() -> Self {
        Self {
            google_ads_id: get_optional_env("GOOGLE_ADS_ID"),
            google_ads_conversion_label: get_optional_env("GOOGLE_ADS_CONVERSION_LABEL"),
            meta_pixel_id: get_optional_env("META_PIXEL_ID"),
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Validate that a secret is not a placeholder left over from setup.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}
