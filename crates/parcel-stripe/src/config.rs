//! # Stripe Configuration
//!
//! Configuration management for the Stripe gateway.
//! The secret key is loaded from the environment and never logged.

use parcel_core::DeliveryError;
use std::env;

/// Default API base URL
pub const STRIPE_API_BASE: &str = "https://api.stripe.com";

/// Pinned API version sent with every request
pub const STRIPE_API_VERSION: &str = "2024-12-18.acacia";

/// Currency used when `STRIPE_CURRENCY` is unset
pub const DEFAULT_CURRENCY: &str = "usd";

/// Stripe API configuration
#[derive(Clone)]
pub struct StripeConfig {
    /// Secret API key (sk_test_... or sk_live_...)
    pub secret_key: String,

    /// API base URL (for testing/mocking)
    pub api_base_url: String,

    /// API version
    pub api_version: String,

    /// Lowercase ISO currency every intent is created in
    pub currency: String,
}

impl StripeConfig {
    /// Load configuration from environment variables.
    ///
    /// Required env vars:
    /// - `STRIPE_SECRET_KEY`
    ///
    /// Optional:
    /// - `STRIPE_CURRENCY` (default `usd`)
    pub fn from_env() -> Result<Self, DeliveryError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let secret_key = env::var("STRIPE_SECRET_KEY").map_err(|_| {
            DeliveryError::Configuration("STRIPE_SECRET_KEY not set".to_string())
        })?;

        // Validate key format
        if !secret_key.starts_with("sk_test_") && !secret_key.starts_with("sk_live_") {
            return Err(DeliveryError::Configuration(
                "STRIPE_SECRET_KEY must start with sk_test_ or sk_live_".to_string(),
            ));
        }

        let currency = env::var("STRIPE_CURRENCY")
            .map(|c| c.trim().to_lowercase())
            .ok()
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| DEFAULT_CURRENCY.to_string());

        Ok(Self::new(secret_key).with_currency(currency))
    }

    /// Create config with explicit values (for testing)
    pub fn new(secret_key: impl Into<String>) -> Self {
        Self {
            secret_key: secret_key.into(),
            api_base_url: STRIPE_API_BASE.to_string(),
            api_version: STRIPE_API_VERSION.to_string(),
            currency: DEFAULT_CURRENCY.to_string(),
        }
    }

    /// Check if using test keys
    pub fn is_test_mode(&self) -> bool {
        self.secret_key.starts_with("sk_test_")
    }

    /// Get authorization header value
    pub fn auth_header(&self) -> String {
        format!("Bearer {}", self.secret_key)
    }

    /// Builder: set custom API base URL (for testing)
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    /// Builder: set the intent currency
    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }
}

impl std::fmt::Debug for StripeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeConfig")
            .field("secret_key", &"[REDACTED]")
            .field("api_base_url", &self.api_base_url)
            .field("api_version", &self.api_version)
            .field("currency", &self.currency)
            .finish()
    }
}
