//! # Firebase Configuration

use parcel_core::DeliveryError;
use std::env;

/// Google's published signing keys for Firebase ID tokens
pub const FIREBASE_JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";

/// Issuer prefix; the project id is appended
pub const FIREBASE_ISSUER_PREFIX: &str = "https://securetoken.google.com/";

/// Firebase Authentication configuration
#[derive(Debug, Clone)]
pub struct FirebaseConfig {
    /// Firebase project id (token audience)
    pub project_id: String,

    /// JWK set endpoint (for testing/mocking)
    pub jwks_url: String,
}

impl FirebaseConfig {
    /// Load configuration from environment variables.
    ///
    /// Required env vars:
    /// - `FIREBASE_PROJECT_ID`
    pub fn from_env() -> Result<Self, DeliveryError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let project_id = env::var("FIREBASE_PROJECT_ID")
            .ok()
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| {
                DeliveryError::Configuration("FIREBASE_PROJECT_ID not set".to_string())
            })?;

        Ok(Self::new(project_id))
    }

    /// Create config with explicit values (for testing)
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            jwks_url: FIREBASE_JWKS_URL.to_string(),
        }
    }

    /// Builder: set custom key set URL (for testing)
    pub fn with_jwks_url(mut self, url: impl Into<String>) -> Self {
        self.jwks_url = url.into();
        self
    }

    /// Expected `iss` claim
    pub fn issuer(&self) -> String {
        format!("{}{}", FIREBASE_ISSUER_PREFIX, self.project_id)
    }
}
