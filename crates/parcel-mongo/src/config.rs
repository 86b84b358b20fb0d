//! # MongoDB Configuration
//!
//! Connection settings loaded from environment variables.

use parcel_core::DeliveryError;
use std::env;

/// Default database name
pub const DEFAULT_DATABASE: &str = "parcelDB";

/// MongoDB connection configuration.
///
/// Custom `Debug` redacts the URI, which usually embeds the password.
#[derive(Clone)]
pub struct MongoConfig {
    /// Connection string (`mongodb://` or `mongodb+srv://`)
    pub uri: String,
    /// Database holding all collections
    pub database: String,
    /// Application name reported to the server
    pub app_name: String,
}

impl MongoConfig {
    /// Load configuration from environment variables.
    ///
    /// `MONGODB_URI` wins when set. Otherwise `DB_USER`, `DB_PASSWORD` and
    /// `DB_HOST` are combined into an SRV connection string. `DB_NAME`
    /// selects the database.
    pub fn from_env() -> Result<Self, DeliveryError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let uri = match env::var("MONGODB_URI") {
            Ok(uri) if !uri.trim().is_empty() => uri,
            _ => {
                let user = required_var("DB_USER")?;
                let password = required_var("DB_PASSWORD")?;
                let host = required_var("DB_HOST")?;
                srv_uri(&user, &password, &host)
            }
        };

        let database = env::var("DB_NAME").unwrap_or_else(|_| DEFAULT_DATABASE.to_string());

        Ok(Self::new(uri, database))
    }

    /// Create config with explicit values (for testing)
    pub fn new(uri: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            database: database.into(),
            app_name: "parcel-server".to_string(),
        }
    }
}

impl std::fmt::Debug for MongoConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MongoConfig")
            .field("uri", &"[REDACTED]")
            .field("database", &self.database)
            .field("app_name", &self.app_name)
            .finish()
    }
}

fn required_var(name: &str) -> Result<String, DeliveryError> {
    env::var(name).map_err(|_| {
        DeliveryError::Configuration(format!("{} not set (or set MONGODB_URI)", name))
    })
}

/// Build an SRV connection string from credentials
pub fn srv_uri(user: &str, password: &str, host: &str) -> String {
    format!(
        "mongodb+srv://{}:{}@{}/?retryWrites=true&w=majority",
        percent_encode(user),
        percent_encode(password),
        host
    )
}

/// Percent-encode the characters a URI userinfo section cannot carry
fn percent_encode(raw: &str) -> String {
    raw.bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                (b as char).to_string()
            }
            other => format!("%{:02X}", other),
        })
        .collect()
}
