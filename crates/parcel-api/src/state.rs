//! # Application State
//!
//! Shared state for the Axum application.
//! Contains the document store, token verifier, payment gateway and the
//! authorization policy, all built once at startup.

use anyhow::Context;
use parcel_core::{
    AuthPolicy, BoxedDocumentStore, BoxedPaymentGateway, BoxedTokenVerifier, MemoryStore,
    PolicyPreset,
};
use parcel_firebase::FirebaseTokenVerifier;
use parcel_mongo::MongoStore;
use parcel_stripe::StripePaymentIntents;
use std::str::FromStr;
use std::sync::Arc;

/// Where documents are kept
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DatabaseBackend {
    #[default]
    Mongo,
    /// Process-local store for local runs; data is lost on exit
    Memory,
}

impl FromStr for DatabaseBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mongo" | "mongodb" => Ok(DatabaseBackend::Mongo),
            "memory" => Ok(DatabaseBackend::Memory),
            other => anyhow::bail!("unknown DATABASE_BACKEND '{}' (expected mongo or memory)", other),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Environment (development, staging, production)
    pub environment: String,
    /// Storage backend
    pub database_backend: DatabaseBackend,
    /// Allowed CORS origins; `*` allows any
    pub cors_origins: Vec<String>,
    /// Explicit auth policy file
    pub auth_policy_file: Option<String>,
    /// Preset overriding the policy file's
    pub auth_mode: Option<PolicyPreset>,
}

impl AppConfig {
    /// Load from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();
        let non_empty = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());

        let port = match non_empty("PORT") {
            Some(port) => port
                .trim()
                .parse()
                .with_context(|| format!("PORT must be a port number, got '{}'", port))?,
            None => defaults.port,
        };

        let database_backend = match non_empty("DATABASE_BACKEND") {
            Some(backend) => backend.parse()?,
            None => defaults.database_backend,
        };

        let auth_mode = non_empty("AUTH_MODE")
            .map(|mode| mode.parse::<PolicyPreset>())
            .transpose()?;

        Ok(Self {
            host: non_empty("HOST").unwrap_or(defaults.host),
            port,
            environment: non_empty("ENVIRONMENT").unwrap_or(defaults.environment),
            database_backend,
            cors_origins: non_empty("CORS_ORIGINS")
                .map(|origins| parse_origins(&origins))
                .unwrap_or(defaults.cors_origins),
            auth_policy_file: non_empty("AUTH_POLICY_FILE"),
            auth_mode,
        })
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> anyhow::Result<std::net::SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid bind address {}:{}", self.host, self.port))
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// True when every origin is allowed
    pub fn allows_any_origin(&self) -> bool {
        self.cors_origins.is_empty() || self.cors_origins.iter().any(|o| o == "*")
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            environment: "development".to_string(),
            database_backend: DatabaseBackend::Mongo,
            cors_origins: vec!["*".to_string()],
            auth_policy_file: None,
            auth_mode: None,
        }
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|origin| origin.trim().trim_end_matches('/').to_string())
        .filter(|origin| !origin.is_empty())
        .collect()
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Document store (MongoDB or in-memory)
    pub store: BoxedDocumentStore,
    /// Bearer token verifier
    pub verifier: BoxedTokenVerifier,
    /// Payment gateway
    pub payments: BoxedPaymentGateway,
    /// Per-endpoint authorization gates
    pub policy: Arc<AuthPolicy>,
    /// Application config
    pub config: AppConfig,
}

impl AppState {
    /// Build state from the environment, connecting to every external service
    pub async fn new() -> anyhow::Result<Self> {
        let config = AppConfig::from_env()?;

        let policy = load_auth_policy(config.auth_policy_file.as_deref(), config.auth_mode)?;

        let store: BoxedDocumentStore = match config.database_backend {
            DatabaseBackend::Mongo => Arc::new(
                MongoStore::from_env()
                    .await
                    .map_err(|e| anyhow::anyhow!("Failed to connect to MongoDB: {}", e))?,
            ),
            DatabaseBackend::Memory => {
                tracing::warn!("Using in-memory store; data will not survive a restart");
                Arc::new(MemoryStore::new())
            }
        };

        let payments = StripePaymentIntents::from_env()
            .map_err(|e| anyhow::anyhow!("Failed to initialize Stripe: {}", e))?;

        let verifier = FirebaseTokenVerifier::from_env()
            .map_err(|e| anyhow::anyhow!("Failed to initialize Firebase: {}", e))?;

        Ok(Self::with_components(
            store,
            Arc::new(verifier),
            Arc::new(payments),
            policy,
            config,
        ))
    }

    /// Assemble state from ready-made components
    pub fn with_components(
        store: BoxedDocumentStore,
        verifier: BoxedTokenVerifier,
        payments: BoxedPaymentGateway,
        policy: AuthPolicy,
        config: AppConfig,
    ) -> Self {
        Self {
            store,
            verifier,
            payments,
            policy: Arc::new(policy),
            config,
        }
    }
}

/// Load the auth policy from `explicit_path`, else `config/auth.toml`.
///
/// An explicit path that cannot be read is fatal. With no file at all the
/// policy is the `mode` preset, or legacy.
pub fn load_auth_policy(
    explicit_path: Option<&str>,
    mode: Option<PolicyPreset>,
) -> anyhow::Result<AuthPolicy> {
    if let Some(path) = explicit_path {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read auth policy {}", path))?;
        return parse_policy(path, &content, mode);
    }

    // Try to load from config/auth.toml
    let config_paths = [
        "config/auth.toml",
        "../config/auth.toml",
        "../../config/auth.toml",
    ];

    for path in config_paths {
        if let Ok(content) = std::fs::read_to_string(path) {
            return parse_policy(path, &content, mode);
        }
    }

    let policy = AuthPolicy::preset(mode.unwrap_or_default());
    tracing::warn!(
        "No auth policy file found, using {:?} preset ({} gated endpoints)",
        policy.base_preset(),
        policy.gated_count()
    );
    Ok(policy)
}

fn parse_policy(path: &str, content: &str, mode: Option<PolicyPreset>) -> anyhow::Result<AuthPolicy> {
    let policy = AuthPolicy::from_toml_with_preset(content, mode)
        .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", path, e))?;
    tracing::info!(
        "Loaded auth policy from {} ({:?} preset, {} gated endpoints)",
        path,
        policy.base_preset(),
        policy.gated_count()
    );
    Ok(policy)
}
