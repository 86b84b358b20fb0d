//! # Firebase ID Token Verifier
//!
//! `TokenVerifier` for Firebase Authentication ID tokens. Tokens are RS256
//! JWTs signed with one of Google's rotating keys; the published key set is
//! cached until its `Cache-Control: max-age` runs out.

use crate::config::FirebaseConfig;
use async_trait::async_trait;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use parcel_core::{DeliveryError, DeliveryResult, Identity, TokenVerifier};
use reqwest::header::{HeaderMap, CACHE_CONTROL};
use reqwest::Client;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

/// Key set lifetime when the response carries no usable `max-age`
pub const DEFAULT_KEY_TTL: Duration = Duration::from_secs(60 * 60);

const INVALID_TOKEN: &str = "Invalid or expired token";

/// Claims read from a verified ID token
#[derive(Debug, Deserialize)]
struct FirebaseClaims {
    sub: String,
    #[serde(default)]
    email: Option<String>,
}

struct CachedKeys {
    keys: JwkSet,
    expires_at: Instant,
}

/// Verifies Firebase ID tokens against Google's published keys
pub struct FirebaseTokenVerifier {
    config: FirebaseConfig,
    client: Client,
    validation: Validation,
    keys: RwLock<Option<CachedKeys>>,
}

impl FirebaseTokenVerifier {
    /// Create a new verifier
    pub fn new(config: FirebaseConfig) -> DeliveryResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| {
                DeliveryError::Configuration(format!("Failed to create HTTP client: {}", e))
            })?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[config.project_id.as_str()]);
        validation.set_issuer(&[config.issuer()]);
        validation.set_required_spec_claims(&["exp", "sub", "aud", "iss"]);

        Ok(Self {
            config,
            client,
            validation,
            keys: RwLock::new(None),
        })
    }

    /// Create from environment variables
    pub fn from_env() -> DeliveryResult<Self> {
        let config = FirebaseConfig::from_env()?;
        Self::new(config)
    }

    /// Decoding key for `kid`, refreshing the cached key set when stale
    async fn decoding_key(&self, kid: &str) -> DeliveryResult<DecodingKey> {
        {
            let cached = self.keys.read().await;
            if let Some(cached) = cached.as_ref().filter(|c| c.expires_at > Instant::now()) {
                return key_from_set(&cached.keys, kid);
            }
        }

        let mut cached = self.keys.write().await;
        // Another request may have refreshed while we waited for the lock
        if let Some(fresh) = cached.as_ref().filter(|c| c.expires_at > Instant::now()) {
            return key_from_set(&fresh.keys, kid);
        }

        let fetched = self.fetch_keys().await?;
        let key = key_from_set(&fetched.keys, kid);
        *cached = Some(fetched);
        key
    }

    #[instrument(skip(self), fields(url = %self.config.jwks_url))]
    async fn fetch_keys(&self) -> DeliveryResult<CachedKeys> {
        let response = self
            .client
            .get(&self.config.jwks_url)
            .send()
            .await
            .map_err(|e| DeliveryError::IdentityProvider(format!("Key fetch failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DeliveryError::IdentityProvider(format!(
                "Key fetch returned HTTP {}",
                status
            )));
        }

        let ttl = max_age(response.headers()).unwrap_or(DEFAULT_KEY_TTL);
        let keys: JwkSet = response
            .json()
            .await
            .map_err(|e| DeliveryError::IdentityProvider(format!("Malformed key set: {}", e)))?;

        info!(
            "Fetched {} Firebase signing keys (valid for {}s)",
            keys.keys.len(),
            ttl.as_secs()
        );

        Ok(CachedKeys {
            keys,
            expires_at: expiry(ttl),
        })
    }
}

#[async_trait]
impl TokenVerifier for FirebaseTokenVerifier {
    #[instrument(skip(self, token))]
    async fn verify(&self, token: &str) -> DeliveryResult<Identity> {
        let header = decode_header(token).map_err(|e| rejected(e.to_string()))?;

        if header.alg != Algorithm::RS256 {
            return Err(rejected(format!("unexpected algorithm {:?}", header.alg)));
        }
        let kid = header
            .kid
            .ok_or_else(|| rejected("token header has no kid".to_string()))?;

        let key = self.decoding_key(&kid).await?;
        let data = decode::<FirebaseClaims>(token, &key, &self.validation)
            .map_err(|e| rejected(e.to_string()))?;

        if data.claims.sub.trim().is_empty() {
            return Err(rejected("empty subject".to_string()));
        }

        debug!("Verified Firebase token for uid={}", data.claims.sub);
        Ok(Identity::new(data.claims.sub, data.claims.email))
    }

    fn provider_name(&self) -> &'static str {
        "firebase"
    }
}

fn key_from_set(keys: &JwkSet, kid: &str) -> DeliveryResult<DecodingKey> {
    let jwk = keys
        .find(kid)
        .ok_or_else(|| rejected(format!("unknown signing key {}", kid)))?;

    DecodingKey::from_jwk(jwk)
        .map_err(|e| DeliveryError::IdentityProvider(format!("Unusable signing key {}: {}", kid, e)))
}

/// Log the reason, hand the client a uniform 403
fn rejected(reason: String) -> DeliveryError {
    warn!("Rejected ID token: {}", reason);
    DeliveryError::Forbidden(INVALID_TOKEN.to_string())
}

/// `max-age` directive of a `Cache-Control` header
pub fn max_age(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get_all(CACHE_CONTROL)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .filter_map(|directive| directive.trim().strip_prefix("max-age="))
        .find_map(|secs| secs.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// When a key set fetched now should be dropped.
///
/// A lifetime too long to represent falls back to [`DEFAULT_KEY_TTL`].
fn expiry(ttl: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(ttl)
        .or_else(|| now.checked_add(DEFAULT_KEY_TTL))
        .unwrap_or(now)
}
