//! # Caller Identity
//!
//! Bearer credentials are verified by an external identity provider behind
//! the [`TokenVerifier`] trait. A verified caller is an [`Identity`].

use crate::error::{DeliveryError, DeliveryResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Authenticated caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Provider user id
    pub uid: String,
    /// Verified email, when the provider supplies one
    pub email: Option<String>,
}

impl Identity {
    pub fn new(uid: impl Into<String>, email: Option<String>) -> Self {
        Self {
            uid: uid.into(),
            email,
        }
    }

    /// True when the caller's email is exactly `email`
    pub fn owns_email(&self, email: &str) -> bool {
        self.email.as_deref() == Some(email)
    }
}

/// Verifies bearer tokens against an identity provider.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    /// Verify a raw token. Rejected tokens fail with
    /// [`DeliveryError::Forbidden`].
    async fn verify(&self, token: &str) -> DeliveryResult<Identity>;

    /// Provider name (for logging)
    fn provider_name(&self) -> &'static str;
}

/// Type alias for a shared verifier (dynamic dispatch)
pub type BoxedTokenVerifier = Arc<dyn TokenVerifier>;

/// Pull the token out of an `Authorization: Bearer <token>` header value.
///
/// Absent or malformed headers fail with [`DeliveryError::Unauthorized`].
pub fn bearer_token(header: Option<&str>) -> DeliveryResult<&str> {
    let value = header
        .ok_or_else(|| DeliveryError::Unauthorized("Missing authorization header".to_string()))?;

    let (scheme, token) = value.split_once(' ').ok_or_else(|| {
        DeliveryError::Unauthorized("Authorization header must use Bearer scheme".to_string())
    })?;

    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(DeliveryError::Unauthorized(
            "Authorization header must use Bearer scheme".to_string(),
        ));
    }

    let token = token.trim();
    if token.is_empty() {
        return Err(DeliveryError::Unauthorized(
            "Missing bearer token".to_string(),
        ));
    }

    Ok(token)
}

/// Verifier with a fixed token table. Backs tests and local runs.
#[derive(Debug, Clone, Default)]
pub struct StaticTokenVerifier {
    tokens: HashMap<String, Identity>,
}

impl StaticTokenVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register with builder pattern
    pub fn with_token(mut self, token: impl Into<String>, identity: Identity) -> Self {
        self.tokens.insert(token.into(), identity);
        self
    }
}

#[async_trait]
impl TokenVerifier for StaticTokenVerifier {
    async fn verify(&self, token: &str) -> DeliveryResult<Identity> {
        self.tokens
            .get(token)
            .cloned()
            .ok_or_else(|| DeliveryError::Forbidden("Invalid or expired token".to_string()))
    }

    fn provider_name(&self) -> &'static str {
        "static"
    }
}
