//! # User Types
//!
//! Users are keyed by email. Signing in either creates the user or refreshes
//! `last_login`; there is no delete path.

use crate::error::{DeliveryError, DeliveryResult};
use crate::store::{Document, Query, ID_FIELD};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const EMAIL_FIELD: &str = "email";
pub const LAST_LOGIN_FIELD: &str = "last_login";

/// A user as stored
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub email: String,

    #[serde(with = "crate::timestamp")]
    pub last_login: DateTime<Utc>,

    #[serde(with = "crate::timestamp")]
    pub created_at: DateTime<Utc>,

    /// Freeform profile fields (name, photo, role, …)
    #[serde(flatten)]
    pub profile: Document,
}

/// Body of `POST /users`
#[derive(Debug, Clone, Deserialize)]
pub struct UserLogin {
    #[serde(default)]
    pub email: Option<String>,

    #[serde(default, with = "crate::timestamp::option")]
    pub last_login: Option<DateTime<Utc>>,

    #[serde(flatten)]
    pub profile: Document,
}

impl UserLogin {
    /// The email this login is for
    pub fn email(&self) -> DeliveryResult<&str> {
        match self.email.as_deref() {
            Some(email) if !email.trim().is_empty() => Ok(email),
            _ => Err(DeliveryError::missing_fields(&[EMAIL_FIELD])),
        }
    }

    /// Login time, defaulting to `now`
    pub fn login_time(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.last_login.unwrap_or(now)
    }

    /// Build a new user record
    pub fn into_user(self, now: DateTime<Utc>) -> DeliveryResult<User> {
        let email = self.email()?.to_string();
        let last_login = self.login_time(now);

        let mut profile = self.profile;
        profile.remove(ID_FIELD);
        profile.remove("created_at");

        Ok(User {
            email,
            last_login,
            created_at: now,
            profile,
        })
    }
}

/// Users with the given email
pub fn email_query(email: &str) -> Query {
    Query::new().eq(EMAIL_FIELD, email)
}

/// Patch refreshing `last_login`
pub fn last_login_patch(at: DateTime<Utc>) -> Document {
    let mut patch = Document::new();
    patch.insert(
        LAST_LOGIN_FIELD.to_string(),
        Value::String(crate::timestamp::format(&at)),
    );
    patch
}
