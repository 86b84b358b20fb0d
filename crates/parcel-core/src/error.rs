//! # Delivery Error Types
//!
//! Typed error handling for the parcel delivery backend.
//! Every adapter and handler operation returns `Result<T, DeliveryError>`.

use thiserror::Error;

/// Message sent to clients in place of internal failure details
pub const GENERIC_SERVER_ERROR: &str = "Server error";

/// Core error type for all delivery operations
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// Missing or malformed required field
    #[error("{0}")]
    Validation(String),

    /// Missing or malformed credential
    #[error("{0}")]
    Unauthorized(String),

    /// Credential rejected or identity mismatch
    #[error("{0}")]
    Forbidden(String),

    /// No document matched the lookup
    #[error("{resource} not found: {id}")]
    NotFound { resource: String, id: String },

    /// Document store failure
    #[error("Database error: {0}")]
    Database(String),

    /// Payment gateway rejected or failed the request
    #[error("{message}")]
    Gateway { provider: String, message: String },

    /// Identity provider could not be reached or answered garbage
    #[error("Identity provider error: {0}")]
    IdentityProvider(String),

    /// Configuration errors (missing keys, invalid config)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal error (should not happen)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DeliveryError {
    /// Shorthand for a not-found error on a named resource
    pub fn not_found(resource: impl Into<String>, id: impl Into<String>) -> Self {
        DeliveryError::NotFound {
            resource: resource.into(),
            id: id.into(),
        }
    }

    /// Validation error listing the required fields that were absent
    pub fn missing_fields(fields: &[&str]) -> Self {
        DeliveryError::Validation(format!("Missing required field(s): {}", fields.join(", ")))
    }

    /// Returns the HTTP status code appropriate for this error
    pub fn status_code(&self) -> u16 {
        match self {
            DeliveryError::Validation(_) => 400,
            DeliveryError::Unauthorized(_) => 401,
            DeliveryError::Forbidden(_) => 403,
            DeliveryError::NotFound { .. } => 404,
            DeliveryError::Database(_) => 500,
            DeliveryError::Gateway { .. } => 500,
            DeliveryError::IdentityProvider(_) => 500,
            DeliveryError::Configuration(_) => 500,
            DeliveryError::Serialization(_) => 500,
            DeliveryError::Internal(_) => 500,
        }
    }

    /// Returns true for failures the client did not cause
    pub fn is_server_error(&self) -> bool {
        self.status_code() >= 500
    }

    /// Message safe to hand back to the client.
    ///
    /// Gateway messages pass through verbatim; other server-side failures
    /// collapse to a generic message.
    pub fn public_message(&self) -> String {
        match self {
            DeliveryError::Gateway { message, .. } => message.clone(),
            err if err.is_server_error() => GENERIC_SERVER_ERROR.to_string(),
            err => err.to_string(),
        }
    }
}

impl From<serde_json::Error> for DeliveryError {
    fn from(err: serde_json::Error) -> Self {
        DeliveryError::Serialization(err.to_string())
    }
}

/// Result type alias for delivery operations
pub type DeliveryResult<T> = Result<T, DeliveryError>;
