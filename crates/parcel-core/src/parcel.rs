//! # Parcel Types
//!
//! Shipments created by customers. Delivery metadata (sender, receiver,
//! weight, parcel type, …) is freeform and stored as sent.

use crate::error::{DeliveryError, DeliveryResult};
use crate::store::{Document, Query, ID_FIELD};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Field holding the creator's email
pub const OWNER_FIELD: &str = "created_by";
/// Field holding the creation timestamp
pub const CREATION_DATE_FIELD: &str = "creation_date";
/// Field holding the payment status
pub const PAYMENT_STATUS_FIELD: &str = "payment_status";

/// Whether a parcel's delivery fee has been paid.
///
/// The only transition is `Unpaid → Paid`, applied when a payment is recorded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Unpaid,
    Paid,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Unpaid => "unpaid",
            PaymentStatus::Paid => "paid",
        }
    }
}

/// A parcel as stored
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parcel {
    pub created_by: String,

    #[serde(with = "crate::timestamp")]
    pub creation_date: DateTime<Utc>,

    pub payment_status: PaymentStatus,

    /// Freeform delivery metadata
    #[serde(flatten)]
    pub details: Document,
}

/// Body of `POST /parcels`
#[derive(Debug, Clone, Deserialize)]
pub struct NewParcel {
    #[serde(default)]
    pub created_by: Option<String>,

    #[serde(default, with = "crate::timestamp::option")]
    pub creation_date: Option<DateTime<Utc>>,

    #[serde(flatten)]
    pub details: Document,
}

impl NewParcel {
    /// Build the stored parcel. Payment status always starts unpaid; a
    /// client-sent `payment_status` or `_id` is discarded.
    pub fn into_parcel(self, now: DateTime<Utc>) -> DeliveryResult<Parcel> {
        let created_by = match self.created_by {
            Some(email) if !email.trim().is_empty() => email,
            _ => return Err(DeliveryError::missing_fields(&[OWNER_FIELD])),
        };

        let mut details = self.details;
        details.remove(ID_FIELD);
        details.remove(PAYMENT_STATUS_FIELD);

        Ok(Parcel {
            created_by,
            creation_date: self.creation_date.unwrap_or(now),
            payment_status: PaymentStatus::Unpaid,
            details,
        })
    }
}

/// Parcels created by `email` (all parcels when `None`), newest first
pub fn owner_query(email: Option<&str>) -> Query {
    Query::new()
        .eq_opt(OWNER_FIELD, email)
        .newest_first(CREATION_DATE_FIELD)
}

/// Patch marking a parcel paid
pub fn mark_paid_patch() -> Document {
    let mut patch = Document::new();
    patch.insert(
        PAYMENT_STATUS_FIELD.to_string(),
        Value::String(PaymentStatus::Paid.as_str().to_string()),
    );
    patch
}
