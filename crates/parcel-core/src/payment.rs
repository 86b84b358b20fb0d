//! # Payment Transactions
//!
//! A transaction records a completed client-side payment against a parcel.
//! Transactions are immutable once stored.

use crate::error::{DeliveryError, DeliveryResult};
use crate::required::RequiredFields;
use crate::store::Query;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

pub const TRANSACTION_ID_FIELD: &str = "transactionId";
pub const PAYER_FIELD: &str = "email";
pub const PARCEL_ID_FIELD: &str = "parcelId";
pub const CREATED_AT_FIELD: &str = "createdAt";

/// A transaction as stored
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// Gateway payment reference
    pub transaction_id: String,
    /// Amount exactly as the client sent it
    pub amount: Number,
    pub email: String,
    pub parcel_id: String,
    pub payment_method: Value,

    #[serde(with = "crate::timestamp")]
    pub created_at: DateTime<Utc>,
}

/// Body of `POST /payments`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecord {
    #[serde(default)]
    pub transaction_id: Option<String>,
    #[serde(default)]
    pub amount: Option<Number>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub parcel_id: Option<String>,
    /// Usually the gateway's list of method types, e.g. `["card"]`
    #[serde(default)]
    pub payment_method: Option<Value>,
}

impl PaymentRecord {
    pub fn into_transaction(self, now: DateTime<Utc>) -> DeliveryResult<Transaction> {
        let mut required = RequiredFields::new();
        let transaction_id = required.text(TRANSACTION_ID_FIELD, self.transaction_id);
        let amount = required.number("amount", self.amount);
        let email = required.text(PAYER_FIELD, self.email);
        let parcel_id = required.text(PARCEL_ID_FIELD, self.parcel_id);
        let payment_method = required.value("paymentMethod", self.payment_method);
        required.check()?;

        if !amount.as_f64().is_some_and(|value| value.is_finite() && value > 0.0) {
            return Err(DeliveryError::Validation(
                "amount must be a positive number".to_string(),
            ));
        }

        Ok(Transaction {
            transaction_id,
            amount,
            email,
            parcel_id,
            payment_method,
            created_at: now,
        })
    }
}

/// Transactions carrying the given gateway reference
pub fn transaction_id_query(transaction_id: &str) -> Query {
    Query::new().eq(TRANSACTION_ID_FIELD, transaction_id)
}

/// Transactions paid by `email` (all when `None`), newest first
pub fn payer_query(email: Option<&str>) -> Query {
    Query::new()
        .eq_opt(PAYER_FIELD, email)
        .newest_first(CREATED_AT_FIELD)
}
