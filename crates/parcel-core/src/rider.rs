//! # Rider Types
//!
//! Rider applications. Status moves through review via
//! `PATCH /riders/status/:id`.

use crate::error::{DeliveryError, DeliveryResult};
use crate::store::{Document, Query, ID_FIELD};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;

pub const STATUS_FIELD: &str = "status";

/// Review status of a rider application
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiderStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
    Deactivated,
}

impl RiderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiderStatus::Pending => "pending",
            RiderStatus::Approved => "approved",
            RiderStatus::Rejected => "rejected",
            RiderStatus::Deactivated => "deactivated",
        }
    }
}

impl FromStr for RiderStatus {
    type Err = DeliveryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(RiderStatus::Pending),
            "approved" => Ok(RiderStatus::Approved),
            "rejected" => Ok(RiderStatus::Rejected),
            "deactivated" => Ok(RiderStatus::Deactivated),
            other => Err(DeliveryError::Validation(format!(
                "Unknown rider status: {}",
                other
            ))),
        }
    }
}

/// A rider as stored
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rider {
    pub status: RiderStatus,

    #[serde(with = "crate::timestamp")]
    pub created_at: DateTime<Utc>,

    /// Freeform application metadata (name, region, bike, …)
    #[serde(flatten)]
    pub application: Document,
}

/// Body of `POST /riders`
#[derive(Debug, Clone, Deserialize)]
pub struct NewRider {
    #[serde(default)]
    pub status: Option<RiderStatus>,

    #[serde(flatten)]
    pub application: Document,
}

impl NewRider {
    pub fn into_rider(self, now: DateTime<Utc>) -> Rider {
        let mut application = self.application;
        application.remove(ID_FIELD);
        application.remove("created_at");

        Rider {
            status: self.status.unwrap_or_default(),
            created_at: now,
            application,
        }
    }
}

/// Body of `PATCH /riders/status/:id`
#[derive(Debug, Clone, Deserialize)]
pub struct RiderStatusChange {
    #[serde(default)]
    pub status: Option<RiderStatus>,
}

impl RiderStatusChange {
    pub fn into_patch(self) -> DeliveryResult<Document> {
        let status = self
            .status
            .ok_or_else(|| DeliveryError::missing_fields(&[STATUS_FIELD]))?;

        let mut patch = Document::new();
        patch.insert(
            STATUS_FIELD.to_string(),
            Value::String(status.as_str().to_string()),
        );
        Ok(patch)
    }
}

/// Riders with the given status (all riders when `None`)
pub fn status_query(status: Option<RiderStatus>) -> Query {
    Query::new().eq_opt(STATUS_FIELD, status.map(|s| s.as_str()))
}
