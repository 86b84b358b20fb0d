//! # Tracking Events
//!
//! Append-only delivery history. Events are grouped by `trackingId` and
//! never updated or deleted.

use crate::error::DeliveryResult;
use crate::required::RequiredFields;
use crate::store::Query;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const TRACKING_ID_FIELD: &str = "trackingId";
pub const TIMESTAMP_FIELD: &str = "timestamp";

/// One status update in a shipment's history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingEvent {
    #[serde(rename = "trackingId")]
    pub tracking_id: String,
    pub status: String,
    pub message: String,
    pub location: String,
    pub updated_by: String,

    #[serde(with = "crate::timestamp")]
    pub timestamp: DateTime<Utc>,
}

/// Body of `POST /tracking`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrackingUpdate {
    #[serde(rename = "trackingId", default)]
    pub tracking_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub updated_by: Option<String>,
}

impl TrackingUpdate {
    /// Validate all five fields and stamp the event
    pub fn into_event(self, now: DateTime<Utc>) -> DeliveryResult<TrackingEvent> {
        let mut required = RequiredFields::new();
        let tracking_id = required.text(TRACKING_ID_FIELD, self.tracking_id);
        let status = required.text("status", self.status);
        let message = required.text("message", self.message);
        let location = required.text("location", self.location);
        let updated_by = required.text("updated_by", self.updated_by);
        required.check()?;

        Ok(TrackingEvent {
            tracking_id,
            status,
            message,
            location,
            updated_by,
            timestamp: now,
        })
    }
}

/// History for one tracking id, newest first
pub fn history_query(tracking_id: &str) -> Query {
    Query::new()
        .eq(TRACKING_ID_FIELD, tracking_id)
        .newest_first(TIMESTAMP_FIELD)
}
