//! # Document Store Trait
//!
//! Storage boundary for the delivery backend. Documents cross it as JSON
//! objects; each backend translates to its own representation.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   DocumentStore (trait)                     │
//! │  ├── insert_one()      ├── update_by_id()                   │
//! │  ├── find()            ├── delete_by_id()                   │
//! │  ├── find_by_id()      └── ping()                           │
//! └─────────────────────────────────────────────────────────────┘
//!                            ▲
//!              ┌─────────────┴─────────────┐
//!      ┌───────┴───────┐           ┌───────┴───────┐
//!      │  MongoStore   │           │  MemoryStore  │
//!      │ (parcel-mongo)│           │ (tests / dev) │
//!      └───────────────┘           └───────────────┘
//! ```

use crate::error::{DeliveryError, DeliveryResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// A stored document
pub type Document = serde_json::Map<String, Value>;

/// Field holding the document identifier
pub const ID_FIELD: &str = "_id";

/// Collections known to the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Users,
    Parcels,
    Riders,
    Transactions,
    TrackingEvents,
}

impl Collection {
    /// Name of the collection in the database
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Users => "users",
            Collection::Parcels => "parcels",
            Collection::Riders => "riders",
            Collection::Transactions => "transactions",
            Collection::TrackingEvents => "tracking_events",
        }
    }

    /// Human name used in not-found messages
    pub fn resource_name(&self) -> &'static str {
        match self {
            Collection::Users => "User",
            Collection::Parcels => "Parcel",
            Collection::Riders => "Rider",
            Collection::Transactions => "Transaction",
            Collection::TrackingEvents => "Tracking event",
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque document identifier: 24 hex characters (ObjectId form)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentId(String);

impl DocumentId {
    /// Parse a client-supplied id. Returns `None` for anything that is not
    /// 24 hex characters.
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.len() == 24 && raw.bytes().all(|b| b.is_ascii_hexdigit()) {
            Some(Self(raw.to_ascii_lowercase()))
        } else {
            None
        }
    }

    /// Parse or fail with the collection's not-found error
    pub fn parse_in(collection: Collection, raw: &str) -> DeliveryResult<Self> {
        Self::parse(raw).ok_or_else(|| DeliveryError::not_found(collection.resource_name(), raw))
    }

    /// Generate a new id: seconds since the epoch followed by random bits,
    /// so ids sort roughly by creation time like ObjectIds do.
    pub fn generate() -> Self {
        let secs = chrono::Utc::now().timestamp() as u32;
        let random = uuid::Uuid::new_v4().simple().to_string();
        Self(format!("{:08x}{}", secs, &random[..16]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Sort direction for a single field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// Single-field sort order
#[derive(Debug, Clone, PartialEq)]
pub struct SortBy {
    pub field: String,
    pub direction: SortDirection,
}

/// Equality filter plus optional sort
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filter: Document,
    pub sort: Option<SortBy>,
}

impl Query {
    /// Query matching every document
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `field == value`
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter.insert(field.into(), value.into());
        self
    }

    /// Require `field == value` only when a value is given
    pub fn eq_opt(self, field: impl Into<String>, value: Option<impl Into<Value>>) -> Self {
        match value {
            Some(value) => self.eq(field, value),
            None => self,
        }
    }

    /// Sort by `field`
    pub fn sort(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.sort = Some(SortBy {
            field: field.into(),
            direction,
        });
        self
    }

    /// Sort by `field`, largest first
    pub fn newest_first(self, field: impl Into<String>) -> Self {
        self.sort(field, SortDirection::Descending)
    }

    /// Check the equality filter against a document
    pub fn matches(&self, document: &Document) -> bool {
        self.filter
            .iter()
            .all(|(field, expected)| document.get(field) == Some(expected))
    }
}

/// Result of an insert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertOutcome {
    pub acknowledged: bool,
    pub inserted_id: String,
}

impl InsertOutcome {
    pub fn new(inserted_id: impl Into<String>) -> Self {
        Self {
            acknowledged: true,
            inserted_id: inserted_id.into(),
        }
    }
}

/// Result of an update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOutcome {
    pub acknowledged: bool,
    pub matched_count: u64,
    pub modified_count: u64,
}

impl UpdateOutcome {
    pub fn new(matched_count: u64, modified_count: u64) -> Self {
        Self {
            acknowledged: true,
            matched_count,
            modified_count,
        }
    }
}

/// Result of a delete
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteOutcome {
    pub acknowledged: bool,
    pub deleted_count: u64,
}

impl DeleteOutcome {
    pub fn new(deleted_count: u64) -> Self {
        Self {
            acknowledged: true,
            deleted_count,
        }
    }
}

/// Storage backend for all collections.
///
/// Lookups by id fail with [`DeliveryError::NotFound`] when the id is
/// malformed or matches nothing; updates and deletes behave the same way.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert a document. Any `_id` in the document is replaced by a fresh one.
    async fn insert_one(
        &self,
        collection: Collection,
        document: Document,
    ) -> DeliveryResult<InsertOutcome>;

    /// Find all documents matching the query, in the query's sort order
    async fn find(&self, collection: Collection, query: &Query) -> DeliveryResult<Vec<Document>>;

    /// Fetch one document by id
    async fn find_by_id(&self, collection: Collection, id: &str) -> DeliveryResult<Document>;

    /// Set the given fields on one document
    async fn update_by_id(
        &self,
        collection: Collection,
        id: &str,
        patch: Document,
    ) -> DeliveryResult<UpdateOutcome>;

    /// Delete one document by id
    async fn delete_by_id(&self, collection: Collection, id: &str)
        -> DeliveryResult<DeleteOutcome>;

    /// Check the backend is reachable
    async fn ping(&self) -> DeliveryResult<()>;

    /// Backend name (for logging and health output)
    fn backend_name(&self) -> &'static str;
}

/// Type alias for a shared store (dynamic dispatch)
pub type BoxedDocumentStore = Arc<dyn DocumentStore>;

/// Serialize a typed model into a document
pub fn to_document<T: Serialize>(value: &T) -> DeliveryResult<Document> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(DeliveryError::Serialization(format!(
            "expected a JSON object, got {}",
            other
        ))),
    }
}

/// The id of a stored document, if present
pub fn document_id(document: &Document) -> Option<&str> {
    document.get(ID_FIELD).and_then(Value::as_str)
}
