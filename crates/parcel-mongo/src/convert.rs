//! JSON ↔ BSON conversion at the store boundary.
//!
//! ObjectIds leave the database as 24-char hex strings and BSON dates as
//! RFC 3339 strings, which is how clients have always seen them.

use mongodb::bson::{self, oid::ObjectId, Bson, Document as BsonDocument};
use parcel_core::{
    Collection, DeliveryError, DeliveryResult, Document, DocumentId, Query, SortDirection,
};
use serde_json::Value;

/// Convert a stored BSON value into plain JSON
pub fn bson_to_json(value: Bson) -> Value {
    match value {
        Bson::ObjectId(oid) => Value::String(oid.to_hex()),
        Bson::DateTime(dt) => dt
            .try_to_rfc3339_string()
            .map(Value::String)
            .unwrap_or_else(|_| Value::from(dt.timestamp_millis())),
        Bson::Document(doc) => Value::Object(document_to_json(doc)),
        Bson::Array(items) => Value::Array(items.into_iter().map(bson_to_json).collect()),
        Bson::Int32(n) => Value::from(n),
        Bson::Int64(n) => Value::from(n),
        other => other.into_relaxed_extjson(),
    }
}

/// Convert a stored BSON document into a JSON document
pub fn document_to_json(document: BsonDocument) -> Document {
    document
        .into_iter()
        .map(|(key, value)| (key, bson_to_json(value)))
        .collect()
}

/// Convert a JSON document into BSON for writing
pub fn json_to_document(document: &Document) -> DeliveryResult<BsonDocument> {
    bson::to_document(document).map_err(|e| DeliveryError::Serialization(e.to_string()))
}

/// Parse a client id into an ObjectId, or fail with the collection's 404
pub fn object_id(collection: Collection, id: &str) -> DeliveryResult<ObjectId> {
    let parsed = DocumentId::parse_in(collection, id)?;
    ObjectId::parse_str(parsed.as_str())
        .map_err(|_| DeliveryError::not_found(collection.resource_name(), id))
}

/// Equality filter for a query
pub fn filter_document(query: &Query) -> DeliveryResult<BsonDocument> {
    json_to_document(&query.filter)
}

/// Sort specification for a query, if it has one
pub fn sort_document(query: &Query) -> Option<BsonDocument> {
    query.sort.as_ref().map(|sort| {
        let direction: i32 = match sort.direction {
            SortDirection::Ascending => 1,
            SortDirection::Descending => -1,
        };
        let mut spec = BsonDocument::new();
        spec.insert(sort.field.clone(), direction);
        spec
    })
}
