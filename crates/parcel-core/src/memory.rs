//! # In-Memory Document Store
//!
//! `DocumentStore` backed by process memory. Used by tests and by
//! `DATABASE_BACKEND=memory` for local runs without a database.

use crate::error::{DeliveryError, DeliveryResult};
use crate::store::{
    document_id, Collection, DeleteOutcome, Document, DocumentId, DocumentStore, InsertOutcome,
    Query, SortDirection, UpdateOutcome, ID_FIELD,
};
use async_trait::async_trait;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Store keeping every collection in a `Vec` in insertion order
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<Collection, Vec<Document>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents in a collection
    pub fn len(&self, collection: Collection) -> usize {
        self.read()
            .map(|guard| guard.get(&collection).map_or(0, Vec::len))
            .unwrap_or(0)
    }

    fn read(&self) -> DeliveryResult<RwLockReadGuard<'_, HashMap<Collection, Vec<Document>>>> {
        self.collections
            .read()
            .map_err(|_| DeliveryError::Internal("memory store lock poisoned".to_string()))
    }

    fn write(&self) -> DeliveryResult<RwLockWriteGuard<'_, HashMap<Collection, Vec<Document>>>> {
        self.collections
            .write()
            .map_err(|_| DeliveryError::Internal("memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn insert_one(
        &self,
        collection: Collection,
        mut document: Document,
    ) -> DeliveryResult<InsertOutcome> {
        let id = DocumentId::generate();
        document.insert(ID_FIELD.to_string(), Value::String(id.to_string()));

        self.write()?.entry(collection).or_default().push(document);

        Ok(InsertOutcome::new(id.to_string()))
    }

    async fn find(&self, collection: Collection, query: &Query) -> DeliveryResult<Vec<Document>> {
        let mut found: Vec<Document> = self
            .read()?
            .get(&collection)
            .map(|docs| docs.iter().filter(|doc| query.matches(doc)).cloned().collect())
            .unwrap_or_default();

        if let Some(sort) = &query.sort {
            found.sort_by(|a, b| compare_values(a.get(&sort.field), b.get(&sort.field)));
            // Reversing a stable ascending sort leaves equal keys newest first.
            if sort.direction == SortDirection::Descending {
                found.reverse();
            }
        }

        Ok(found)
    }

    async fn find_by_id(&self, collection: Collection, id: &str) -> DeliveryResult<Document> {
        let doc_id = DocumentId::parse_in(collection, id)?;

        self.read()?
            .get(&collection)
            .and_then(|docs| {
                docs.iter()
                    .find(|doc| document_id(doc) == Some(doc_id.as_str()))
                    .cloned()
            })
            .ok_or_else(|| DeliveryError::not_found(collection.resource_name(), id))
    }

    async fn update_by_id(
        &self,
        collection: Collection,
        id: &str,
        patch: Document,
    ) -> DeliveryResult<UpdateOutcome> {
        let doc_id = DocumentId::parse_in(collection, id)?;

        let mut guard = self.write()?;
        let document = guard
            .get_mut(&collection)
            .and_then(|docs| {
                docs.iter_mut()
                    .find(|doc| document_id(doc) == Some(doc_id.as_str()))
            })
            .ok_or_else(|| DeliveryError::not_found(collection.resource_name(), id))?;

        let mut modified = false;
        for (field, value) in patch {
            if field == ID_FIELD {
                continue;
            }
            if document.get(&field) != Some(&value) {
                document.insert(field, value);
                modified = true;
            }
        }

        Ok(UpdateOutcome::new(1, u64::from(modified)))
    }

    async fn delete_by_id(
        &self,
        collection: Collection,
        id: &str,
    ) -> DeliveryResult<DeleteOutcome> {
        let doc_id = DocumentId::parse_in(collection, id)?;

        let mut guard = self.write()?;
        let docs = guard.entry(collection).or_default();
        let position = docs
            .iter()
            .position(|doc| document_id(doc) == Some(doc_id.as_str()))
            .ok_or_else(|| DeliveryError::not_found(collection.resource_name(), id))?;
        docs.remove(position);

        Ok(DeleteOutcome::new(1))
    }

    async fn ping(&self) -> DeliveryResult<()> {
        self.read().map(|_| ())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

/// Cross-type ordering: missing < null < bool < number < string < everything else
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(value: Option<&Value>) -> u8 {
        match value {
            None => 0,
            Some(Value::Null) => 1,
            Some(Value::Bool(_)) => 2,
            Some(Value::Number(_)) => 3,
            Some(Value::String(_)) => 4,
            Some(Value::Array(_)) => 5,
            Some(Value::Object(_)) => 6,
        }
    }

    match (a, b) {
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let x = x.as_f64().unwrap_or(0.0);
            let y = y.as_f64().unwrap_or(0.0);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_insert_assigns_fresh_id() {
        let store = MemoryStore::new();
        let outcome = store
            .insert_one(
                Collection::Parcels,
                doc(json!({"_id": "client-chosen", "created_by": "a@example.com"})),
            )
            .await
            .unwrap();

        assert!(outcome.acknowledged);
        assert!(DocumentId::parse(&outcome.inserted_id).is_some());

        let stored = store
            .find_by_id(Collection::Parcels, &outcome.inserted_id)
            .await
            .unwrap();
        assert_eq!(stored["_id"], json!(outcome.inserted_id));
        assert_eq!(stored["created_by"], json!("a@example.com"));
    }

    #[tokio::test]
    async fn test_find_filters_and_sorts_descending() {
        let store = MemoryStore::new();
        for (owner, date) in [
            ("a@example.com", "2025-07-01T00:00:00.000Z"),
            ("b@example.com", "2025-07-02T00:00:00.000Z"),
            ("a@example.com", "2025-07-03T00:00:00.000Z"),
        ] {
            store
                .insert_one(
                    Collection::Parcels,
                    doc(json!({"created_by": owner, "creation_date": date})),
                )
                .await
                .unwrap();
        }

        let query = Query::new()
            .eq("created_by", "a@example.com")
            .newest_first("creation_date");
        let found = store.find(Collection::Parcels, &query).await.unwrap();

        let dates: Vec<_> = found.iter().map(|d| d["creation_date"].clone()).collect();
        assert_eq!(
            dates,
            vec![json!("2025-07-03T00:00:00.000Z"), json!("2025-07-01T00:00:00.000Z")]
        );
    }

    #[tokio::test]
    async fn test_descending_ties_keep_latest_insert_first() {
        let store = MemoryStore::new();
        for message in ["first", "second"] {
            store
                .insert_one(
                    Collection::TrackingEvents,
                    doc(json!({"timestamp": "2025-07-01T00:00:00.000Z", "message": message})),
                )
                .await
                .unwrap();
        }

        let found = store
            .find(Collection::TrackingEvents, &Query::new().newest_first("timestamp"))
            .await
            .unwrap();
        assert_eq!(found[0]["message"], json!("second"));
        assert_eq!(found[1]["message"], json!("first"));
    }

    #[tokio::test]
    async fn test_missing_and_malformed_ids_are_not_found() {
        let store = MemoryStore::new();

        let err = store
            .find_by_id(Collection::Parcels, "definitely-not-an-id")
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 404);

        let err = store
            .find_by_id(Collection::Parcels, "64b7f0c2a1e4d3b2c1a09f8e")
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 404);

        let err = store
            .delete_by_id(Collection::Parcels, "64b7f0c2a1e4d3b2c1a09f8e")
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 404);
    }

    #[tokio::test]
    async fn test_update_reports_modification() {
        let store = MemoryStore::new();
        let id = store
            .insert_one(Collection::Riders, doc(json!({"status": "pending"})))
            .await
            .unwrap()
            .inserted_id;

        let outcome = store
            .update_by_id(Collection::Riders, &id, doc(json!({"status": "approved"})))
            .await
            .unwrap();
        assert_eq!(outcome, UpdateOutcome::new(1, 1));

        let outcome = store
            .update_by_id(Collection::Riders, &id, doc(json!({"status": "approved"})))
            .await
            .unwrap();
        assert_eq!(outcome, UpdateOutcome::new(1, 0));
    }

    #[tokio::test]
    async fn test_delete_removes_document() {
        let store = MemoryStore::new();
        let id = store
            .insert_one(Collection::Parcels, doc(json!({"created_by": "a@example.com"})))
            .await
            .unwrap()
            .inserted_id;

        let outcome = store.delete_by_id(Collection::Parcels, &id).await.unwrap();
        assert_eq!(outcome.deleted_count, 1);
        assert_eq!(store.len(Collection::Parcels), 0);
    }

    #[test]
    fn test_compare_values_mixed_types() {
        assert_eq!(
            compare_values(Some(&json!(2)), Some(&json!(10))),
            Ordering::Less
        );
        assert_eq!(
            compare_values(None, Some(&json!("a"))),
            Ordering::Less
        );
        assert_eq!(
            compare_values(Some(&json!("b")), Some(&json!("a"))),
            Ordering::Greater
        );
    }
}
