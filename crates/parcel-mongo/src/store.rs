//! # MongoDB Store
//!
//! `DocumentStore` over a single long-lived `mongodb::Client`. The driver
//! pools connections internally, so one client serves every request.

use crate::config::MongoConfig;
use crate::convert::{
    bson_to_json, document_to_json, filter_document, json_to_document, object_id, sort_document,
};
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{doc, Bson, Document as BsonDocument};
use mongodb::options::{ClientOptions, FindOptions, ServerApi, ServerApiVersion};
use mongodb::{Client, Database};
use parcel_core::{
    Collection, DeleteOutcome, DeliveryError, DeliveryResult, Document, DocumentStore,
    InsertOutcome, Query, UpdateOutcome, ID_FIELD,
};
use serde_json::Value;
use tracing::{debug, info, instrument};

/// MongoDB-backed document store
#[derive(Clone)]
pub struct MongoStore {
    client: Client,
    database: Database,
}

impl MongoStore {
    /// Connect and verify the deployment answers a ping.
    ///
    /// Failing here is fatal for the server: it must not start serving
    /// without its database.
    pub async fn connect(config: &MongoConfig) -> DeliveryResult<Self> {
        let mut options = ClientOptions::parse(config.uri.as_str())
            .await
            .map_err(db_error)?;
        options.app_name = Some(config.app_name.clone());
        options.server_api = Some(ServerApi::builder().version(ServerApiVersion::V1).build());

        let client = Client::with_options(options).map_err(db_error)?;
        let store = Self::with_client(client, &config.database);
        store.ping().await?;

        info!("Connected to MongoDB database '{}'", config.database);
        Ok(store)
    }

    /// Create from environment variables
    pub async fn from_env() -> DeliveryResult<Self> {
        let config = MongoConfig::from_env()?;
        Self::connect(&config).await
    }

    /// Wrap an existing client without pinging
    pub fn with_client(client: Client, database: &str) -> Self {
        let database = client.database(database);
        Self { client, database }
    }

    fn collection(&self, collection: Collection) -> mongodb::Collection<BsonDocument> {
        self.database.collection(collection.as_str())
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    #[instrument(skip(self, document), fields(collection = %collection))]
    async fn insert_one(
        &self,
        collection: Collection,
        mut document: Document,
    ) -> DeliveryResult<InsertOutcome> {
        document.remove(ID_FIELD);
        let bson_doc = json_to_document(&document)?;

        let result = self
            .collection(collection)
            .insert_one(bson_doc)
            .await
            .map_err(db_error)?;

        let inserted_id = match bson_to_json(result.inserted_id) {
            Value::String(id) => id,
            other => other.to_string(),
        };
        debug!("Inserted {} into {}", inserted_id, collection);

        Ok(InsertOutcome::new(inserted_id))
    }

    #[instrument(skip(self, query), fields(collection = %collection))]
    async fn find(&self, collection: Collection, query: &Query) -> DeliveryResult<Vec<Document>> {
        let filter = filter_document(query)?;
        let mut options = FindOptions::default();
        options.sort = sort_document(query);

        let cursor = self
            .collection(collection)
            .find(filter)
            .with_options(options)
            .await
            .map_err(db_error)?;

        let documents: Vec<BsonDocument> = cursor.try_collect().await.map_err(db_error)?;
        debug!("Found {} documents in {}", documents.len(), collection);

        Ok(documents.into_iter().map(document_to_json).collect())
    }

    #[instrument(skip(self), fields(collection = %collection))]
    async fn find_by_id(&self, collection: Collection, id: &str) -> DeliveryResult<Document> {
        let oid = object_id(collection, id)?;

        self.collection(collection)
            .find_one(doc! { "_id": oid })
            .await
            .map_err(db_error)?
            .map(document_to_json)
            .ok_or_else(|| DeliveryError::not_found(collection.resource_name(), id))
    }

    #[instrument(skip(self, patch), fields(collection = %collection))]
    async fn update_by_id(
        &self,
        collection: Collection,
        id: &str,
        mut patch: Document,
    ) -> DeliveryResult<UpdateOutcome> {
        let oid = object_id(collection, id)?;
        patch.remove(ID_FIELD);
        let set = json_to_document(&patch)?;

        let result = self
            .collection(collection)
            .update_one(doc! { "_id": oid }, doc! { "$set": set })
            .await
            .map_err(db_error)?;

        if result.matched_count == 0 {
            return Err(DeliveryError::not_found(collection.resource_name(), id));
        }

        Ok(UpdateOutcome::new(result.matched_count, result.modified_count))
    }

    #[instrument(skip(self), fields(collection = %collection))]
    async fn delete_by_id(
        &self,
        collection: Collection,
        id: &str,
    ) -> DeliveryResult<DeleteOutcome> {
        let oid = object_id(collection, id)?;

        let result = self
            .collection(collection)
            .delete_one(doc! { "_id": oid })
            .await
            .map_err(db_error)?;

        if result.deleted_count == 0 {
            return Err(DeliveryError::not_found(collection.resource_name(), id));
        }

        Ok(DeleteOutcome::new(result.deleted_count))
    }

    async fn ping(&self) -> DeliveryResult<()> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": Bson::Int32(1) })
            .await
            .map(|_| ())
            .map_err(db_error)
    }

    fn backend_name(&self) -> &'static str {
        "mongodb"
    }
}

fn db_error(err: mongodb::error::Error) -> DeliveryError {
    DeliveryError::Database(err.to_string())
}
