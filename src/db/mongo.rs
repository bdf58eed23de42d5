//! MongoDB client and collection wrapper
//!
//! Collections are typed by their schema struct. Indexes declared by the
//! schema are applied when the collection handle is created, so handles
//! should be built once at startup and shared.

use bson::{doc, oid::ObjectId, DateTime, Document};
use futures_util::{Stream, TryStreamExt};
use mongodb::{
    error::{ErrorKind, WriteFailure},
    options::{IndexOptions, UpdateModifications},
    results::{DeleteResult, UpdateResult},
    Client, Collection, IndexModel,
};
use serde::{de::DeserializeOwned, Serialize};
use tracing::info;

use crate::db::schemas::Metadata;
use crate::types::TrackerError;

/// Server error code for a unique index violation
const DUPLICATE_KEY_CODE: i32 = 11000;

/// Trait for schemas that provide index definitions
pub trait IntoIndexes {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)>;
}

/// Trait for schemas with mutable metadata
pub trait MutMetadata {
    fn mut_metadata(&mut self) -> &mut Metadata;
}

/// MongoDB client wrapper
#[derive(Clone)]
pub struct MongoClient {
    client: Client,
    db_name: String,
}

impl MongoClient {
    /// Connect and verify the server answers a ping
    pub async fn new(uri: &str, db_name: &str) -> Result<Self, TrackerError> {
        info!("Connecting to MongoDB at {}", uri);

        // Fail fast on an unreachable server instead of hanging startup
        let timeout_uri = if uri.contains('?') {
            format!("{}&serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        } else {
            format!("{}?serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        };

        let client = Client::with_uri_str(&timeout_uri)
            .await
            .map_err(|e| TrackerError::Database(format!("Failed to connect to MongoDB: {}", e)))?;

        client
            .database(db_name)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| TrackerError::Database(format!("MongoDB ping failed: {}", e)))?;

        info!("Connected to MongoDB database '{}'", db_name);

        Ok(Self {
            client,
            db_name: db_name.to_string(),
        })
    }

    /// Get a typed collection
    pub async fn collection<T>(&self, name: &str) -> Result<MongoCollection<T>, TrackerError>
    where
        T: Serialize + DeserializeOwned + Unpin + Send + Sync + Default + IntoIndexes + MutMetadata,
    {
        MongoCollection::new(&self.client, &self.db_name, name).await
    }

    pub fn db_name(&self) -> &str {
        &self.db_name
    }
}

/// Typed MongoDB collection with automatic indexing
#[derive(Debug, Clone)]
pub struct MongoCollection<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync,
{
    inner: Collection<T>,
}

impl<T> MongoCollection<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync + Default + IntoIndexes + MutMetadata,
{
    /// Create a new collection and apply indexes
    pub async fn new(
        client: &Client,
        db_name: &str,
        collection_name: &str,
    ) -> Result<Self, TrackerError> {
        let collection = client.database(db_name).collection::<T>(collection_name);
        let mongo_collection = MongoCollection { inner: collection };

        mongo_collection.apply_indexes().await?;

        Ok(mongo_collection)
    }

    async fn apply_indexes(&self) -> Result<(), TrackerError> {
        let schema_indices = T::into_indices();

        if schema_indices.is_empty() {
            return Ok(());
        }

        let indices: Vec<IndexModel> = schema_indices
            .into_iter()
            .map(|(keys, opts)| IndexModel::builder().keys(keys).options(opts).build())
            .collect();

        self.inner
            .create_indexes(indices)
            .await
            .map_err(|e| TrackerError::Database(format!("Failed to create indexes: {}", e)))?;

        Ok(())
    }

    /// Insert a document, setting metadata timestamps.
    ///
    /// A unique index violation is reported as [`TrackerError::Conflict`].
    pub async fn insert_one(&self, mut item: T) -> Result<ObjectId, TrackerError> {
        let metadata = item.mut_metadata();
        metadata.created_at = Some(DateTime::now());
        metadata.updated_at = Some(DateTime::now());

        let result = self.inner.insert_one(item).await.map_err(|e| {
            if is_duplicate_key(&e) {
                TrackerError::Conflict("Document already exists".into())
            } else {
                TrackerError::Database(format!("Insert failed: {}", e))
            }
        })?;

        result
            .inserted_id
            .as_object_id()
            .ok_or_else(|| TrackerError::Database("Failed to get inserted ID".into()))
    }

    pub async fn find_one(&self, filter: Document) -> Result<Option<T>, TrackerError> {
        self.inner
            .find_one(filter)
            .await
            .map_err(|e| TrackerError::Database(format!("Find failed: {}", e)))
    }

    /// Find many documents by filter, optionally sorted
    pub async fn find_many(
        &self,
        filter: Document,
        sort: Option<Document>,
    ) -> Result<Vec<T>, TrackerError> {
        let mut find = self.inner.find(filter);
        if let Some(sort) = sort {
            find = find.sort(sort);
        }

        let cursor = find
            .await
            .map_err(|e| TrackerError::Database(format!("Find failed: {}", e)))?;

        collect_documents(cursor).await
    }

    pub async fn update_one(
        &self,
        filter: Document,
        update: impl Into<UpdateModifications>,
    ) -> Result<UpdateResult, TrackerError> {
        self.inner
            .update_one(filter, update.into())
            .await
            .map_err(|e| TrackerError::Database(format!("Update failed: {}", e)))
    }

    /// Update the matching document, inserting it when absent
    pub async fn upsert_one(
        &self,
        filter: Document,
        update: impl Into<UpdateModifications>,
    ) -> Result<UpdateResult, TrackerError> {
        self.inner
            .update_one(filter, update.into())
            .upsert(true)
            .await
            .map_err(|e| TrackerError::Database(format!("Upsert failed: {}", e)))
    }

    /// Replace the document matching `filter`, bumping `metadata.updated_at`
    pub async fn replace_one(
        &self,
        filter: Document,
        mut item: T,
    ) -> Result<UpdateResult, TrackerError> {
        item.mut_metadata().updated_at = Some(DateTime::now());

        self.inner
            .replace_one(filter, item)
            .await
            .map_err(|e| TrackerError::Database(format!("Replace failed: {}", e)))
    }

    pub async fn delete_one(&self, filter: Document) -> Result<DeleteResult, TrackerError> {
        self.inner
            .delete_one(filter)
            .await
            .map_err(|e| TrackerError::Database(format!("Delete failed: {}", e)))
    }

    pub async fn delete_many(&self, filter: Document) -> Result<DeleteResult, TrackerError> {
        self.inner
            .delete_many(filter)
            .await
            .map_err(|e| TrackerError::Database(format!("Delete failed: {}", e)))
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write_error))
            if write_error.code == DUPLICATE_KEY_CODE
    )
}

/// Drain a cursor. A document that fails to decode fails the whole read.
async fn collect_documents<T, S>(cursor: S) -> Result<Vec<T>, TrackerError>
where
    S: Stream<Item = mongodb::error::Result<T>>,
{
    cursor
        .try_collect::<Vec<T>>()
        .await
        .map_err(|e| TrackerError::Database(format!("Error reading document: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schemas::HabitDoc;
    use futures_util::stream;

    #[tokio::test]
    async fn test_undecodable_document_fails_the_read() {
        let bad = bson::from_document::<HabitDoc>(doc! { "title": 5 }).unwrap_err();
        let docs = vec![Ok(HabitDoc::default()), Err(mongodb::error::Error::from(bad))];

        let result = collect_documents(stream::iter(docs)).await;
        assert!(matches!(result, Err(TrackerError::Database(_))));
    }

    #[tokio::test]
    async fn test_collects_decoded_documents() {
        let docs: Vec<mongodb::error::Result<HabitDoc>> =
            vec![Ok(HabitDoc::default()), Ok(HabitDoc::default())];

        let habits = collect_documents(stream::iter(docs)).await.unwrap();
        assert_eq!(habits.len(), 2);
    }
}
