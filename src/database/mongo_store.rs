use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{doc, Bson, Document};
use mongodb::Collection;

use super::store::DocumentStore;
use super::update::Update;
use super::MongoDB;
use crate::pipeline::{Filter, Pipeline};
use crate::utils::error::StoreError;

/// Store adapter over a MongoDB database. Filters, updates and pipelines
/// are rendered to their server form and executed remotely.
#[derive(Clone)]
pub struct MongoStore {
    db: MongoDB,
}

impl MongoStore {
    pub fn new(db: MongoDB) -> Self {
        Self { db }
    }

    fn collection(&self, name: &str) -> Collection<Document> {
        self.db.collection::<Document>(name)
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    async fn insert_one(&self, collection: &str, doc: Document) -> Result<Bson, StoreError> {
        let result = self.collection(collection).insert_one(doc).await?;
        Ok(result.inserted_id)
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        update: &Update,
    ) -> Result<u64, StoreError> {
        let result = self
            .collection(collection)
            .update_one(filter.to_document(), update.to_document())
            .await?;
        Ok(result.modified_count)
    }

    async fn delete_one(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError> {
        let result = self
            .collection(collection)
            .delete_one(filter.to_document())
            .await?;
        Ok(result.deleted_count)
    }

    async fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>, StoreError> {
        let cursor = self.collection(collection).find(filter.to_document()).await?;
        let docs: Vec<Document> = cursor.try_collect().await?;
        Ok(docs)
    }

    async fn find_one(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Option<Document>, StoreError> {
        Ok(self
            .collection(collection)
            .find_one(filter.to_document())
            .await?)
    }

    async fn run_pipeline(
        &self,
        collection: &str,
        pipeline: &Pipeline,
    ) -> Result<Vec<Document>, StoreError> {
        let stages = pipeline.to_documents();
        log::debug!("aggregate {} with {} stages", collection, stages.len());

        let cursor = self.collection(collection).aggregate(stages).await?;
        let docs: Vec<Document> = cursor.try_collect().await?;
        Ok(docs)
    }

    async fn explain(&self, collection: &str, filter: &Filter) -> Result<Document, StoreError> {
        let command = doc! {
            "explain": { "find": collection, "filter": filter.to_document() },
            "verbosity": "executionStats",
        };
        Ok(self.db.database().run_command(command).await?)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.db.health_check().await
    }
}
