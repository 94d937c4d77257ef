use async_trait::async_trait;
use mongodb::bson::{Bson, Document};

use super::update::Update;
use crate::pipeline::{Filter, Pipeline};
use crate::utils::error::StoreError;

/// Generic access to the document collections. No business logic lives
/// behind this seam; every failure is returned to the caller unmodified.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Inserts a document, assigning an `_id` when it has none.
    async fn insert_one(&self, collection: &str, doc: Document) -> Result<Bson, StoreError>;

    /// Applies `update` to the first match. Returns how many documents changed,
    /// which is zero when the update leaves the document as it was.
    async fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        update: &Update,
    ) -> Result<u64, StoreError>;

    async fn delete_one(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError>;

    async fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>, StoreError>;

    async fn find_one(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Option<Document>, StoreError>;

    async fn run_pipeline(
        &self,
        collection: &str,
        pipeline: &Pipeline,
    ) -> Result<Vec<Document>, StoreError>;

    /// Execution statistics for a filtered read, passed through as the
    /// store reports them.
    async fn explain(&self, collection: &str, filter: &Filter) -> Result<Document, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}
