use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Instant;

use async_trait::async_trait;
use mongodb::bson::{doc, oid::ObjectId, Bson, Document};

use super::store::DocumentStore;
use super::update::Update;
use crate::pipeline::executor;
use crate::pipeline::value::{get_path, values_equal};
use crate::pipeline::{Filter, Pipeline};
use crate::utils::error::StoreError;

type Collections = HashMap<String, Vec<Document>>;

/// In-process document store.
///
/// Collections keep insertion order, which is the natural order seen by
/// reads and by sort tie-breaks. Pipelines run through the local executor.
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<Collections>,
    unique_fields: HashMap<String, Vec<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects inserts whose `field` value already exists in `collection`.
    pub fn with_unique_index(mut self, collection: &str, field: &str) -> Self {
        self.unique_fields
            .entry(collection.to_string())
            .or_default()
            .push(field.to_string());
        self
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Collections>, StoreError> {
        self.collections
            .read()
            .map_err(|_| StoreError::Connectivity("memory store lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Collections>, StoreError> {
        self.collections
            .write()
            .map_err(|_| StoreError::Connectivity("memory store lock poisoned".into()))
    }

    fn check_unique(&self, collection: &str, existing: &[Document], doc: &Document) -> Result<(), StoreError> {
        let unique = self.unique_fields.get(collection).map(Vec::as_slice).unwrap_or(&[]);
        for field in std::iter::once("_id").chain(unique.iter().map(String::as_str)) {
            let Some(value) = get_path(doc, field) else {
                continue;
            };
            let clash = existing
                .iter()
                .any(|other| get_path(other, field).is_some_and(|v| values_equal(v, value)));
            if clash {
                return Err(StoreError::DuplicateKey(format!(
                    "E11000 duplicate key error collection: {} index: {}_1 dup key: {{ {}: {} }}",
                    collection, field, field, value
                )));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn insert_one(&self, collection: &str, doc: Document) -> Result<Bson, StoreError> {
        let doc = if doc.contains_key("_id") {
            doc
        } else {
            let mut with_id = doc! { "_id": ObjectId::new() };
            with_id.extend(doc);
            with_id
        };
        let id = doc.get("_id").cloned().unwrap_or(Bson::Null);

        let mut collections = self.write()?;
        let documents = collections.entry(collection.to_string()).or_default();
        self.check_unique(collection, documents, &doc)?;
        documents.push(doc);

        Ok(id)
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        update: &Update,
    ) -> Result<u64, StoreError> {
        let mut collections = self.write()?;
        let target = collections
            .get_mut(collection)
            .and_then(|docs| docs.iter_mut().find(|d| filter.matches(d)));

        let changed = match target {
            Some(doc) => update.apply(doc),
            None => false,
        };
        Ok(u64::from(changed))
    }

    async fn delete_one(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError> {
        let mut collections = self.write()?;
        let Some(docs) = collections.get_mut(collection) else {
            return Ok(0);
        };
        match docs.iter().position(|d| filter.matches(d)) {
            Some(index) => {
                docs.remove(index);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>, StoreError> {
        let collections = self.read()?;
        Ok(collections
            .get(collection)
            .map(|docs| docs.iter().filter(|d| filter.matches(d)).cloned().collect())
            .unwrap_or_default())
    }

    async fn find_one(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Option<Document>, StoreError> {
        let collections = self.read()?;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|d| filter.matches(d)).cloned()))
    }

    async fn run_pipeline(
        &self,
        collection: &str,
        pipeline: &Pipeline,
    ) -> Result<Vec<Document>, StoreError> {
        let collections = self.read()?;
        let input = collections.get(collection).cloned().unwrap_or_default();
        let foreign = |name: &str| collections.get(name).cloned().unwrap_or_default();
        Ok(executor::execute(pipeline, input, &foreign))
    }

    async fn explain(&self, collection: &str, filter: &Filter) -> Result<Document, StoreError> {
        let started = Instant::now();
        let collections = self.read()?;
        let docs = collections.get(collection).map(Vec::as_slice).unwrap_or(&[]);
        let returned = docs.iter().filter(|d| filter.matches(d)).count();
        let elapsed_ms = i64::try_from(started.elapsed().as_millis()).unwrap_or(i64::MAX);

        Ok(doc! {
            "queryPlanner": {
                "namespace": collection,
                "parsedQuery": filter.to_document(),
                "winningPlan": { "stage": "COLLSCAN" },
            },
            "executionStats": {
                "executionSuccess": true,
                "nReturned": returned as i64,
                "executionTimeMillis": elapsed_ms,
                "totalKeysExamined": 0_i64,
                "totalDocsExamined": docs.len() as i64,
            },
        })
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.read().map(|_| ())
    }
}
