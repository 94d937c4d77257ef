pub mod analytics_service;
pub mod catalog_service;
pub mod completion_service;
pub mod document_service;
pub mod profiler_service;

use mongodb::bson::{self, Document};
use serde::de::DeserializeOwned;

use crate::utils::error::AppError;

/// Deserializes pipeline output into typed records.
pub(crate) fn decode<T: DeserializeOwned>(docs: Vec<Document>) -> Result<Vec<T>, AppError> {
    docs.into_iter()
        .map(|doc| bson::from_document(doc).map_err(AppError::from))
        .collect()
}

/// Typed decoding that logs and skips documents that don't fit the record
/// shape. Used for plain reads over schema-less collections.
pub(crate) fn decode_lenient<T: DeserializeOwned>(collection: &str, docs: Vec<Document>) -> Vec<T> {
    let mut records = Vec::with_capacity(docs.len());
    for doc in docs {
        match bson::from_document(doc) {
            Ok(record) => records.push(record),
            Err(e) => log::warn!("Skipping malformed document in {}: {}", collection, e),
        }
    }
    records
}
