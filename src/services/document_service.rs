//! Single-document writes. Every helper returns the store's answer to the
//! caller; nothing here logs failures on the caller's behalf.

use mongodb::bson::{self, Bson, Document};

use crate::database::collections::USERS;
use crate::database::{DocumentStore, Update};
use crate::models::{Assignment, Course, Enrollment, Entity, Submission, User};
use crate::pipeline::Filter;
use crate::utils::error::{AppError, StoreError};

/// Inserts `doc` as is and returns its `_id`.
pub async fn insert_document(
    store: &dyn DocumentStore,
    collection: &str,
    doc: Document,
) -> Result<Bson, StoreError> {
    let id = store.insert_one(collection, doc).await?;
    log::debug!("Inserted into {} with _id {}", collection, id);
    Ok(id)
}

/// Validates a typed record and inserts it into its collection.
pub async fn insert_entity<T: Entity>(store: &dyn DocumentStore, entity: &T) -> Result<Bson, AppError> {
    entity.validate()?;
    let doc = bson::to_document(entity)?;
    Ok(insert_document(store, T::COLLECTION, doc).await?)
}

pub async fn insert_user(store: &dyn DocumentStore, user: &User) -> Result<Bson, AppError> {
    insert_entity(store, user).await
}

pub async fn insert_course(store: &dyn DocumentStore, course: &Course) -> Result<Bson, AppError> {
    insert_entity(store, course).await
}

pub async fn insert_enrollment(store: &dyn DocumentStore, enrollment: &Enrollment) -> Result<Bson, AppError> {
    insert_entity(store, enrollment).await
}

pub async fn insert_assignment(store: &dyn DocumentStore, assignment: &Assignment) -> Result<Bson, AppError> {
    insert_entity(store, assignment).await
}

pub async fn insert_submission(store: &dyn DocumentStore, submission: &Submission) -> Result<Bson, AppError> {
    insert_entity(store, submission).await
}

/// Applies `update` to the first document matching `filter`; returns the
/// modified count.
pub async fn update_document(
    store: &dyn DocumentStore,
    collection: &str,
    filter: &Filter,
    update: &Update,
) -> Result<u64, AppError> {
    if update.is_empty() {
        return Err(AppError::InvalidRequest("update has no fields".into()));
    }
    Ok(store.update_one(collection, filter, update).await?)
}

/// Marks a user inactive. The user document is kept; a second call
/// modifies nothing and returns 0.
pub async fn soft_delete_user(store: &dyn DocumentStore, user_id: impl Into<Bson>) -> Result<u64, AppError> {
    let filter = Filter::eq("_id", user_id);
    let modified = store
        .update_one(USERS, &filter, &Update::set("isActive", false))
        .await?;
    Ok(modified)
}

pub async fn delete_document(
    store: &dyn DocumentStore,
    collection: &str,
    filter: &Filter,
) -> Result<u64, AppError> {
    Ok(store.delete_one(collection, filter).await?)
}
