use mongodb::bson::{doc, Bson, Document};

use crate::pipeline::value::{get_path, remove_path, set_path};
use crate::utils::error::AppError;

/// Targeted field update (`$set` / `$unset`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Update {
    set: Document,
    unset: Vec<String>,
}

impl Update {
    pub fn set(field: &str, value: impl Into<Bson>) -> Self {
        Self::default().and_set(field, value)
    }

    pub fn and_set(mut self, field: &str, value: impl Into<Bson>) -> Self {
        self.set.insert(field, value.into());
        self
    }

    pub fn unset(mut self, field: &str) -> Self {
        self.unset.push(field.to_string());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && self.unset.is_empty()
    }

    /// Parses `{"$set": {...}, "$unset": {...}}` as sent by callers.
    pub fn from_document(update: &Document) -> Result<Self, AppError> {
        let mut parsed = Self::default();
        for (op, fields) in update {
            let Bson::Document(fields) = fields else {
                return Err(AppError::InvalidRequest(format!("{} expects a document", op)));
            };
            match op.as_str() {
                "$set" => {
                    for (field, value) in fields {
                        parsed.set.insert(field.as_str(), value.clone());
                    }
                }
                "$unset" => parsed.unset.extend(fields.keys().cloned()),
                other => {
                    return Err(AppError::InvalidRequest(format!(
                        "unsupported update operator {}",
                        other
                    )))
                }
            }
        }
        if parsed.is_empty() {
            return Err(AppError::InvalidRequest("update has no fields".into()));
        }
        Ok(parsed)
    }

    pub fn to_document(&self) -> Document {
        let mut update = Document::new();
        if !self.set.is_empty() {
            update.insert("$set", self.set.clone());
        }
        if !self.unset.is_empty() {
            let mut unset = Document::new();
            for field in &self.unset {
                unset.insert(field.as_str(), "");
            }
            update.insert("$unset", unset);
        }
        update
    }

    /// Applies the update in place. Returns whether anything changed.
    pub fn apply(&self, target: &mut Document) -> bool {
        let mut changed = false;
        for (field, value) in &self.set {
            if get_path(target, field) != Some(value) {
                set_path(target, field, value.clone());
                changed = true;
            }
        }
        for field in &self.unset {
            if get_path(target, field).is_some() {
                remove_path(target, field);
                changed = true;
            }
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn applying_the_same_set_twice_changes_nothing_the_second_time() {
        let mut user = doc! { "_id": "U1", "isActive": true };
        let deactivate = Update::set("isActive", false);

        assert!(deactivate.apply(&mut user));
        assert!(!deactivate.apply(&mut user));
        assert_eq!(user, doc! { "_id": "U1", "isActive": false });
    }

    #[test]
    fn parses_and_renders_update_documents() {
        let update = Update::from_document(&doc! {
            "$set": { "price": 59.99 },
            "$unset": { "rating": "" },
        })
        .unwrap();
        assert_eq!(update, Update::set("price", 59.99).unset("rating"));
        assert_eq!(
            update.to_document(),
            doc! { "$set": { "price": 59.99 }, "$unset": { "rating": "" } }
        );
    }

    #[test]
    fn rejects_unknown_operators_and_empty_updates() {
        assert!(Update::from_document(&doc! { "$inc": { "n": 1 } }).is_err());
        assert!(Update::from_document(&doc! {}).is_err());
    }
}
