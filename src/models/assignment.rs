use mongodb::bson::{Bson, DateTime};
use serde::{Deserialize, Serialize};

use super::{require_non_empty, Entity};
use crate::database::collections::ASSIGNMENTS;
use crate::utils::error::AppError;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Bson>,
    pub course_id: Bson,
    pub title: String,
    pub due_date: DateTime,
}

impl Assignment {
    pub fn new(course_id: impl Into<Bson>, title: &str, due_date: DateTime) -> Self {
        Self {
            id: None,
            course_id: course_id.into(),
            title: title.to_string(),
            due_date,
        }
    }

    pub fn with_id(mut self, id: impl Into<Bson>) -> Self {
        self.id = Some(id.into());
        self
    }
}

impl Entity for Assignment {
    const COLLECTION: &'static str = ASSIGNMENTS;

    fn validate(&self) -> Result<(), AppError> {
        require_non_empty("title", &self.title)?;
        if matches!(self.course_id, Bson::Null) {
            return Err(AppError::InvalidRequest("assignment needs a courseId".into()));
        }
        Ok(())
    }
}
