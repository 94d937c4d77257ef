use mongodb::bson::{Bson, DateTime};
use serde::{Deserialize, Serialize};

use super::Entity;
use crate::database::collections::ENROLLMENTS;
use crate::utils::error::AppError;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Enrollment {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Bson>,
    pub student_id: Bson,
    pub course_id: Bson,
    pub enrolled_at: DateTime,
}

impl Enrollment {
    pub fn new(student_id: impl Into<Bson>, course_id: impl Into<Bson>, enrolled_at: DateTime) -> Self {
        Self {
            id: None,
            student_id: student_id.into(),
            course_id: course_id.into(),
            enrolled_at,
        }
    }
}

impl Entity for Enrollment {
    const COLLECTION: &'static str = ENROLLMENTS;

    fn validate(&self) -> Result<(), AppError> {
        if matches!(self.student_id, Bson::Null) || matches!(self.course_id, Bson::Null) {
            return Err(AppError::InvalidRequest(
                "enrollment needs a studentId and a courseId".into(),
            ));
        }
        Ok(())
    }
}
