use mongodb::bson::{Bson, DateTime};
use serde::{Deserialize, Serialize};

use super::Entity;
use crate::database::collections::SUBMISSIONS;
use crate::utils::error::AppError;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Bson>,
    pub student_id: Bson,
    pub assignment_id: Bson,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<DateTime>,
    /// 0 to 100; `None` while ungraded.
    #[serde(default)]
    pub grade: Option<f64>,
}

impl Submission {
    pub fn new(student_id: impl Into<Bson>, assignment_id: impl Into<Bson>, grade: Option<f64>) -> Self {
        Self {
            id: None,
            student_id: student_id.into(),
            assignment_id: assignment_id.into(),
            submitted_at: Some(DateTime::now()),
            grade,
        }
    }
}

impl Entity for Submission {
    const COLLECTION: &'static str = SUBMISSIONS;

    fn validate(&self) -> Result<(), AppError> {
        if let Some(grade) = self.grade {
            if !(0.0..=100.0).contains(&grade) {
                return Err(AppError::InvalidRequest(format!(
                    "grade {} is outside 0..=100",
                    grade
                )));
            }
        }
        Ok(())
    }
}
