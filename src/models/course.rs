use mongodb::bson::Bson;
use serde::{Deserialize, Serialize};

use super::{require_non_empty, CourseRecord, Entity, UserRecord};
use crate::database::collections::COURSES;
use crate::utils::error::AppError;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Bson>,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub instructor_id: Bson,
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub price: f64,
    /// 0 to 5, absent until the course has been rated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
}

impl Course {
    pub fn new(title: &str, instructor_id: impl Into<Bson>, category: &str, price: f64) -> Self {
        Self {
            id: None,
            title: title.to_string(),
            description: None,
            instructor_id: instructor_id.into(),
            category: category.to_string(),
            tags: Vec::new(),
            price,
            rating: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<Bson>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_rating(mut self, rating: f64) -> Self {
        self.rating = Some(rating);
        self
    }

    pub fn with_tags(mut self, tags: &[&str]) -> Self {
        self.tags = tags.iter().map(|t| t.to_string()).collect();
        self
    }
}

impl Entity for Course {
    const COLLECTION: &'static str = COURSES;

    fn validate(&self) -> Result<(), AppError> {
        require_non_empty("title", &self.title)?;
        require_non_empty("category", &self.category)?;
        if !self.price.is_finite() || self.price < 0.0 {
            return Err(AppError::InvalidRequest(format!(
                "price {} must be a non-negative amount",
                self.price
            )));
        }
        if let Some(rating) = self.rating {
            if !(0.0..=5.0).contains(&rating) {
                return Err(AppError::InvalidRequest(format!(
                    "rating {} is outside 0..=5",
                    rating
                )));
            }
        }
        Ok(())
    }
}

/// A course joined with its instructor's user record.
#[derive(Debug, Clone, Serialize)]
pub struct CourseWithInstructor {
    #[serde(flatten)]
    pub course: CourseRecord,
    pub instructor: UserRecord,
}
