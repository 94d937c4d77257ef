use mongodb::bson::{Bson, DateTime};
use serde::{Deserialize, Serialize};

use super::{require_non_empty, Entity};
use crate::database::collections::USERS;
use crate::utils::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Instructor,
}

/// Platform user. Never hard-deleted; deactivation flips `is_active`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Bson>,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: Role,
    #[serde(default = "default_active")]
    pub is_active: bool,
    pub date_joined: DateTime,
}

fn default_active() -> bool {
    true
}

impl User {
    pub fn new(first_name: &str, last_name: &str, email: &str, role: Role) -> Self {
        Self {
            id: None,
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            email: email.to_string(),
            role,
            is_active: true,
            date_joined: DateTime::now(),
        }
    }

    pub fn with_id(mut self, id: impl Into<Bson>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

impl Entity for User {
    const COLLECTION: &'static str = USERS;

    fn validate(&self) -> Result<(), AppError> {
        require_non_empty("firstName", &self.first_name)?;
        require_non_empty("lastName", &self.last_name)?;
        if !self.email.contains('@') {
            return Err(AppError::InvalidRequest(format!(
                "email {} is not an address",
                self.email
            )));
        }
        Ok(())
    }
}
