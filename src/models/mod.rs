pub mod analytics;
pub mod assignment;
pub mod course;
pub mod enrollment;
pub mod record;
pub mod submission;
pub mod user;

pub use analytics::*;
pub use assignment::*;
pub use course::*;
pub use enrollment::*;
pub use record::*;
pub use submission::*;
pub use user::*;

use mongodb::bson::{self, Bson};
use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};

use crate::pipeline::value::as_f64;
use crate::utils::error::AppError;

/// A record type stored in one of the dataset's collections.
///
/// `validate` runs where documents enter the system (typed inserts);
/// pipelines read whatever is stored without re-validating.
pub trait Entity: Serialize + DeserializeOwned {
    const COLLECTION: &'static str;

    fn validate(&self) -> Result<(), AppError>;
}

pub(crate) fn require_non_empty(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::InvalidRequest(format!("{} must not be empty", field)));
    }
    Ok(())
}

/// Reads any numeric BSON value (including Decimal128) as `f64`.
pub(crate) fn number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    let value = Bson::deserialize(deserializer)?;
    as_f64(&value).ok_or_else(|| serde::de::Error::custom(format!("expected a number, got {}", value)))
}

/// Like [`number`], with null and non-numeric values read as `None`.
pub(crate) fn lenient_number<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<f64>, D::Error> {
    Ok(as_f64(&Bson::deserialize(deserializer)?))
}

/// Reads a field as `T`, or `None` when the stored value has another shape.
pub(crate) fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(bson::from_bson(Bson::deserialize(deserializer)?).ok())
}
