use mongodb::bson;
use thiserror::Error;

/// Failures raised by a document store. Propagated unmodified by every
/// service function; only the caller decides whether to retry or log.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    #[error("Store connectivity error: {0}")]
    Connectivity(String),
}

impl From<mongodb::error::Error> for StoreError {
    fn from(err: mongodb::error::Error) -> Self {
        use mongodb::error::{ErrorKind, WriteFailure};

        match err.kind.as_ref() {
            ErrorKind::Write(WriteFailure::WriteError(write_error)) if write_error.code == 11000 => {
                StoreError::DuplicateKey(write_error.message.clone())
            }
            _ => StoreError::Connectivity(err.to_string()),
        }
    }
}

/// Application-wide error types.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<bson::de::Error> for AppError {
    fn from(err: bson::de::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<bson::ser::Error> for AppError {
    fn from(err: bson::ser::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_keep_their_kind_through_app_error() {
        let err: AppError = StoreError::DuplicateKey("E11000 users._id".into()).into();
        assert!(matches!(err, AppError::Store(StoreError::DuplicateKey(_))));
        assert_eq!(err.to_string(), "Duplicate key: E11000 users._id");
    }
}
