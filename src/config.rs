use std::env;
use std::str::FromStr;

use crate::utils::error::AppError;

/// Which document store backs the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Mongo,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mongo" | "mongodb" => Ok(StoreBackend::Mongo),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(AppError::InvalidRequest(format!(
                "STORE_BACKEND must be mongo or memory, got {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: Option<String>,
    pub database_name: Option<String>,
    pub store_backend: StoreBackend,
}

impl AppConfig {
    /// Reads `HOST`, `PORT`, `DATABASE_URL`, `DATABASE_NAME` and
    /// `STORE_BACKEND`. Call `dotenv()` first to pick up a `.env` file.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = match lookup("PORT") {
            Some(port) => port
                .parse()
                .map_err(|_| AppError::InvalidRequest(format!("PORT {} is not a port number", port)))?,
            None => 3002,
        };
        let store_backend = match lookup("STORE_BACKEND") {
            Some(backend) => backend.parse()?,
            None => StoreBackend::Mongo,
        };
        let database_url = lookup("DATABASE_URL");
        if store_backend == StoreBackend::Mongo && database_url.is_none() {
            return Err(AppError::InvalidRequest(
                "DATABASE_URL must be set for the mongo backend".into(),
            ));
        }

        Ok(Self {
            host,
            port,
            database_url,
            database_name: lookup("DATABASE_NAME"),
            store_backend,
        })
    }
}
