use actix_web::{web, HttpResponse};
use mongodb::bson::{self, Document};
use serde::Deserialize;

use super::respond;
use crate::database::collections;
use crate::database::DocumentStore;
use crate::pipeline::Filter;
use crate::services::profiler_service::{self, QueryTiming};
use crate::utils::error::AppError;

#[derive(Deserialize, utoipa::ToSchema)]
pub struct ProfileRequest {
    pub collection: String,
    /// Query document, e.g. `{"email": "ada@example.com"}`.
    #[serde(default)]
    #[schema(value_type = Object)]
    pub filter: serde_json::Value,
    #[serde(default)]
    pub label: Option<String>,
}

impl ProfileRequest {
    fn parse(&self) -> Result<Filter, AppError> {
        let known = [
            collections::USERS,
            collections::COURSES,
            collections::ENROLLMENTS,
            collections::ASSIGNMENTS,
            collections::SUBMISSIONS,
        ];
        if !known.contains(&self.collection.as_str()) {
            return Err(AppError::InvalidRequest(format!(
                "unknown collection {}",
                self.collection
            )));
        }
        let query: Document = match &self.filter {
            serde_json::Value::Null => Document::new(),
            value => bson::to_document(value)
                .map_err(|e| AppError::InvalidRequest(format!("filter must be an object: {}", e)))?,
        };
        Filter::from_document(&query)
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/profiler/time",
    tag = "Profiler",
    request_body = ProfileRequest,
    responses(
        (status = 200, description = "Result count and wall-clock duration", body = QueryTiming),
        (status = 400, description = "Unknown collection or unsupported filter")
    )
)]
pub async fn time_query(
    store: web::Data<dyn DocumentStore>,
    body: web::Json<ProfileRequest>,
) -> HttpResponse {
    log::info!("⏱️  POST /profiler/time on {}", body.collection);
    let result = match body.parse() {
        Ok(filter) => {
            let label = body.label.clone().unwrap_or_else(|| body.collection.clone());
            profiler_service::time_query(store.get_ref(), &body.collection, &filter, &label).await
        }
        Err(e) => Err(e),
    };
    respond("time query", result)
}

#[utoipa::path(
    post,
    path = "/api/v1/profiler/explain",
    tag = "Profiler",
    request_body = ProfileRequest,
    responses(
        (status = 200, description = "Store execution statistics, passed through"),
        (status = 400, description = "Unknown collection or unsupported filter")
    )
)]
pub async fn explain_query(
    store: web::Data<dyn DocumentStore>,
    body: web::Json<ProfileRequest>,
) -> HttpResponse {
    log::info!("🔍 POST /profiler/explain on {}", body.collection);
    let result = match body.parse() {
        Ok(filter) => {
            profiler_service::analyze_query_performance(store.get_ref(), &body.collection, &filter)
                .await
        }
        Err(e) => Err(e),
    };
    respond("explain query", result)
}
