pub mod analytics;
pub mod catalog;
pub mod health;
pub mod metrics;
pub mod profiler;
pub mod swagger;

use actix_web::{web, HttpResponse};
use mongodb::bson::{oid::ObjectId, Bson};
use serde::Serialize;

use crate::utils::error::{AppError, StoreError};

/// Registers every route of the service.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health::health_check))
        .route("/metrics", web::get().to(metrics::get_metrics))
        // ==================== ANALYTICS ====================
        .service(
            web::scope("/api/v1/analytics")
                .route("/enrollment-stats", web::get().to(analytics::get_enrollment_stats))
                .route("/average-course-rating", web::get().to(analytics::get_average_course_rating))
                .route("/courses-by-category", web::get().to(analytics::get_courses_by_category))
                .route("/average-grades", web::get().to(analytics::get_avg_grade_per_student))
                .route("/top-students", web::get().to(analytics::get_top_students))
                .route("/instructors/students", web::get().to(analytics::get_students_per_instructor))
                .route("/instructors/ratings", web::get().to(analytics::get_rating_per_instructor))
                .route("/instructors/revenue", web::get().to(analytics::get_revenue_per_instructor))
                .route("/monthly-enrollments", web::get().to(analytics::get_monthly_enrollments))
                .route("/popular-categories", web::get().to(analytics::get_popular_categories))
                .route("/student-engagement", web::get().to(analytics::get_student_engagement))
                .route("/completion-rates", web::get().to(analytics::get_completion_rates)),
        )
        // ==================== CATALOG ====================
        .service(
            web::scope("/api/v1/catalog")
                .route("/students/active", web::get().to(catalog::get_active_students))
                .route("/users/recent", web::get().to(catalog::get_recent_users))
                .route("/users/{user_id}/deactivate", web::post().to(catalog::deactivate_user))
                .route("/courses/with-instructors", web::get().to(catalog::get_courses_with_instructors))
                .route("/courses/search", web::get().to(catalog::search_courses))
                .route("/courses/price-range", web::get().to(catalog::get_courses_in_price_range))
                .route("/courses/tags", web::get().to(catalog::get_courses_by_tags))
                .route("/courses/category/{category}", web::get().to(catalog::get_courses_in_category))
                .route("/courses/{course_id}/students", web::get().to(catalog::get_course_roster))
                .route("/assignments/due-next-week", web::get().to(catalog::get_assignments_due_next_week)),
        )
        // ==================== PROFILER ====================
        .service(
            web::scope("/api/v1/profiler")
                .route("/time", web::post().to(profiler::time_query))
                .route("/explain", web::post().to(profiler::explain_query)),
        );
}

/// Wraps a service result in the `{success, data}` / `{success, error}`
/// envelope and counts the request.
pub(crate) fn respond<T: Serialize>(label: &str, result: Result<T, AppError>) -> HttpResponse {
    metrics::increment_request_count();
    match result {
        Ok(data) => {
            log::info!("✅ {}", label);
            HttpResponse::Ok().json(serde_json::json!({
                "success": true,
                "data": data
            }))
        }
        Err(e) => error_response(label, &e),
    }
}

pub(crate) fn error_response(label: &str, e: &AppError) -> HttpResponse {
    metrics::increment_error_count();
    let body = serde_json::json!({
        "success": false,
        "error": e.to_string()
    });
    match e {
        AppError::InvalidRequest(_) => {
            log::warn!("⚠️ {}: {}", label, e);
            HttpResponse::BadRequest().json(body)
        }
        AppError::NotFound(_) => {
            log::warn!("⚠️ {}: {}", label, e);
            HttpResponse::NotFound().json(body)
        }
        AppError::Store(StoreError::DuplicateKey(_)) => {
            log::warn!("⚠️ {}: {}", label, e);
            HttpResponse::Conflict().json(body)
        }
        _ => {
            log::error!("❌ {}: {}", label, e);
            HttpResponse::InternalServerError().json(body)
        }
    }
}

/// Path identifiers are ObjectIds when they look like one, strings otherwise.
pub(crate) fn parse_id(raw: &str) -> Bson {
    match ObjectId::parse_str(raw) {
        Ok(oid) => Bson::ObjectId(oid),
        Err(_) => Bson::String(raw.to_string()),
    }
}
