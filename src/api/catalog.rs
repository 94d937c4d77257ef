use actix_web::{web, HttpResponse};
use serde::Deserialize;

use super::{error_response, parse_id, respond};
use crate::database::DocumentStore;
use crate::models::CourseRoster;
use crate::services::{catalog_service, document_service};
use crate::utils::error::AppError;

#[derive(Deserialize)]
pub struct SearchQuery {
    pub q: String,
}

#[derive(Deserialize)]
pub struct PriceRangeQuery {
    pub min: f64,
    pub max: f64,
}

#[derive(Deserialize)]
pub struct RecentUsersQuery {
    pub months: Option<u32>,
}

#[derive(Deserialize)]
pub struct TagsQuery {
    /// Comma-separated.
    pub tags: String,
}

pub async fn get_active_students(store: web::Data<dyn DocumentStore>) -> HttpResponse {
    log::info!("📚 GET /catalog/students/active");
    respond(
        "active students",
        catalog_service::find_active_students(store.get_ref()).await,
    )
}

pub async fn get_recent_users(
    store: web::Data<dyn DocumentStore>,
    query: web::Query<RecentUsersQuery>,
) -> HttpResponse {
    let months = query.months.unwrap_or(6);
    log::info!("📚 GET /catalog/users/recent?months={}", months);
    respond(
        "recent users",
        catalog_service::recent_users(store.get_ref(), months).await,
    )
}

#[utoipa::path(
    post,
    path = "/api/v1/catalog/users/{user_id}/deactivate",
    tag = "Catalog",
    params(("user_id" = String, Path, description = "User identifier")),
    responses(
        (status = 200, description = "Modified count; 0 when already inactive or unknown")
    )
)]
pub async fn deactivate_user(
    store: web::Data<dyn DocumentStore>,
    path: web::Path<String>,
) -> HttpResponse {
    let user_id = path.into_inner();
    log::info!("📚 POST /catalog/users/{}/deactivate", user_id);
    let result = document_service::soft_delete_user(store.get_ref(), parse_id(&user_id))
        .await
        .map(|modified| serde_json::json!({ "modifiedCount": modified }));
    respond("deactivate user", result)
}

pub async fn get_courses_with_instructors(store: web::Data<dyn DocumentStore>) -> HttpResponse {
    log::info!("📚 GET /catalog/courses/with-instructors");
    respond(
        "courses with instructors",
        catalog_service::courses_with_instructors(store.get_ref()).await,
    )
}

pub async fn search_courses(
    store: web::Data<dyn DocumentStore>,
    query: web::Query<SearchQuery>,
) -> HttpResponse {
    log::info!("🔍 GET /catalog/courses/search?q={}", query.q);
    respond(
        "course search",
        catalog_service::search_courses_by_title(store.get_ref(), &query.q).await,
    )
}

pub async fn get_courses_in_price_range(
    store: web::Data<dyn DocumentStore>,
    query: web::Query<PriceRangeQuery>,
) -> HttpResponse {
    log::info!("📚 GET /catalog/courses/price-range?min={}&max={}", query.min, query.max);
    respond(
        "courses in price range",
        catalog_service::courses_in_price_range(store.get_ref(), query.min, query.max).await,
    )
}

pub async fn get_courses_by_tags(
    store: web::Data<dyn DocumentStore>,
    query: web::Query<TagsQuery>,
) -> HttpResponse {
    let tags: Vec<String> = query
        .tags
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect();
    log::info!("📚 GET /catalog/courses/tags?tags={:?}", tags);
    respond(
        "courses by tags",
        catalog_service::courses_by_tags(store.get_ref(), &tags).await,
    )
}

pub async fn get_courses_in_category(
    store: web::Data<dyn DocumentStore>,
    path: web::Path<String>,
) -> HttpResponse {
    let category = path.into_inner();
    log::info!("📚 GET /catalog/courses/category/{}", category);
    respond(
        "courses in category",
        catalog_service::courses_by_category(store.get_ref(), &category).await,
    )
}

#[utoipa::path(
    get,
    path = "/api/v1/catalog/courses/{course_id}/students",
    tag = "Catalog",
    params(("course_id" = String, Path, description = "Course identifier")),
    responses(
        (status = 200, description = "Course title and enrolled students", body = CourseRoster),
        (status = 404, description = "Course not found")
    )
)]
pub async fn get_course_roster(
    store: web::Data<dyn DocumentStore>,
    path: web::Path<String>,
) -> HttpResponse {
    let course_id = path.into_inner();
    log::info!("📚 GET /catalog/courses/{}/students", course_id);
    match catalog_service::students_in_course(store.get_ref(), parse_id(&course_id)).await {
        Ok(roster) if !roster.is_found() => error_response(
            "course roster",
            &AppError::NotFound(format!("course {}", course_id)),
        ),
        result => respond("course roster", result),
    }
}

pub async fn get_assignments_due_next_week(store: web::Data<dyn DocumentStore>) -> HttpResponse {
    log::info!("📚 GET /catalog/assignments/due-next-week");
    respond(
        "assignments due next week",
        catalog_service::assignments_due_next_week(store.get_ref()).await,
    )
}
