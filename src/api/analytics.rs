use actix_web::{web, HttpResponse};
use serde::Deserialize;

use super::respond;
use crate::database::DocumentStore;
use crate::models::{
    CategoryCourses, CategoryPopularity, CompletionRate, EnrollmentStat, InstructorRating,
    InstructorRevenue, InstructorStudents, MonthlyEnrollment, StudentAverageGrade,
    StudentEngagement, TopStudent,
};
use crate::services::{analytics_service, completion_service};

#[derive(Deserialize)]
pub struct TopStudentsQuery {
    pub limit: Option<u64>,
}

#[derive(Deserialize)]
pub struct MonthlyEnrollmentsQuery {
    pub months: Option<u32>,
}

#[utoipa::path(
    get,
    path = "/api/v1/analytics/enrollment-stats",
    tag = "Analytics",
    responses(
        (status = 200, description = "Enrollments per course with title", body = [EnrollmentStat]),
        (status = 500, description = "Store error")
    )
)]
pub async fn get_enrollment_stats(store: web::Data<dyn DocumentStore>) -> HttpResponse {
    log::info!("📊 GET /analytics/enrollment-stats");
    respond(
        "enrollment stats",
        analytics_service::enrollment_stats(store.get_ref()).await,
    )
}

#[utoipa::path(
    get,
    path = "/api/v1/analytics/average-course-rating",
    tag = "Analytics",
    responses(
        (status = 200, description = "Mean rating over rated courses, null when none are rated")
    )
)]
pub async fn get_average_course_rating(store: web::Data<dyn DocumentStore>) -> HttpResponse {
    log::info!("📊 GET /analytics/average-course-rating");
    respond(
        "average course rating",
        analytics_service::average_course_rating(store.get_ref()).await,
    )
}

#[utoipa::path(
    get,
    path = "/api/v1/analytics/courses-by-category",
    tag = "Analytics",
    responses(
        (status = 200, description = "Course titles and counts per category", body = [CategoryCourses])
    )
)]
pub async fn get_courses_by_category(store: web::Data<dyn DocumentStore>) -> HttpResponse {
    log::info!("📊 GET /analytics/courses-by-category");
    respond(
        "courses by category",
        analytics_service::courses_by_category(store.get_ref()).await,
    )
}

#[utoipa::path(
    get,
    path = "/api/v1/analytics/average-grades",
    tag = "Analytics",
    responses(
        (status = 200, description = "Average grade per student, best first", body = [StudentAverageGrade])
    )
)]
pub async fn get_avg_grade_per_student(store: web::Data<dyn DocumentStore>) -> HttpResponse {
    log::info!("📊 GET /analytics/average-grades");
    respond(
        "average grades",
        analytics_service::avg_grade_per_student(store.get_ref()).await,
    )
}

#[utoipa::path(
    get,
    path = "/api/v1/analytics/top-students",
    tag = "Analytics",
    params(
        ("limit" = Option<u64>, Query, description = "Number of students, default 5")
    ),
    responses(
        (status = 200, description = "Best students by average grade", body = [TopStudent])
    )
)]
pub async fn get_top_students(
    store: web::Data<dyn DocumentStore>,
    query: web::Query<TopStudentsQuery>,
) -> HttpResponse {
    let limit = query.limit.unwrap_or(5);
    log::info!("📊 GET /analytics/top-students?limit={}", limit);
    respond(
        "top students",
        analytics_service::top_performing_students(store.get_ref(), limit).await,
    )
}

#[utoipa::path(
    get,
    path = "/api/v1/analytics/instructors/students",
    tag = "Analytics",
    responses(
        (status = 200, description = "Distinct students per instructor", body = [InstructorStudents])
    )
)]
pub async fn get_students_per_instructor(store: web::Data<dyn DocumentStore>) -> HttpResponse {
    log::info!("📊 GET /analytics/instructors/students");
    respond(
        "students per instructor",
        analytics_service::total_students_per_instructor(store.get_ref()).await,
    )
}

#[utoipa::path(
    get,
    path = "/api/v1/analytics/instructors/ratings",
    tag = "Analytics",
    responses(
        (status = 200, description = "Average course rating per instructor", body = [InstructorRating])
    )
)]
pub async fn get_rating_per_instructor(store: web::Data<dyn DocumentStore>) -> HttpResponse {
    log::info!("📊 GET /analytics/instructors/ratings");
    respond(
        "rating per instructor",
        analytics_service::avg_rating_per_instructor(store.get_ref()).await,
    )
}

#[utoipa::path(
    get,
    path = "/api/v1/analytics/instructors/revenue",
    tag = "Analytics",
    responses(
        (status = 200, description = "Course price summed per enrollment, per instructor", body = [InstructorRevenue])
    )
)]
pub async fn get_revenue_per_instructor(store: web::Data<dyn DocumentStore>) -> HttpResponse {
    log::info!("📊 GET /analytics/instructors/revenue");
    respond(
        "revenue per instructor",
        analytics_service::revenue_per_instructor(store.get_ref()).await,
    )
}

#[utoipa::path(
    get,
    path = "/api/v1/analytics/monthly-enrollments",
    tag = "Analytics",
    params(
        ("months" = Option<u32>, Query, description = "Trailing window in months, default 6")
    ),
    responses(
        (status = 200, description = "Enrollments per month, oldest first", body = [MonthlyEnrollment]),
        (status = 400, description = "Window out of range")
    )
)]
pub async fn get_monthly_enrollments(
    store: web::Data<dyn DocumentStore>,
    query: web::Query<MonthlyEnrollmentsQuery>,
) -> HttpResponse {
    let months = query.months.unwrap_or(6);
    log::info!("📊 GET /analytics/monthly-enrollments?months={}", months);
    respond(
        "monthly enrollments",
        analytics_service::monthly_enrollment_trends(store.get_ref(), months).await,
    )
}

#[utoipa::path(
    get,
    path = "/api/v1/analytics/popular-categories",
    tag = "Analytics",
    responses(
        (status = 200, description = "Categories by enrollment count", body = [CategoryPopularity])
    )
)]
pub async fn get_popular_categories(store: web::Data<dyn DocumentStore>) -> HttpResponse {
    log::info!("📊 GET /analytics/popular-categories");
    respond(
        "popular categories",
        analytics_service::most_popular_categories(store.get_ref()).await,
    )
}

#[utoipa::path(
    get,
    path = "/api/v1/analytics/student-engagement",
    tag = "Analytics",
    responses(
        (status = 200, description = "Submissions and average grade per student", body = [StudentEngagement])
    )
)]
pub async fn get_student_engagement(store: web::Data<dyn DocumentStore>) -> HttpResponse {
    log::info!("📊 GET /analytics/student-engagement");
    respond(
        "student engagement",
        analytics_service::student_engagement_metrics(store.get_ref()).await,
    )
}

#[utoipa::path(
    get,
    path = "/api/v1/analytics/completion-rates",
    tag = "Analytics",
    responses(
        (status = 200, description = "Completion rate per course", body = [CompletionRate])
    )
)]
pub async fn get_completion_rates(store: web::Data<dyn DocumentStore>) -> HttpResponse {
    log::info!("📊 GET /analytics/completion-rates");
    respond(
        "completion rates",
        completion_service::completion_rate_by_course(store.get_ref()).await,
    )
}
