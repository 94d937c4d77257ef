use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "EduHub Analytics API",
        version = "1.0.0",
        description = "Analytics over the EduHub course platform.\n\n**Features:**\n- Enrollment, grade, revenue and engagement analytics\n- Completion rate per course\n- Catalog reads and user deactivation\n- Query timing and execution statistics\n- Health monitoring and metrics"
    ),
    paths(
        // Health & Metrics
        crate::api::health::health_check,
        crate::api::metrics::get_metrics,

        // Analytics
        crate::api::analytics::get_enrollment_stats,
        crate::api::analytics::get_average_course_rating,
        crate::api::analytics::get_courses_by_category,
        crate::api::analytics::get_avg_grade_per_student,
        crate::api::analytics::get_top_students,
        crate::api::analytics::get_students_per_instructor,
        crate::api::analytics::get_rating_per_instructor,
        crate::api::analytics::get_revenue_per_instructor,
        crate::api::analytics::get_monthly_enrollments,
        crate::api::analytics::get_popular_categories,
        crate::api::analytics::get_student_engagement,
        crate::api::analytics::get_completion_rates,

        // Catalog
        crate::api::catalog::get_course_roster,
        crate::api::catalog::deactivate_user,

        // Profiler
        crate::api::profiler::time_query,
        crate::api::profiler::explain_query,
    ),
    components(
        schemas(
            // Health & Metrics
            crate::api::health::HealthResponse,
            crate::api::metrics::MetricsResponse,

            // Analytics
            crate::models::EnrollmentStat,
            crate::models::CategoryCourses,
            crate::models::StudentAverageGrade,
            crate::models::TopStudent,
            crate::models::InstructorStudents,
            crate::models::InstructorRating,
            crate::models::InstructorRevenue,
            crate::models::MonthlyEnrollment,
            crate::models::CategoryPopularity,
            crate::models::StudentEngagement,
            crate::models::CompletionRate,

            // Catalog
            crate::models::CourseRoster,
            crate::models::StudentSummary,
            crate::models::Role,

            // Profiler
            crate::api::profiler::ProfileRequest,
            crate::services::profiler_service::QueryTiming,
            crate::services::profiler_service::TimingComparison,
        )
    ),
    tags(
        (name = "Health", description = "Health check and system metrics endpoints for monitoring service status."),
        (name = "Analytics", description = "Aggregated metrics over users, courses, enrollments, assignments and submissions."),
        (name = "Catalog", description = "Course and user listings, rosters and soft deletion."),
        (name = "Profiler", description = "Timing and execution statistics for filtered reads."),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documents_the_analytics_routes() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/v1/analytics/completion-rates"));
        assert!(doc.paths.paths.contains_key("/health"));
    }
}
