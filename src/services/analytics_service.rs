//! Named analytics queries. Each one is a fixed composition of pipeline
//! stages executed by whichever store the caller hands in.
//!
//! Joins are explicit about orphans: every query here uses
//! [`JoinKind::Inner`], so records whose foreign key resolves to nothing
//! are dropped from the result.

use chrono::{DateTime, Months, Utc};
use super::decode;
use crate::database::collections::{COURSES, ENROLLMENTS, SUBMISSIONS, USERS};
use crate::database::DocumentStore;
use crate::models::{
    CategoryCourses, CategoryPopularity, EnrollmentStat, InstructorRating, InstructorRevenue,
    InstructorStudents, MonthlyEnrollment, StudentAverageGrade, StudentEngagement, TopStudent,
};
use crate::pipeline::value::{as_f64, bson_date};
use crate::pipeline::{
    Accumulator, Expr, Filter, GroupKey, JoinKind, Pipeline, Projection, SortOrder,
};
use crate::utils::error::AppError;

fn full_name(prefix: &str) -> Expr {
    Expr::concat(vec![
        Expr::field(&format!("{}.firstName", prefix)),
        Expr::lit(" "),
        Expr::field(&format!("{}.lastName", prefix)),
    ])
}

pub(crate) fn enrollment_stats_pipeline() -> Pipeline {
    Pipeline::new()
        .group(
            GroupKey::field("courseId"),
            vec![("totalEnrollments", Accumulator::Count)],
        )
        .join(COURSES, "_id", "_id", "course", JoinKind::Inner)
        .project(vec![
            ("_id", Projection::Exclude),
            ("courseId", Projection::from_field("_id")),
            ("courseTitle", Projection::from_field("course.title")),
            ("totalEnrollments", Projection::Include),
        ])
}

/// Enrollment count per course, with the course title. Enrollments that
/// point at a missing course are not reported.
pub async fn enrollment_stats(store: &dyn DocumentStore) -> Result<Vec<EnrollmentStat>, AppError> {
    let docs = store
        .run_pipeline(ENROLLMENTS, &enrollment_stats_pipeline())
        .await?;
    log::debug!("enrollment_stats: {} courses", docs.len());
    decode(docs)
}

/// Mean rating over every rated course; `None` when no course is rated.
pub async fn average_course_rating(store: &dyn DocumentStore) -> Result<Option<f64>, AppError> {
    let pipeline = Pipeline::new().group(
        GroupKey::Null,
        vec![("averageRating", Accumulator::avg("rating"))],
    );
    let docs = store.run_pipeline(COURSES, &pipeline).await?;
    Ok(docs
        .first()
        .and_then(|doc| doc.get("averageRating"))
        .and_then(as_f64))
}

pub async fn courses_by_category(store: &dyn DocumentStore) -> Result<Vec<CategoryCourses>, AppError> {
    let pipeline = Pipeline::new()
        .group(
            GroupKey::field("category"),
            vec![
                ("count", Accumulator::Count),
                ("courses", Accumulator::push("title")),
            ],
        )
        .project(vec![
            ("_id", Projection::Exclude),
            ("category", Projection::from_field("_id")),
            ("count", Projection::Include),
            ("courses", Projection::Include),
        ]);
    decode(store.run_pipeline(COURSES, &pipeline).await?)
}

/// Average grade per student over graded submissions only, rounded to two
/// decimals and sorted best first.
pub async fn avg_grade_per_student(
    store: &dyn DocumentStore,
) -> Result<Vec<StudentAverageGrade>, AppError> {
    let pipeline = Pipeline::new()
        .filter(Filter::not_null("grade"))
        .group(
            GroupKey::field("studentId"),
            vec![("averageGrade", Accumulator::avg("grade"))],
        )
        .join(USERS, "_id", "_id", "student", JoinKind::Inner)
        .project(vec![
            ("_id", Projection::Exclude),
            ("studentId", Projection::from_field("_id")),
            ("firstName", Projection::from_field("student.firstName")),
            ("lastName", Projection::from_field("student.lastName")),
            (
                "averageGrade",
                Projection::Computed(Expr::field("averageGrade").round(2)),
            ),
        ])
        .sort(vec![("averageGrade", SortOrder::Descending)]);
    decode(store.run_pipeline(SUBMISSIONS, &pipeline).await?)
}

pub(crate) fn top_students_pipeline(limit: u64) -> Pipeline {
    Pipeline::new()
        .filter(Filter::not_null("grade"))
        .group(
            GroupKey::field("studentId"),
            vec![
                ("averageGrade", Accumulator::avg("grade")),
                ("submissionCount", Accumulator::Count),
            ],
        )
        .sort(vec![("averageGrade", SortOrder::Descending)])
        .limit(limit)
        .join(USERS, "_id", "_id", "student", JoinKind::Inner)
        .project(vec![
            ("_id", Projection::Exclude),
            ("studentId", Projection::from_field("_id")),
            (
                "averageGrade",
                Projection::Computed(Expr::field("averageGrade").round(2)),
            ),
            ("submissionCount", Projection::Include),
            ("name", Projection::Computed(full_name("student"))),
        ])
}

/// The `limit` best students by average grade. The limit applies before
/// the user join, so students without a user record shrink the result.
/// Order among equal averages is unspecified.
pub async fn top_performing_students(
    store: &dyn DocumentStore,
    limit: u64,
) -> Result<Vec<TopStudent>, AppError> {
    if limit == 0 {
        return Ok(Vec::new());
    }
    decode(
        store
            .run_pipeline(SUBMISSIONS, &top_students_pipeline(limit))
            .await?,
    )
}

/// Distinct enrolled students across each instructor's courses.
pub async fn total_students_per_instructor(
    store: &dyn DocumentStore,
) -> Result<Vec<InstructorStudents>, AppError> {
    let pipeline = Pipeline::new()
        .join(ENROLLMENTS, "_id", "courseId", "enrollments", JoinKind::Inner)
        .group(
            GroupKey::field("instructorId"),
            vec![(
                "totalStudents",
                Accumulator::add_to_set("enrollments.studentId"),
            )],
        )
        .project(vec![
            ("_id", Projection::Exclude),
            ("instructorId", Projection::from_field("_id")),
            (
                "totalStudents",
                Projection::Computed(Expr::field("totalStudents").size()),
            ),
        ]);
    decode(store.run_pipeline(COURSES, &pipeline).await?)
}

pub async fn avg_rating_per_instructor(
    store: &dyn DocumentStore,
) -> Result<Vec<InstructorRating>, AppError> {
    let pipeline = Pipeline::new()
        .filter(Filter::not_null("rating"))
        .group(
            GroupKey::field("instructorId"),
            vec![("avgRating", Accumulator::avg("rating"))],
        )
        .project(vec![
            ("_id", Projection::Exclude),
            ("instructorId", Projection::from_field("_id")),
            ("avgRating", Projection::Include),
        ]);
    decode(store.run_pipeline(COURSES, &pipeline).await?)
}

/// Course price summed once per enrollment: a course priced P with E
/// enrollments adds P * E to its instructor's revenue.
pub async fn revenue_per_instructor(
    store: &dyn DocumentStore,
) -> Result<Vec<InstructorRevenue>, AppError> {
    let pipeline = Pipeline::new()
        .join(ENROLLMENTS, "_id", "courseId", "enrollments", JoinKind::Inner)
        .group(
            GroupKey::field("instructorId"),
            vec![("revenue", Accumulator::sum("price"))],
        )
        .project(vec![
            ("_id", Projection::Exclude),
            ("instructorId", Projection::from_field("_id")),
            ("revenue", Projection::Include),
        ]);
    decode(store.run_pipeline(COURSES, &pipeline).await?)
}

pub(crate) fn monthly_trends_pipeline(from: DateTime<Utc>, to: DateTime<Utc>) -> Pipeline {
    Pipeline::new()
        .filter(Filter::between("enrolledAt", bson_date(&from), bson_date(&to)))
        .group(
            GroupKey::composite(vec![
                ("year", Expr::field("enrolledAt").year()),
                ("month", Expr::field("enrolledAt").month()),
            ]),
            vec![("enrollments", Accumulator::Count)],
        )
        .sort(vec![
            ("_id.year", SortOrder::Ascending),
            ("_id.month", SortOrder::Ascending),
        ])
        .project(vec![
            ("_id", Projection::Exclude),
            ("year", Projection::from_field("_id.year")),
            ("month", Projection::from_field("_id.month")),
            ("enrollments", Projection::Include),
        ])
}

/// Enrollments per calendar month over the trailing `months` months.
pub async fn monthly_enrollment_trends(
    store: &dyn DocumentStore,
    months: u32,
) -> Result<Vec<MonthlyEnrollment>, AppError> {
    monthly_enrollment_trends_at(store, months, Utc::now()).await
}

/// Same as [`monthly_enrollment_trends`] with an explicit "now". The window
/// is `[now - months, now]` using calendar-month subtraction.
pub async fn monthly_enrollment_trends_at(
    store: &dyn DocumentStore,
    months: u32,
    now: DateTime<Utc>,
) -> Result<Vec<MonthlyEnrollment>, AppError> {
    let start = now.checked_sub_months(Months::new(months)).ok_or_else(|| {
        AppError::InvalidRequest(format!("{} months reaches before the supported range", months))
    })?;
    log::debug!("monthly_enrollment_trends: window {} .. {}", start, now);
    decode(
        store
            .run_pipeline(ENROLLMENTS, &monthly_trends_pipeline(start, now))
            .await?,
    )
}

/// Categories ranked by how many enrollments their courses received.
pub async fn most_popular_categories(
    store: &dyn DocumentStore,
) -> Result<Vec<CategoryPopularity>, AppError> {
    let pipeline = Pipeline::new()
        .join(COURSES, "courseId", "_id", "course", JoinKind::Inner)
        .group(
            GroupKey::field("course.category"),
            vec![("enrollmentCount", Accumulator::Count)],
        )
        .sort(vec![("enrollmentCount", SortOrder::Descending)])
        .project(vec![
            ("_id", Projection::Exclude),
            ("category", Projection::from_field("_id")),
            ("enrollmentCount", Projection::Include),
        ]);
    decode(store.run_pipeline(ENROLLMENTS, &pipeline).await?)
}

/// Submission count and rounded average grade per student. Ungraded
/// submissions count as submitted but don't affect the average.
pub async fn student_engagement_metrics(
    store: &dyn DocumentStore,
) -> Result<Vec<StudentEngagement>, AppError> {
    let pipeline = Pipeline::new()
        .group(
            GroupKey::field("studentId"),
            vec![
                ("assignmentsSubmitted", Accumulator::Count),
                ("averageGrade", Accumulator::avg("grade")),
            ],
        )
        .join(USERS, "_id", "_id", "student", JoinKind::Inner)
        .project(vec![
            ("_id", Projection::Exclude),
            ("studentId", Projection::from_field("_id")),
            ("name", Projection::Computed(full_name("student"))),
            ("assignmentsSubmitted", Projection::Include),
            (
                "averageGrade",
                Projection::Computed(Expr::field("averageGrade").round(2)),
            ),
        ]);
    decode(store.run_pipeline(SUBMISSIONS, &pipeline).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryStore;
    use chrono::TimeZone;
    use mongodb::bson::{self, doc, Bson, Document};

    async fn seed(store: &MemoryStore, collection: &str, docs: Vec<Document>) {
        for doc in docs {
            store.insert_one(collection, doc).await.unwrap();
        }
    }

    fn at(year: i32, month: u32, day: u32) -> bson::DateTime {
        let ts = Utc.with_ymd_and_hms(year, month, day, 12, 0, 0).unwrap();
        bson::DateTime::from_millis(ts.timestamp_millis())
    }

    async fn school() -> MemoryStore {
        let store = MemoryStore::new();
        seed(
            &store,
            USERS,
            vec![
                doc! { "_id": "U1", "firstName": "Grace", "lastName": "Hopper", "role": "instructor" },
                doc! { "_id": "S1", "firstName": "Ada", "lastName": "Lovelace", "role": "student" },
                doc! { "_id": "S2", "firstName": "Alan", "lastName": "Turing", "role": "student" },
                doc! { "_id": "S3", "firstName": "Edsger", "role": "student" },
            ],
        )
        .await;
        seed(
            &store,
            COURSES,
            vec![
                doc! { "_id": "C1", "title": "Rust", "instructorId": "U1", "category": "Systems", "price": 100.0, "rating": 4.0 },
                doc! { "_id": "C2", "title": "SQL", "instructorId": "U1", "category": "Data", "price": 40.0, "rating": 5.0 },
                doc! { "_id": "C3", "title": "Pandas", "instructorId": "U2", "category": "Data", "price": 20.0 },
            ],
        )
        .await;
        seed(
            &store,
            ENROLLMENTS,
            vec![
                doc! { "studentId": "S1", "courseId": "C1", "enrolledAt": at(2024, 1, 10) },
                doc! { "studentId": "S2", "courseId": "C1", "enrolledAt": at(2024, 2, 3) },
                doc! { "studentId": "S3", "courseId": "C1", "enrolledAt": at(2024, 2, 20) },
                doc! { "studentId": "S1", "courseId": "C2", "enrolledAt": at(2024, 3, 1) },
                doc! { "studentId": "S2", "courseId": "C404", "enrolledAt": at(2024, 3, 2) },
            ],
        )
        .await;
        seed(
            &store,
            SUBMISSIONS,
            vec![
                doc! { "studentId": "S1", "assignmentId": "A1", "grade": 90 },
                doc! { "studentId": "S1", "assignmentId": "A2", "grade": 75.5 },
                doc! { "studentId": "S2", "assignmentId": "A1", "grade": Bson::Null },
                doc! { "studentId": "S2", "assignmentId": "A2", "grade": 60 },
                doc! { "studentId": "S3", "assignmentId": "A1", "grade": 99 },
            ],
        )
        .await;
        store
    }

    #[tokio::test]
    async fn enrollment_stats_drop_orphaned_courses() {
        let store = school().await;
        let stats = enrollment_stats(&store).await.unwrap();

        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].course_id, Bson::String("C1".into()));
        assert_eq!(stats[0].course_title.as_deref(), Some("Rust"));
        assert_eq!(stats[0].total_enrollments, 3);
        assert!(stats.iter().all(|s| s.course_id != Bson::String("C404".into())));
    }

    #[tokio::test]
    async fn average_course_rating_ignores_unrated_courses() {
        let store = school().await;
        assert_eq!(average_course_rating(&store).await.unwrap(), Some(4.5));

        let empty = MemoryStore::new();
        seed(&empty, COURSES, vec![doc! { "title": "Unrated" }]).await;
        assert_eq!(average_course_rating(&empty).await.unwrap(), None);
    }

    #[tokio::test]
    async fn courses_are_grouped_by_category() {
        let store = school().await;
        let groups = courses_by_category(&store).await.unwrap();

        let data = groups
            .iter()
            .find(|g| g.category.as_deref() == Some("Data"))
            .unwrap();
        assert_eq!(data.count, 2);
        assert_eq!(data.courses, vec!["SQL".to_string(), "Pandas".to_string()]);
    }

    #[tokio::test]
    async fn average_grades_skip_ungraded_submissions() {
        let store = school().await;
        let grades = avg_grade_per_student(&store).await.unwrap();

        let averages: Vec<Option<f64>> = grades.iter().map(|g| g.average_grade).collect();
        assert_eq!(averages, vec![Some(99.0), Some(82.75), Some(60.0)]);
        assert_eq!(grades[1].first_name.as_deref(), Some("Ada"));
        assert_eq!(grades[2].student_id, Bson::String("S2".into()));
    }

    #[tokio::test]
    async fn top_students_respect_the_limit() {
        let store = school().await;
        let top = top_performing_students(&store, 2).await.unwrap();

        assert_eq!(top.len(), 2);
        assert_eq!(top[0].student_id, Bson::String("S3".into()));
        assert_eq!(top[0].name, None);
        assert_eq!(top[1].name.as_deref(), Some("Ada Lovelace"));
        assert_eq!(top[1].submission_count, 2);
        assert!(top_performing_students(&store, 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn instructor_rollups() {
        let store = school().await;

        let students = total_students_per_instructor(&store).await.unwrap();
        assert_eq!(students.len(), 1);
        assert_eq!(students[0].total_students, 3);

        let ratings = avg_rating_per_instructor(&store).await.unwrap();
        assert_eq!(ratings.len(), 1);
        assert_eq!(ratings[0].avg_rating, Some(4.5));

        let revenue = revenue_per_instructor(&store).await.unwrap();
        assert_eq!(revenue.len(), 1);
        assert_eq!(revenue[0].revenue, 340.0);
    }

    #[tokio::test]
    async fn monthly_trends_stay_inside_the_window() {
        let store = school().await;
        let now = Utc.with_ymd_and_hms(2024, 3, 15, 0, 0, 0).unwrap();
        let trends = monthly_enrollment_trends_at(&store, 1, now).await.unwrap();

        assert_eq!(
            trends,
            vec![
                MonthlyEnrollment { year: 2024, month: 2, enrollments: 1 },
                MonthlyEnrollment { year: 2024, month: 3, enrollments: 2 },
            ]
        );
    }

    #[tokio::test]
    async fn categories_rank_by_enrollments() {
        let store = school().await;
        let popular = most_popular_categories(&store).await.unwrap();

        assert_eq!(popular[0].category.as_deref(), Some("Systems"));
        assert_eq!(popular[0].enrollment_count, 3);
        assert_eq!(popular[1].enrollment_count, 1);
    }

    #[tokio::test]
    async fn engagement_counts_ungraded_work() {
        let store = school().await;
        let engagement = student_engagement_metrics(&store).await.unwrap();

        let alan = engagement
            .iter()
            .find(|e| e.student_id == Bson::String("S2".into()))
            .unwrap();
        assert_eq!(alan.assignments_submitted, 2);
        assert_eq!(alan.average_grade, Some(60.0));
        assert_eq!(alan.name.as_deref(), Some("Alan Turing"));
    }
}
