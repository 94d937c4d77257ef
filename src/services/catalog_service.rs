//! Plain reads over the catalog: active students, course listings and
//! searches, rosters and upcoming assignments.

use chrono::{DateTime, Duration, Utc};
use mongodb::bson::{self, Bson, Document};

use super::decode_lenient;
use crate::database::collections::{ASSIGNMENTS, COURSES, ENROLLMENTS, USERS};
use crate::database::DocumentStore;
use crate::models::{
    AssignmentRecord, CourseRecord, CourseRoster, CourseWithInstructor, StudentSummary, UserRecord,
};
use crate::pipeline::value::bson_date;
use crate::pipeline::{Filter, JoinKind, Pipeline, Projection};
use crate::utils::error::AppError;

async fn find_typed<T: serde::de::DeserializeOwned>(
    store: &dyn DocumentStore,
    collection: &str,
    filter: &Filter,
) -> Result<Vec<T>, AppError> {
    let docs = store.find(collection, filter).await?;
    Ok(decode_lenient(collection, docs))
}

pub async fn find_active_students(store: &dyn DocumentStore) -> Result<Vec<UserRecord>, AppError> {
    let filter = Filter::eq("role", "student").and(Filter::eq("isActive", true));
    find_typed(store, USERS, &filter).await
}

/// Courses paired with their instructor. Courses whose instructor is
/// missing are left out.
pub async fn courses_with_instructors(
    store: &dyn DocumentStore,
) -> Result<Vec<CourseWithInstructor>, AppError> {
    let pipeline = Pipeline::new().join(USERS, "instructorId", "_id", "instructor", JoinKind::Inner);
    let docs = store.run_pipeline(COURSES, &pipeline).await?;

    let mut courses = Vec::with_capacity(docs.len());
    for mut doc in docs {
        let instructor = match doc.remove("instructor") {
            Some(Bson::Document(instructor)) => instructor,
            _ => continue,
        };
        match (
            bson::from_document::<CourseRecord>(doc),
            bson::from_document::<UserRecord>(instructor),
        ) {
            (Ok(course), Ok(instructor)) => courses.push(CourseWithInstructor { course, instructor }),
            (Err(e), _) | (_, Err(e)) => log::warn!("Skipping malformed course: {}", e),
        }
    }
    Ok(courses)
}

pub async fn courses_by_category(store: &dyn DocumentStore, category: &str) -> Result<Vec<CourseRecord>, AppError> {
    find_typed(store, COURSES, &Filter::eq("category", category)).await
}

/// Title and students of one course. Returns [`CourseRoster::not_found`]
/// when the course doesn't exist.
pub async fn students_in_course(
    store: &dyn DocumentStore,
    course_id: impl Into<Bson>,
) -> Result<CourseRoster, AppError> {
    let course_id = course_id.into();
    let Some(course) = store
        .find_one(COURSES, &Filter::eq("_id", course_id.clone()))
        .await?
    else {
        log::debug!("students_in_course: course {} not found", course_id);
        return Ok(CourseRoster::not_found());
    };

    let pipeline = Pipeline::new()
        .filter(Filter::eq("courseId", course_id))
        .join(USERS, "studentId", "_id", "student", JoinKind::Inner)
        .project(vec![
            ("_id", Projection::Exclude),
            ("student._id", Projection::Include),
            ("student.firstName", Projection::Include),
            ("student.lastName", Projection::Include),
            ("student.email", Projection::Include),
        ]);
    let rows = store.run_pipeline(ENROLLMENTS, &pipeline).await?;
    let students: Vec<Document> = rows
        .into_iter()
        .filter_map(|mut row| match row.remove("student") {
            Some(Bson::Document(student)) => Some(student),
            _ => None,
        })
        .collect();

    Ok(CourseRoster {
        course_title: Some(course.get_str("title").unwrap_or_default().to_string()),
        students: decode_lenient::<StudentSummary>(ENROLLMENTS, students),
    })
}

/// Case-insensitive substring match on the title.
pub async fn search_courses_by_title(store: &dyn DocumentStore, keyword: &str) -> Result<Vec<CourseRecord>, AppError> {
    find_typed(store, COURSES, &Filter::contains("title", keyword)).await
}

/// Inclusive on both ends.
pub async fn courses_in_price_range(
    store: &dyn DocumentStore,
    min_price: f64,
    max_price: f64,
) -> Result<Vec<CourseRecord>, AppError> {
    if min_price > max_price {
        return Err(AppError::InvalidRequest(format!(
            "price range {}..{} is empty",
            min_price, max_price
        )));
    }
    find_typed(store, COURSES, &Filter::between("price", min_price, max_price)).await
}

pub async fn recent_users(store: &dyn DocumentStore, months: u32) -> Result<Vec<UserRecord>, AppError> {
    recent_users_at(store, months, Utc::now()).await
}

/// Users who joined within `months` 30-day months before `now`.
pub async fn recent_users_at(
    store: &dyn DocumentStore,
    months: u32,
    now: DateTime<Utc>,
) -> Result<Vec<UserRecord>, AppError> {
    let cutoff = Duration::try_days(30 * i64::from(months))
        .and_then(|window| now.checked_sub_signed(window))
        .ok_or_else(|| AppError::InvalidRequest(format!("{} months is out of range", months)))?;
    find_typed(store, USERS, &Filter::gte("dateJoined", bson_date(&cutoff))).await
}

/// Courses carrying at least one of `tags`.
pub async fn courses_by_tags(store: &dyn DocumentStore, tags: &[String]) -> Result<Vec<CourseRecord>, AppError> {
    find_typed(store, COURSES, &Filter::one_of("tags", tags.iter().map(String::as_str))).await
}

pub async fn assignments_due_next_week(store: &dyn DocumentStore) -> Result<Vec<AssignmentRecord>, AppError> {
    assignments_due_next_week_at(store, Utc::now()).await
}

pub async fn assignments_due_next_week_at(
    store: &dyn DocumentStore,
    now: DateTime<Utc>,
) -> Result<Vec<AssignmentRecord>, AppError> {
    let next_week = now + Duration::days(7);
    let filter = Filter::between("dueDate", bson_date(&now), bson_date(&next_week));
    find_typed(store, ASSIGNMENTS, &filter).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Assignment, Course, Role, User};
    use crate::services::document_service::{insert_assignment, insert_course, insert_user};
    use chrono::TimeZone;
    use mongodb::bson::doc;

    fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, 9, 0, 0).unwrap()
    }

    async fn catalog() -> crate::database::MemoryStore {
        let store = crate::database::MemoryStore::new();
        let mut grace = User::new("Grace", "Hopper", "grace@example.com", Role::Instructor).with_id("U1");
        grace.date_joined = mongodb::bson::DateTime::from_millis(at(2023, 1, 1).timestamp_millis());
        insert_user(&store, &grace).await.unwrap();

        let mut ada = User::new("Ada", "Lovelace", "ada@example.com", Role::Student).with_id("S1");
        ada.date_joined = mongodb::bson::DateTime::from_millis(at(2024, 5, 20).timestamp_millis());
        insert_user(&store, &ada).await.unwrap();

        let mut alan = User::new("Alan", "Turing", "alan@example.com", Role::Student).with_id("S2");
        alan.is_active = false;
        insert_user(&store, &alan).await.unwrap();

        for course in [
            Course::new("Python for Data", "U1", "Data", 49.0).with_id("C1").with_tags(&["python", "data"]),
            Course::new("Advanced PYTHON", "U1", "Programming", 120.0).with_id("C2").with_tags(&["python"]),
            Course::new("Orphan Course", "U404", "Data", 10.0).with_id("C3"),
        ] {
            insert_course(&store, &course).await.unwrap();
        }
        store
            .insert_one(ENROLLMENTS, doc! { "studentId": "S1", "courseId": "C1" })
            .await
            .unwrap();
        store
            .insert_one(ENROLLMENTS, doc! { "studentId": "S404", "courseId": "C1" })
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn active_students_exclude_instructors_and_deactivated_users() {
        let store = catalog().await;
        let students = find_active_students(&store).await.unwrap();
        assert_eq!(students.len(), 1);
        assert_eq!(students[0].first_name.as_deref(), Some("Ada"));
    }

    #[tokio::test]
    async fn courses_join_their_instructor() {
        let store = catalog().await;
        let courses = courses_with_instructors(&store).await.unwrap();
        assert_eq!(courses.len(), 2);
        assert!(courses.iter().all(|c| c.instructor.last_name.as_deref() == Some("Hopper")));
    }

    #[tokio::test]
    async fn roster_lists_known_students_and_flags_missing_courses() {
        let store = catalog().await;

        let roster = students_in_course(&store, "C1").await.unwrap();
        assert_eq!(roster.course_title.as_deref(), Some("Python for Data"));
        assert_eq!(roster.students.len(), 1);
        assert_eq!(roster.students[0].first_name.as_deref(), Some("Ada"));

        let missing = students_in_course(&store, "C999").await.unwrap();
        assert!(!missing.is_found());
        assert!(missing.students.is_empty());
    }

    #[tokio::test]
    async fn course_searches() {
        let store = catalog().await;

        assert_eq!(search_courses_by_title(&store, "python").await.unwrap().len(), 2);
        assert_eq!(courses_by_category(&store, "Data").await.unwrap().len(), 2);
        assert_eq!(courses_in_price_range(&store, 10.0, 49.0).await.unwrap().len(), 2);
        assert!(courses_in_price_range(&store, 50.0, 10.0).await.is_err());

        let tagged = courses_by_tags(&store, &["data".to_string()]).await.unwrap();
        assert_eq!(tagged.len(), 1);
        assert_eq!(tagged[0].title.as_deref(), Some("Python for Data"));
    }

    #[tokio::test]
    async fn date_windows() {
        let store = catalog().await;

        let recent = recent_users_at(&store, 3, at(2024, 6, 1)).await.unwrap();
        assert!(recent.iter().any(|u| u.first_name.as_deref() == Some("Ada")));
        assert!(recent.iter().all(|u| u.first_name.as_deref() != Some("Grace")));

        let now = at(2024, 6, 1);
        for (title, due) in [("Soon", at(2024, 6, 5)), ("Later", at(2024, 6, 20))] {
            let assignment = Assignment::new("C1", title, mongodb::bson::DateTime::from_millis(due.timestamp_millis()));
            insert_assignment(&store, &assignment).await.unwrap();
        }
        let due = assignments_due_next_week_at(&store, now).await.unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].title.as_deref(), Some("Soon"));
    }

    #[tokio::test]
    async fn listings_keep_documents_with_missing_fields() {
        let store = catalog().await;
        store
            .insert_one(COURSES, doc! { "title": "Python Basics", "price": 10.0 })
            .await
            .unwrap();
        store
            .insert_one(USERS, doc! { "firstName": "Linus", "role": "student", "isActive": true })
            .await
            .unwrap();

        let found = search_courses_by_title(&store, "basics").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].category, None);
        assert_eq!(found[0].price, Some(10.0));

        let students = find_active_students(&store).await.unwrap();
        assert_eq!(students.len(), 2);
        assert!(students
            .iter()
            .any(|s| s.first_name.as_deref() == Some("Linus") && s.date_joined.is_none()));
    }

    #[tokio::test]
    async fn decimal_prices_filter_by_value() {
        let store = crate::database::MemoryStore::new();
        for (id, price) in [("C1", "5.00"), ("C2", "999.00"), ("C3", "15.50")] {
            store
                .insert_one(
                    COURSES,
                    doc! { "_id": id, "title": id, "price": Bson::Decimal128(price.parse().unwrap()) },
                )
                .await
                .unwrap();
        }
        let in_range = courses_in_price_range(&store, 10.0, 20.0).await.unwrap();
        assert_eq!(in_range.len(), 1);
        assert_eq!(in_range[0].price, Some(15.5));
    }
}
