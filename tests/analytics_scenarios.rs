use chrono::{TimeZone, Utc};
use mongodb::bson::{doc, Bson, DateTime, Document};

use eduhub_analytics::database::collections::{ASSIGNMENTS, COURSES, ENROLLMENTS, SUBMISSIONS, USERS};
use eduhub_analytics::database::{DocumentStore, MemoryStore};
use eduhub_analytics::pipeline::Filter;
use eduhub_analytics::services::{
    analytics_service, completion_service, document_service,
};

async fn seed(store: &MemoryStore, collection: &str, docs: Vec<Document>) {
    for doc in docs {
        store.insert_one(collection, doc).await.unwrap();
    }
}

fn id(s: &str) -> Bson {
    Bson::String(s.to_string())
}

#[tokio::test]
async fn enrollments_for_missing_courses_are_not_reported() {
    let store = MemoryStore::new();
    seed(&store, COURSES, vec![doc! { "_id": "C1", "title": "Rust", "price": 50.0 }]).await;
    seed(
        &store,
        ENROLLMENTS,
        vec![
            doc! { "studentId": "S1", "courseId": "C1" },
            doc! { "studentId": "S1", "courseId": "GONE" },
            doc! { "studentId": "S2", "courseId": "GONE" },
        ],
    )
    .await;

    let stats = analytics_service::enrollment_stats(&store).await.unwrap();
    assert_eq!(stats.len(), 1);
    assert_eq!(stats[0].course_id, id("C1"));
    assert_eq!(stats[0].total_enrollments, 1);
}

#[tokio::test]
async fn average_grades_exclude_nulls_and_round_to_two_places() {
    let store = MemoryStore::new();
    seed(&store, USERS, vec![doc! { "_id": "S1", "firstName": "Ada", "lastName": "Lovelace" }]).await;
    seed(
        &store,
        SUBMISSIONS,
        vec![
            doc! { "studentId": "S1", "assignmentId": "A1", "grade": 80 },
            doc! { "studentId": "S1", "assignmentId": "A2", "grade": 85 },
            doc! { "studentId": "S1", "assignmentId": "A3", "grade": 86 },
            doc! { "studentId": "S1", "assignmentId": "A4", "grade": Bson::Null },
            doc! { "studentId": "S1", "assignmentId": "A5" },
        ],
    )
    .await;

    let grades = analytics_service::avg_grade_per_student(&store).await.unwrap();
    assert_eq!(grades.len(), 1);
    assert_eq!(grades[0].average_grade, Some(83.67));
}

#[tokio::test]
async fn completion_rate_counts_each_student_once() {
    let store = MemoryStore::new();
    seed(&store, COURSES, vec![doc! { "_id": "C1", "price": 50 }]).await;
    seed(&store, ASSIGNMENTS, vec![doc! { "_id": "A1", "courseId": "C1" }]).await;
    seed(
        &store,
        ENROLLMENTS,
        vec![
            doc! { "courseId": "C1", "studentId": "S1" },
            doc! { "courseId": "C1", "studentId": "S2" },
        ],
    )
    .await;
    seed(
        &store,
        SUBMISSIONS,
        vec![doc! { "studentId": "S1", "assignmentId": "A1", "grade": 80 }],
    )
    .await;

    let rates = completion_service::completion_rate_by_course(&store).await.unwrap();
    assert_eq!(rates.len(), 1);
    assert_eq!(rates[0].course_id, id("C1"));
    assert_eq!(rates[0].enrolled, 2);
    assert_eq!(rates[0].submitted, 1);
    assert_eq!(rates[0].completion_rate, 50.0);
}

#[tokio::test]
async fn courses_with_submissions_but_no_enrollments_are_left_out() {
    let store = MemoryStore::new();
    seed(&store, ASSIGNMENTS, vec![doc! { "_id": "A9", "courseId": "C9" }]).await;
    seed(
        &store,
        SUBMISSIONS,
        vec![doc! { "studentId": "S1", "assignmentId": "A9", "grade": 70 }],
    )
    .await;

    let rates = completion_service::completion_rate_by_course(&store).await.unwrap();
    assert!(rates.is_empty());
}

#[tokio::test]
async fn revenue_counts_price_once_per_enrollment() {
    let store = MemoryStore::new();
    seed(&store, COURSES, vec![doc! { "_id": "C1", "instructorId": "U1", "price": 100 }]).await;
    seed(
        &store,
        ENROLLMENTS,
        vec![
            doc! { "courseId": "C1", "studentId": "S1" },
            doc! { "courseId": "C1", "studentId": "S2" },
            doc! { "courseId": "C1", "studentId": "S3" },
        ],
    )
    .await;

    let revenue = analytics_service::revenue_per_instructor(&store).await.unwrap();
    assert_eq!(revenue.len(), 1);
    assert_eq!(revenue[0].instructor_id, id("U1"));
    assert_eq!(revenue[0].revenue, 300.0);
}

#[tokio::test]
async fn revenue_sums_decimal_prices() {
    let store = MemoryStore::new();
    let price = |s: &str| Bson::Decimal128(s.parse().unwrap());
    seed(
        &store,
        COURSES,
        vec![
            doc! { "_id": "C1", "instructorId": "U1", "price": price("5.00") },
            doc! { "_id": "C2", "instructorId": "U2", "price": price("999.00") },
        ],
    )
    .await;
    seed(&store, ENROLLMENTS, vec![doc! { "courseId": "C2", "studentId": "S1" }]).await;

    let revenue = analytics_service::revenue_per_instructor(&store).await.unwrap();
    assert_eq!(revenue.len(), 1);
    assert_eq!(revenue[0].instructor_id, id("U2"));
    assert_eq!(revenue[0].revenue, 999.0);

    let cheap = store
        .find(COURSES, &Filter::between("price", 10.0, 20.0))
        .await
        .unwrap();
    assert!(cheap.is_empty());
}

#[tokio::test]
async fn nan_averages_sort_after_real_grades() {
    let store = MemoryStore::new();
    seed(
        &store,
        USERS,
        vec![
            doc! { "_id": "S1", "firstName": "Ada", "lastName": "Lovelace" },
            doc! { "_id": "S2", "firstName": "Alan", "lastName": "Turing" },
            doc! { "_id": "S3", "firstName": "Grace", "lastName": "Hopper" },
            doc! { "_id": "S4", "firstName": "Edsger", "lastName": "Dijkstra" },
        ],
    )
    .await;
    seed(
        &store,
        SUBMISSIONS,
        vec![
            doc! { "studentId": "S1", "grade": 70.0 },
            doc! { "studentId": "S2", "grade": f64::NAN },
            doc! { "studentId": "S3", "grade": 95.0 },
            doc! { "studentId": "S4", "grade": 80.0 },
        ],
    )
    .await;

    let grades = analytics_service::avg_grade_per_student(&store).await.unwrap();
    let ids: Vec<Bson> = grades.iter().map(|g| g.student_id.clone()).collect();
    assert_eq!(ids, vec![id("S3"), id("S4"), id("S1"), id("S2")]);
    assert!(grades[3].average_grade.is_some_and(f64::is_nan));
}

#[tokio::test]
async fn top_students_are_bounded_and_sorted() {
    let store = MemoryStore::new();
    let mut users = Vec::new();
    let mut submissions = Vec::new();
    for (n, grade) in [72, 95, 88, 60, 91, 79].into_iter().enumerate() {
        let student = format!("S{}", n);
        users.push(doc! { "_id": student.as_str(), "firstName": "Student", "lastName": n.to_string() });
        submissions.push(doc! { "studentId": student.as_str(), "assignmentId": "A1", "grade": grade });
    }
    seed(&store, USERS, users).await;
    seed(&store, SUBMISSIONS, submissions).await;

    let top = analytics_service::top_performing_students(&store, 3).await.unwrap();
    assert_eq!(top.len(), 3);
    let grades: Vec<f64> = top.iter().filter_map(|s| s.average_grade).collect();
    assert_eq!(grades, vec![95.0, 91.0, 88.0]);

    let all = analytics_service::top_performing_students(&store, 50).await.unwrap();
    assert_eq!(all.len(), 6);
    assert!(all
        .windows(2)
        .all(|pair| pair[0].average_grade >= pair[1].average_grade));
}

#[tokio::test]
async fn monthly_trend_is_ascending_and_windowed() {
    let store = MemoryStore::new();
    let at = |y, m, d| DateTime::from_millis(Utc.with_ymd_and_hms(y, m, d, 8, 0, 0).unwrap().timestamp_millis());
    seed(
        &store,
        ENROLLMENTS,
        vec![
            doc! { "courseId": "C1", "enrolledAt": at(2024, 6, 2) },
            doc! { "courseId": "C1", "enrolledAt": at(2023, 12, 30) },
            doc! { "courseId": "C1", "enrolledAt": at(2024, 1, 15) },
            doc! { "courseId": "C1", "enrolledAt": at(2024, 6, 20) },
            doc! { "courseId": "C1", "enrolledAt": at(2023, 6, 1) },
            doc! { "courseId": "C1", "enrolledAt": at(2024, 9, 1) },
        ],
    )
    .await;

    let now = Utc.with_ymd_and_hms(2024, 6, 30, 0, 0, 0).unwrap();
    let trend = analytics_service::monthly_enrollment_trends_at(&store, 12, now)
        .await
        .unwrap();

    let months: Vec<(i32, u32, i64)> = trend.iter().map(|m| (m.year, m.month, m.enrollments)).collect();
    assert_eq!(months, vec![(2023, 12, 1), (2024, 1, 1), (2024, 6, 2)]);
}

#[tokio::test]
async fn soft_delete_twice_modifies_once_and_keeps_the_user() {
    let store = MemoryStore::new();
    seed(&store, USERS, vec![doc! { "_id": "S1", "role": "student", "isActive": true }]).await;

    assert_eq!(document_service::soft_delete_user(&store, "S1").await.unwrap(), 1);
    assert_eq!(document_service::soft_delete_user(&store, "S1").await.unwrap(), 0);

    let users = store.find(USERS, &Filter::All).await.unwrap();
    assert_eq!(users.len(), 1);
    assert!(!users[0].get_bool("isActive").unwrap());
}

#[tokio::test]
async fn instructor_rating_averages_rated_courses() {
    let store = MemoryStore::new();
    seed(&store, USERS, vec![doc! { "_id": "U1", "role": "instructor" }]).await;
    seed(
        &store,
        COURSES,
        vec![
            doc! { "_id": "C1", "instructorId": "U1", "rating": 4 },
            doc! { "_id": "C2", "instructorId": "U1", "rating": 5 },
            doc! { "_id": "C3", "instructorId": "U1", "rating": Bson::Null },
        ],
    )
    .await;

    let ratings = analytics_service::avg_rating_per_instructor(&store).await.unwrap();
    assert_eq!(ratings.len(), 1);
    assert_eq!(ratings[0].instructor_id, id("U1"));
    assert_eq!(ratings[0].avg_rating, Some(4.5));
}
