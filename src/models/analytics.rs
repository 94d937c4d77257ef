//! Result records produced by the analytics queries.
//!
//! Identifiers are opaque BSON values (string or ObjectId) and are carried
//! through unchanged from the source documents.

use mongodb::bson::Bson;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentStat {
    #[schema(value_type = Object)]
    pub course_id: Bson,
    #[serde(default)]
    pub course_title: Option<String>,
    pub total_enrollments: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CategoryCourses {
    #[serde(default)]
    pub category: Option<String>,
    pub count: i64,
    #[serde(default)]
    pub courses: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StudentAverageGrade {
    #[schema(value_type = Object)]
    pub student_id: Bson,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    /// Rounded to two decimals.
    #[serde(default)]
    pub average_grade: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TopStudent {
    #[schema(value_type = Object)]
    pub student_id: Bson,
    /// "first last"; absent when either part is missing.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub average_grade: Option<f64>,
    pub submission_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InstructorStudents {
    #[schema(value_type = Object)]
    pub instructor_id: Bson,
    pub total_students: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InstructorRating {
    #[schema(value_type = Object)]
    pub instructor_id: Bson,
    #[serde(default, deserialize_with = "super::lenient_number")]
    pub avg_rating: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InstructorRevenue {
    #[schema(value_type = Object)]
    pub instructor_id: Bson,
    #[serde(deserialize_with = "super::number")]
    pub revenue: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyEnrollment {
    pub year: i32,
    pub month: u32,
    pub enrollments: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CategoryPopularity {
    #[serde(default)]
    pub category: Option<String>,
    pub enrollment_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StudentEngagement {
    #[schema(value_type = Object)]
    pub student_id: Bson,
    #[serde(default)]
    pub name: Option<String>,
    pub assignments_submitted: i64,
    #[serde(default)]
    pub average_grade: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompletionRate {
    #[schema(value_type = Object)]
    pub course_id: Bson,
    pub enrolled: i64,
    pub submitted: i64,
    /// Percentage rounded to two decimals; 0 when nobody is enrolled.
    pub completion_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StudentSummary {
    #[serde(rename = "_id")]
    #[schema(value_type = Object)]
    pub id: Bson,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// Students enrolled in one course. `course_title` is `None` when the
/// course does not exist, in which case `students` is empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CourseRoster {
    pub course_title: Option<String>,
    pub students: Vec<StudentSummary>,
}

impl CourseRoster {
    pub fn not_found() -> Self {
        Self {
            course_title: None,
            students: Vec::new(),
        }
    }

    pub fn is_found(&self) -> bool {
        self.course_title.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::{self, doc};

    #[test]
    fn server_decimal_totals_decode_as_floats() {
        let revenue: InstructorRevenue = bson::from_document(doc! {
            "instructorId": "U1",
            "revenue": Bson::Decimal128("1998.00".parse().unwrap()),
        })
        .unwrap();
        assert_eq!(revenue.revenue, 1998.0);

        let rating: InstructorRating = bson::from_document(doc! {
            "instructorId": "U1",
            "avgRating": Bson::Decimal128("4.25".parse().unwrap()),
        })
        .unwrap();
        assert_eq!(rating.avg_rating, Some(4.25));

        assert!(bson::from_document::<InstructorRevenue>(doc! { "instructorId": "U1", "revenue": "n/a" }).is_err());
    }
}
