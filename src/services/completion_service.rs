use std::collections::BTreeMap;

use mongodb::bson::Bson;
use serde::Deserialize;

use super::decode;
use crate::database::collections::{ASSIGNMENTS, ENROLLMENTS, SUBMISSIONS};
use crate::database::DocumentStore;
use crate::models::CompletionRate;
use crate::pipeline::value::OrderedBson;
use crate::pipeline::{round_to, Accumulator, Expr, GroupKey, JoinKind, Pipeline};
use crate::utils::error::AppError;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub(crate) struct EnrolledCount {
    #[serde(rename = "_id", default)]
    pub course_id: Bson,
    pub enrolled: i64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub(crate) struct SubmittedCount {
    #[serde(rename = "_id", default)]
    pub course_id: Bson,
    pub submitted: i64,
}

pub(crate) fn enrolled_pipeline() -> Pipeline {
    Pipeline::new().group(
        GroupKey::field("courseId"),
        vec![("enrolled", Accumulator::Count)],
    )
}

/// Distinct submitting students per course. The course comes from the
/// submission's assignment; submissions for unknown assignments drop out.
pub(crate) fn submitted_pipeline() -> Pipeline {
    Pipeline::new()
        .join(ASSIGNMENTS, "assignmentId", "_id", "assignment", JoinKind::Inner)
        .group(
            GroupKey::composite(vec![
                ("courseId", Expr::field("assignment.courseId")),
                ("studentId", Expr::field("studentId")),
            ]),
            vec![],
        )
        .group(
            GroupKey::field("_id.courseId"),
            vec![("submitted", Accumulator::Count)],
        )
}

/// Merges enrolled and submitted counts by course.
///
/// Output follows the enrolled counts: a course that has submissions but no
/// enrollments does not appear. A course with no enrolled students reports
/// a rate of 0.
pub(crate) fn reconcile(enrolled: Vec<EnrolledCount>, submitted: Vec<SubmittedCount>) -> Vec<CompletionRate> {
    let submitted: BTreeMap<OrderedBson, i64> = submitted
        .into_iter()
        .map(|s| (OrderedBson(s.course_id), s.submitted))
        .collect();

    enrolled
        .into_iter()
        .map(|e| {
            let submitted = submitted
                .get(&OrderedBson(e.course_id.clone()))
                .copied()
                .unwrap_or(0);
            let completion_rate = if e.enrolled > 0 {
                round_to(submitted as f64 / e.enrolled as f64 * 100.0, 2)
            } else {
                0.0
            };
            CompletionRate {
                course_id: e.course_id,
                enrolled: e.enrolled,
                submitted,
                completion_rate,
            }
        })
        .collect()
}

/// Share of enrolled students who submitted at least one assignment, per
/// course.
pub async fn completion_rate_by_course(
    store: &dyn DocumentStore,
) -> Result<Vec<CompletionRate>, AppError> {
    let enrolled = store.run_pipeline(ENROLLMENTS, &enrolled_pipeline()).await?;
    let submitted = store.run_pipeline(SUBMISSIONS, &submitted_pipeline()).await?;
    log::debug!(
        "completion_rate_by_course: {} enrolled groups, {} submitted groups",
        enrolled.len(),
        submitted.len()
    );
    Ok(reconcile(decode(enrolled)?, decode(submitted)?))
}
