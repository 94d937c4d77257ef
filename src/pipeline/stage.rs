use mongodb::bson::{doc, Bson, Document};

use super::expr::Expr;
use super::filter::Filter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// How a join treats records with no foreign match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    /// Records without a match are dropped.
    Inner,
    /// Records without a match are kept with the output field absent.
    Left,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Lookup {
    pub from: String,
    pub local_field: String,
    pub foreign_field: String,
    pub as_field: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GroupKey {
    /// Every record falls into one group.
    Null,
    Expr(Expr),
    Composite(Vec<(String, Expr)>),
}

impl GroupKey {
    pub fn field(path: &str) -> Self {
        GroupKey::Expr(Expr::field(path))
    }

    pub fn composite(parts: Vec<(&str, Expr)>) -> Self {
        GroupKey::Composite(
            parts
                .into_iter()
                .map(|(name, expr)| (name.to_string(), expr))
                .collect(),
        )
    }

    fn to_bson(&self) -> Bson {
        match self {
            GroupKey::Null => Bson::Null,
            GroupKey::Expr(expr) => expr.to_bson(),
            GroupKey::Composite(parts) => {
                let mut key = Document::new();
                for (name, expr) in parts {
                    key.insert(name.as_str(), expr.to_bson());
                }
                Bson::Document(key)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Accumulator {
    Count,
    /// Ignores null and non-numeric values.
    Sum(Expr),
    /// Ignores null and non-numeric values; null when nothing was numeric.
    Avg(Expr),
    /// Ordered, duplicates kept.
    Push(Expr),
    /// Deduplicated.
    AddToSet(Expr),
}

impl Accumulator {
    pub fn sum(path: &str) -> Self {
        Accumulator::Sum(Expr::field(path))
    }

    pub fn avg(path: &str) -> Self {
        Accumulator::Avg(Expr::field(path))
    }

    pub fn push(path: &str) -> Self {
        Accumulator::Push(Expr::field(path))
    }

    pub fn add_to_set(path: &str) -> Self {
        Accumulator::AddToSet(Expr::field(path))
    }

    fn to_document(&self) -> Document {
        match self {
            Accumulator::Count => doc! { "$sum": 1 },
            Accumulator::Sum(expr) => doc! { "$sum": expr.to_bson() },
            Accumulator::Avg(expr) => doc! { "$avg": expr.to_bson() },
            Accumulator::Push(expr) => doc! { "$push": expr.to_bson() },
            Accumulator::AddToSet(expr) => doc! { "$addToSet": expr.to_bson() },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    Include,
    Exclude,
    Computed(Expr),
}

impl Projection {
    /// Shorthand for renaming: the output field takes the value at `path`.
    pub fn from_field(path: &str) -> Self {
        Projection::Computed(Expr::field(path))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    Match(Filter),
    Lookup(Lookup),
    Unwind {
        path: String,
        /// Keep records whose array is missing, null or empty.
        preserve_empty: bool,
    },
    Group {
        key: GroupKey,
        accumulators: Vec<(String, Accumulator)>,
    },
    Project(Vec<(String, Projection)>),
    Sort(Vec<(String, SortOrder)>),
    Limit(u64),
}

impl Stage {
    pub fn to_document(&self) -> Document {
        match self {
            Stage::Match(filter) => doc! { "$match": filter.to_document() },
            Stage::Lookup(lookup) => doc! {
                "$lookup": {
                    "from": lookup.from.as_str(),
                    "localField": lookup.local_field.as_str(),
                    "foreignField": lookup.foreign_field.as_str(),
                    "as": lookup.as_field.as_str(),
                }
            },
            Stage::Unwind {
                path,
                preserve_empty,
            } => doc! {
                "$unwind": {
                    "path": format!("${}", path),
                    "preserveNullAndEmptyArrays": *preserve_empty,
                }
            },
            Stage::Group { key, accumulators } => {
                let mut group = doc! { "_id": key.to_bson() };
                for (name, accumulator) in accumulators {
                    group.insert(name.as_str(), accumulator.to_document());
                }
                doc! { "$group": group }
            }
            Stage::Project(spec) => {
                let mut project = Document::new();
                for (name, projection) in spec {
                    let value = match projection {
                        Projection::Include => Bson::Int32(1),
                        Projection::Exclude => Bson::Int32(0),
                        Projection::Computed(expr) => expr.to_bson(),
                    };
                    project.insert(name.as_str(), value);
                }
                doc! { "$project": project }
            }
            Stage::Sort(keys) => {
                let mut sort = Document::new();
                for (name, order) in keys {
                    let direction = match order {
                        SortOrder::Ascending => 1,
                        SortOrder::Descending => -1,
                    };
                    sort.insert(name.as_str(), direction);
                }
                doc! { "$sort": sort }
            }
            Stage::Limit(n) => {
                let limit = i64::try_from(*n).unwrap_or(i64::MAX);
                doc! { "$limit": limit }
            }
        }
    }
}

/// Ordered list of stages, built fluently:
///
/// ```ignore
/// Pipeline::new()
///     .filter(Filter::not_null("grade"))
///     .group(GroupKey::field("studentId"), vec![("averageGrade", Accumulator::avg("grade"))])
///     .join("users", "_id", "_id", "student", JoinKind::Inner)
///     .sort(vec![("averageGrade", SortOrder::Descending)]);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn stage(mut self, stage: Stage) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn filter(self, filter: Filter) -> Self {
        self.stage(Stage::Match(filter))
    }

    /// Attaches every foreign record whose `foreign_field` equals this
    /// record's `local_field` as an array at `as_field`.
    pub fn lookup(self, from: &str, local_field: &str, foreign_field: &str, as_field: &str) -> Self {
        self.stage(Stage::Lookup(Lookup {
            from: from.to_string(),
            local_field: local_field.to_string(),
            foreign_field: foreign_field.to_string(),
            as_field: as_field.to_string(),
        }))
    }

    /// One output record per array element. Records with an empty or
    /// missing array are dropped.
    pub fn unwind(self, path: &str) -> Self {
        self.stage(Stage::Unwind {
            path: path.to_string(),
            preserve_empty: false,
        })
    }

    pub fn unwind_preserving(self, path: &str) -> Self {
        self.stage(Stage::Unwind {
            path: path.to_string(),
            preserve_empty: true,
        })
    }

    /// Lookup followed by unwind, with the orphan policy spelled out.
    pub fn join(
        self,
        from: &str,
        local_field: &str,
        foreign_field: &str,
        as_field: &str,
        kind: JoinKind,
    ) -> Self {
        let joined = self.lookup(from, local_field, foreign_field, as_field);
        match kind {
            JoinKind::Inner => joined.unwind(as_field),
            JoinKind::Left => joined.unwind_preserving(as_field),
        }
    }

    pub fn group(self, key: GroupKey, accumulators: Vec<(&str, Accumulator)>) -> Self {
        self.stage(Stage::Group {
            key,
            accumulators: accumulators
                .into_iter()
                .map(|(name, acc)| (name.to_string(), acc))
                .collect(),
        })
    }

    pub fn project(self, spec: Vec<(&str, Projection)>) -> Self {
        self.stage(Stage::Project(
            spec.into_iter()
                .map(|(name, projection)| (name.to_string(), projection))
                .collect(),
        ))
    }

    pub fn sort(self, keys: Vec<(&str, SortOrder)>) -> Self {
        self.stage(Stage::Sort(
            keys.into_iter()
                .map(|(name, order)| (name.to_string(), order))
                .collect(),
        ))
    }

    pub fn limit(self, n: u64) -> Self {
        self.stage(Stage::Limit(n))
    }

    /// Server aggregation pipeline.
    pub fn to_documents(&self) -> Vec<Document> {
        self.stages.iter().map(Stage::to_document).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inner_join_renders_lookup_then_strict_unwind() {
        let pipeline = Pipeline::new().join("courses", "courseId", "_id", "course", JoinKind::Inner);
        assert_eq!(
            pipeline.to_documents(),
            vec![
                doc! { "$lookup": {
                    "from": "courses",
                    "localField": "courseId",
                    "foreignField": "_id",
                    "as": "course",
                } },
                doc! { "$unwind": { "path": "$course", "preserveNullAndEmptyArrays": false } },
            ]
        );
    }

    #[test]
    fn left_join_preserves_unmatched_records() {
        let pipeline = Pipeline::new().join("users", "_id", "_id", "student", JoinKind::Left);
        assert_eq!(
            pipeline.stages()[1],
            Stage::Unwind {
                path: "student".into(),
                preserve_empty: true
            }
        );
    }

    #[test]
    fn renders_group_project_sort_and_limit() {
        let pipeline = Pipeline::new()
            .group(
                GroupKey::field("studentId"),
                vec![
                    ("averageGrade", Accumulator::avg("grade")),
                    ("submissionCount", Accumulator::Count),
                ],
            )
            .sort(vec![("averageGrade", SortOrder::Descending)])
            .limit(5)
            .project(vec![
                ("_id", Projection::Exclude),
                ("studentId", Projection::from_field("_id")),
                ("submissionCount", Projection::Include),
            ]);

        assert_eq!(
            pipeline.to_documents(),
            vec![
                doc! { "$group": {
                    "_id": "$studentId",
                    "averageGrade": { "$avg": "$grade" },
                    "submissionCount": { "$sum": 1 },
                } },
                doc! { "$sort": { "averageGrade": -1 } },
                doc! { "$limit": 5_i64 },
                doc! { "$project": { "_id": 0, "studentId": "$_id", "submissionCount": 1 } },
            ]
        );
    }

    #[test]
    fn composite_group_keys_render_as_documents() {
        let key = GroupKey::composite(vec![
            ("year", Expr::field("enrolledAt").year()),
            ("month", Expr::field("enrolledAt").month()),
        ]);
        let stage = Pipeline::new().group(key, vec![]).to_documents();
        assert_eq!(
            stage[0],
            doc! { "$group": { "_id": {
                "year": { "$year": "$enrolledAt" },
                "month": { "$month": "$enrolledAt" },
            } } }
        );
    }
}
