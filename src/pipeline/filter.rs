use mongodb::bson::{doc, Bson, Document};

use super::value::{compare_bson, get_path, is_nullish, same_bracket, values_equal};
use crate::utils::error::AppError;

/// Match predicate over a single record.
///
/// Array-valued fields match `Eq`/`In`/`Contains` when any element matches,
/// the same way the server evaluates queries against arrays.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    All,
    Eq(String, Bson),
    Ne(String, Bson),
    Gte(String, Bson),
    Lte(String, Bson),
    In(String, Vec<Bson>),
    /// Case-insensitive substring match.
    Contains(String, String),
    Exists(String, bool),
    And(Vec<Filter>),
}

impl Filter {
    pub fn eq(field: &str, value: impl Into<Bson>) -> Self {
        Filter::Eq(field.to_string(), value.into())
    }

    pub fn ne(field: &str, value: impl Into<Bson>) -> Self {
        Filter::Ne(field.to_string(), value.into())
    }

    /// Field is present and not null.
    pub fn not_null(field: &str) -> Self {
        Filter::Ne(field.to_string(), Bson::Null)
    }

    pub fn gte(field: &str, value: impl Into<Bson>) -> Self {
        Filter::Gte(field.to_string(), value.into())
    }

    pub fn lte(field: &str, value: impl Into<Bson>) -> Self {
        Filter::Lte(field.to_string(), value.into())
    }

    /// Inclusive range `min <= field <= max`.
    pub fn between(field: &str, min: impl Into<Bson>, max: impl Into<Bson>) -> Self {
        Filter::And(vec![Filter::gte(field, min), Filter::lte(field, max)])
    }

    pub fn one_of<V: Into<Bson>>(field: &str, values: impl IntoIterator<Item = V>) -> Self {
        Filter::In(field.to_string(), values.into_iter().map(Into::into).collect())
    }

    pub fn contains(field: &str, needle: &str) -> Self {
        Filter::Contains(field.to_string(), needle.to_string())
    }

    pub fn and(self, other: Filter) -> Self {
        match (self, other) {
            (Filter::All, other) => other,
            (this, Filter::All) => this,
            (Filter::And(mut left), Filter::And(right)) => {
                left.extend(right);
                Filter::And(left)
            }
            (Filter::And(mut left), other) => {
                left.push(other);
                Filter::And(left)
            }
            (this, other) => Filter::And(vec![this, other]),
        }
    }

    pub fn matches(&self, doc: &Document) -> bool {
        match self {
            Filter::All => true,
            Filter::Eq(field, value) => equals(get_path(doc, field), value),
            Filter::Ne(field, value) => !equals(get_path(doc, field), value),
            Filter::Gte(field, bound) => in_range(get_path(doc, field), bound, |o| o.is_ge()),
            Filter::Lte(field, bound) => in_range(get_path(doc, field), bound, |o| o.is_le()),
            Filter::In(field, values) => {
                let actual = get_path(doc, field);
                values.iter().any(|value| equals(actual, value))
            }
            Filter::Contains(field, needle) => {
                let needle = needle.to_lowercase();
                let contains = |value: &Bson| match value {
                    Bson::String(s) => s.to_lowercase().contains(&needle),
                    _ => false,
                };
                match get_path(doc, field) {
                    Some(Bson::Array(items)) => items.iter().any(contains),
                    Some(value) => contains(value),
                    None => false,
                }
            }
            Filter::Exists(field, expected) => get_path(doc, field).is_some() == *expected,
            Filter::And(filters) => filters.iter().all(|f| f.matches(doc)),
        }
    }

    /// Server query document.
    pub fn to_document(&self) -> Document {
        match self {
            Filter::All => Document::new(),
            Filter::Eq(field, value) => doc! { field.as_str(): value.clone() },
            Filter::Ne(field, value) => doc! { field.as_str(): { "$ne": value.clone() } },
            Filter::Gte(field, value) => doc! { field.as_str(): { "$gte": value.clone() } },
            Filter::Lte(field, value) => doc! { field.as_str(): { "$lte": value.clone() } },
            Filter::In(field, values) => doc! { field.as_str(): { "$in": values.clone() } },
            Filter::Contains(field, needle) => doc! {
                field.as_str(): { "$regex": escape_regex(needle), "$options": "i" }
            },
            Filter::Exists(field, expected) => doc! { field.as_str(): { "$exists": *expected } },
            Filter::And(filters) => {
                let clauses: Vec<Bson> = filters
                    .iter()
                    .map(|f| Bson::Document(f.to_document()))
                    .collect();
                doc! { "$and": clauses }
            }
        }
    }

    /// Parses the query dialect accepted from callers: plain equality,
    /// `$eq`/`$ne`/`$gte`/`$lte`/`$in`/`$exists`, case-insensitive `$regex`
    /// (read as a literal substring) and `$and`.
    pub fn from_document(query: &Document) -> Result<Filter, AppError> {
        let mut clauses = Vec::new();

        for (key, value) in query {
            if key == "$and" {
                let Bson::Array(items) = value else {
                    return Err(AppError::InvalidRequest("$and expects an array".into()));
                };
                for item in items {
                    let Bson::Document(inner) = item else {
                        return Err(AppError::InvalidRequest(
                            "$and entries must be documents".into(),
                        ));
                    };
                    clauses.push(Filter::from_document(inner)?);
                }
            } else if key.starts_with('$') {
                return Err(AppError::InvalidRequest(format!(
                    "unsupported top-level operator {}",
                    key
                )));
            } else {
                match value {
                    Bson::Document(ops) if ops.keys().next().is_some_and(|k| k.starts_with('$')) => {
                        clauses.extend(parse_operators(key, ops)?);
                    }
                    _ => clauses.push(Filter::Eq(key.clone(), value.clone())),
                }
            }
        }

        Ok(match clauses.len() {
            0 => Filter::All,
            1 => clauses.remove(0),
            _ => Filter::And(clauses),
        })
    }
}

fn parse_operators(field: &str, ops: &Document) -> Result<Vec<Filter>, AppError> {
    let case_insensitive = match ops.get("$options") {
        Some(Bson::String(options)) => options.contains('i'),
        Some(_) => return Err(AppError::InvalidRequest("$options must be a string".into())),
        None => false,
    };

    let mut filters = Vec::new();
    for (op, operand) in ops {
        let filter = match op.as_str() {
            "$eq" => Filter::Eq(field.to_string(), operand.clone()),
            "$ne" => Filter::Ne(field.to_string(), operand.clone()),
            "$gte" => Filter::Gte(field.to_string(), operand.clone()),
            "$lte" => Filter::Lte(field.to_string(), operand.clone()),
            "$in" => match operand {
                Bson::Array(values) => Filter::In(field.to_string(), values.clone()),
                _ => return Err(AppError::InvalidRequest("$in expects an array".into())),
            },
            "$exists" => match operand {
                Bson::Boolean(expected) => Filter::Exists(field.to_string(), *expected),
                _ => return Err(AppError::InvalidRequest("$exists expects a boolean".into())),
            },
            "$regex" => match operand {
                Bson::String(pattern) if case_insensitive => {
                    Filter::Contains(field.to_string(), pattern.clone())
                }
                Bson::String(_) => {
                    return Err(AppError::InvalidRequest(
                        "only case-insensitive $regex is supported".into(),
                    ))
                }
                _ => return Err(AppError::InvalidRequest("$regex expects a string".into())),
            },
            "$options" => continue,
            other => {
                return Err(AppError::InvalidRequest(format!(
                    "unsupported operator {} on {}",
                    other, field
                )))
            }
        };
        filters.push(filter);
    }
    Ok(filters)
}

fn equals(actual: Option<&Bson>, expected: &Bson) -> bool {
    if is_nullish(Some(expected)) {
        return is_nullish(actual);
    }
    match actual {
        Some(Bson::Array(items)) => {
            items.iter().any(|item| values_equal(item, expected))
                || values_equal(&Bson::Array(items.clone()), expected)
        }
        Some(value) => values_equal(value, expected),
        None => false,
    }
}

fn in_range(
    actual: Option<&Bson>,
    bound: &Bson,
    accept: impl Fn(std::cmp::Ordering) -> bool,
) -> bool {
    let check = |value: &Bson| {
        same_bracket(value, bound) && accept(compare_bson(Some(value), Some(bound)))
    };
    match actual {
        Some(Bson::Array(items)) => items.iter().any(check),
        Some(value) => check(value),
        None => false,
    }
}

fn escape_regex(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len());
    for c in needle.chars() {
        if "\\^$.|?*+()[]{}".contains(c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
