//! In-process evaluation of a [`Pipeline`] over a record stream.
//!
//! Mirrors the server's aggregation semantics closely enough that analytics
//! built on the stage algebra return the same records from either store.

use std::collections::BTreeMap;

use mongodb::bson::{Bson, Document};

use super::expr::Expr;
use super::stage::{Accumulator, GroupKey, Lookup, Pipeline, Projection, SortOrder, Stage};
use super::value::{
    as_f64, as_i64, compare_bson, get_path, int_bson, is_nullish, remove_path, set_path,
    values_equal, OrderedBson,
};

/// Runs every stage in order. `foreign` resolves a collection name to its
/// documents for lookups.
pub fn execute(
    pipeline: &Pipeline,
    input: Vec<Document>,
    foreign: &dyn Fn(&str) -> Vec<Document>,
) -> Vec<Document> {
    pipeline
        .stages()
        .iter()
        .fold(input, |records, stage| apply(stage, records, foreign))
}

fn apply(stage: &Stage, records: Vec<Document>, foreign: &dyn Fn(&str) -> Vec<Document>) -> Vec<Document> {
    match stage {
        Stage::Match(filter) => records.into_iter().filter(|d| filter.matches(d)).collect(),
        Stage::Lookup(lookup) => apply_lookup(lookup, records, &foreign(&lookup.from)),
        Stage::Unwind {
            path,
            preserve_empty,
        } => apply_unwind(path, *preserve_empty, records),
        Stage::Group { key, accumulators } => apply_group(key, accumulators, records),
        Stage::Project(spec) => records.iter().map(|d| apply_project(spec, d)).collect(),
        Stage::Sort(keys) => apply_sort(keys, records),
        Stage::Limit(n) => {
            let mut records = records;
            records.truncate(usize::try_from(*n).unwrap_or(usize::MAX));
            records
        }
    }
}

fn apply_lookup(lookup: &Lookup, records: Vec<Document>, foreign: &[Document]) -> Vec<Document> {
    records
        .into_iter()
        .map(|mut record| {
            let local = get_path(&record, &lookup.local_field).cloned();
            let matches: Vec<Bson> = foreign
                .iter()
                .filter(|candidate| {
                    join_matches(local.as_ref(), get_path(candidate, &lookup.foreign_field))
                })
                .map(|candidate| Bson::Document(candidate.clone()))
                .collect();
            set_path(&mut record, &lookup.as_field, Bson::Array(matches));
            record
        })
        .collect()
}

fn join_matches(local: Option<&Bson>, foreign: Option<&Bson>) -> bool {
    if is_nullish(local) {
        return is_nullish(foreign);
    }
    let local = local.unwrap_or(&Bson::Null);
    let scalar_match = |value: &Bson| match foreign {
        Some(Bson::Array(items)) => items.iter().any(|item| values_equal(item, value)),
        Some(other) => values_equal(other, value),
        None => false,
    };
    match local {
        Bson::Array(items) => items.iter().any(scalar_match),
        value => scalar_match(value),
    }
}

fn apply_unwind(path: &str, preserve_empty: bool, records: Vec<Document>) -> Vec<Document> {
    enum Shape {
        Elements(Vec<Bson>),
        Absent,
        Scalar,
    }

    let mut out = Vec::with_capacity(records.len());
    for record in records {
        let shape = match get_path(&record, path) {
            Some(Bson::Array(items)) => Shape::Elements(items.clone()),
            Some(Bson::Null) | None => Shape::Absent,
            Some(_) => Shape::Scalar,
        };
        match shape {
            Shape::Elements(items) if !items.is_empty() => {
                for item in items {
                    let mut flattened = record.clone();
                    set_path(&mut flattened, path, item);
                    out.push(flattened);
                }
            }
            Shape::Elements(_) => {
                if preserve_empty {
                    let mut kept = record;
                    remove_path(&mut kept, path);
                    out.push(kept);
                }
            }
            Shape::Absent => {
                if preserve_empty {
                    out.push(record);
                }
            }
            Shape::Scalar => out.push(record),
        }
    }
    out
}

enum AccState {
    Count(i64),
    Sum { ints: i64, floats: f64, saw_float: bool },
    Avg { total: f64, n: u64 },
    Push(Vec<Bson>),
    Set(Vec<Bson>),
}

impl AccState {
    fn new(accumulator: &Accumulator) -> Self {
        match accumulator {
            Accumulator::Count => AccState::Count(0),
            Accumulator::Sum(_) => AccState::Sum {
                ints: 0,
                floats: 0.0,
                saw_float: false,
            },
            Accumulator::Avg(_) => AccState::Avg { total: 0.0, n: 0 },
            Accumulator::Push(_) => AccState::Push(Vec::new()),
            Accumulator::AddToSet(_) => AccState::Set(Vec::new()),
        }
    }

    fn feed(&mut self, accumulator: &Accumulator, record: &Document) {
        let value = |expr: &Expr| expr.eval(record);
        match (self, accumulator) {
            (AccState::Count(n), _) => *n += 1,
            (AccState::Sum { ints, floats, saw_float }, Accumulator::Sum(expr)) => {
                match value(expr) {
                    Some(Bson::Double(v)) => {
                        *floats += v;
                        *saw_float = true;
                    }
                    Some(decimal @ Bson::Decimal128(_)) => {
                        if let Some(v) = as_f64(&decimal) {
                            *floats += v;
                            *saw_float = true;
                        }
                    }
                    Some(other) => {
                        if let Some(v) = as_i64(&other) {
                            match ints.checked_add(v) {
                                Some(total) => *ints = total,
                                None => {
                                    *floats += v as f64;
                                    *saw_float = true;
                                }
                            }
                        }
                    }
                    None => {}
                }
            }
            (AccState::Avg { total, n }, Accumulator::Avg(expr)) => {
                if let Some(v) = value(expr).as_ref().and_then(as_f64) {
                    *total += v;
                    *n += 1;
                }
            }
            (AccState::Push(items), Accumulator::Push(expr)) => {
                if let Some(v) = value(expr) {
                    items.push(v);
                }
            }
            (AccState::Set(items), Accumulator::AddToSet(expr)) => {
                if let Some(v) = value(expr) {
                    if !items.iter().any(|existing| values_equal(existing, &v)) {
                        items.push(v);
                    }
                }
            }
            _ => {}
        }
    }

    fn finish(self) -> Bson {
        match self {
            AccState::Count(n) => int_bson(n),
            AccState::Sum {
                ints,
                floats,
                saw_float,
            } => {
                if saw_float {
                    Bson::Double(ints as f64 + floats)
                } else {
                    int_bson(ints)
                }
            }
            AccState::Avg { total, n } => {
                if n == 0 {
                    Bson::Null
                } else {
                    Bson::Double(total / n as f64)
                }
            }
            AccState::Push(items) | AccState::Set(items) => Bson::Array(items),
        }
    }
}

fn group_key(key: &GroupKey, record: &Document) -> Bson {
    match key {
        GroupKey::Null => Bson::Null,
        GroupKey::Expr(expr) => expr.eval(record).unwrap_or(Bson::Null),
        GroupKey::Composite(parts) => {
            let mut composite = Document::new();
            for (name, expr) in parts {
                composite.insert(name.as_str(), expr.eval(record).unwrap_or(Bson::Null));
            }
            Bson::Document(composite)
        }
    }
}

/// Groups appear in order of first occurrence.
fn apply_group(
    key: &GroupKey,
    accumulators: &[(String, Accumulator)],
    records: Vec<Document>,
) -> Vec<Document> {
    let mut index: BTreeMap<OrderedBson, usize> = BTreeMap::new();
    let mut groups: Vec<(Bson, Vec<AccState>)> = Vec::new();

    for record in &records {
        let id = group_key(key, record);
        let slot = *index.entry(OrderedBson(id.clone())).or_insert_with(|| {
            groups.push((
                id,
                accumulators.iter().map(|(_, acc)| AccState::new(acc)).collect(),
            ));
            groups.len() - 1
        });
        for ((_, accumulator), state) in accumulators.iter().zip(groups[slot].1.iter_mut()) {
            state.feed(accumulator, record);
        }
    }

    groups
        .into_iter()
        .map(|(id, states)| {
            let mut out = Document::new();
            out.insert("_id", id);
            for ((name, _), state) in accumulators.iter().zip(states) {
                out.insert(name.as_str(), state.finish());
            }
            out
        })
        .collect()
}

fn apply_project(spec: &[(String, Projection)], record: &Document) -> Document {
    let exclusion_only = spec
        .iter()
        .all(|(_, projection)| matches!(projection, Projection::Exclude));

    if exclusion_only {
        let mut out = record.clone();
        for (name, _) in spec {
            remove_path(&mut out, name);
        }
        return out;
    }

    let mut out = Document::new();
    if !spec.iter().any(|(name, _)| name == "_id") {
        if let Some(id) = record.get("_id") {
            out.insert("_id", id.clone());
        }
    }
    for (name, projection) in spec {
        match projection {
            Projection::Include => {
                if let Some(value) = get_path(record, name) {
                    set_path(&mut out, name, value.clone());
                }
            }
            Projection::Exclude => {}
            Projection::Computed(expr) => {
                if let Some(value) = expr.eval(record) {
                    set_path(&mut out, name, value);
                }
            }
        }
    }
    out
}

fn apply_sort(keys: &[(String, SortOrder)], mut records: Vec<Document>) -> Vec<Document> {
    records.sort_by(|a, b| {
        keys.iter()
            .map(|(field, order)| {
                let ord = compare_bson(get_path(a, field), get_path(b, field));
                match order {
                    SortOrder::Ascending => ord,
                    SortOrder::Descending => ord.reverse(),
                }
            })
            .find(|ord| ord.is_ne())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    records
}
