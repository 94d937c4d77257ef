use chrono::{DateTime, Datelike};
use mongodb::bson::{doc, Bson, Document};

use super::value::{as_f64, get_path, int_bson, is_nullish};

/// Computed value used by group keys, accumulators and projections.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Field(String),
    Literal(Bson),
    /// Null when any part is null or missing.
    Concat(Vec<Expr>),
    Round(Box<Expr>, i32),
    Size(Box<Expr>),
    Year(Box<Expr>),
    Month(Box<Expr>),
    Add(Box<Expr>, Box<Expr>),
    Subtract(Box<Expr>, Box<Expr>),
    Multiply(Box<Expr>, Box<Expr>),
    Divide(Box<Expr>, Box<Expr>),
}

impl Expr {
    pub fn field(path: &str) -> Self {
        Expr::Field(path.to_string())
    }

    pub fn lit(value: impl Into<Bson>) -> Self {
        Expr::Literal(value.into())
    }

    pub fn concat(parts: Vec<Expr>) -> Self {
        Expr::Concat(parts)
    }

    pub fn round(self, places: i32) -> Self {
        Expr::Round(Box::new(self), places)
    }

    pub fn size(self) -> Self {
        Expr::Size(Box::new(self))
    }

    pub fn year(self) -> Self {
        Expr::Year(Box::new(self))
    }

    pub fn month(self) -> Self {
        Expr::Month(Box::new(self))
    }

    pub fn add(self, other: Expr) -> Self {
        Expr::Add(Box::new(self), Box::new(other))
    }

    pub fn subtract(self, other: Expr) -> Self {
        Expr::Subtract(Box::new(self), Box::new(other))
    }

    pub fn multiply(self, other: Expr) -> Self {
        Expr::Multiply(Box::new(self), Box::new(other))
    }

    pub fn divide(self, other: Expr) -> Self {
        Expr::Divide(Box::new(self), Box::new(other))
    }

    /// Evaluates against one record. `None` means the value is missing,
    /// which projections drop instead of writing.
    pub fn eval(&self, doc: &Document) -> Option<Bson> {
        match self {
            Expr::Field(path) => get_path(doc, path).cloned(),
            Expr::Literal(value) => Some(value.clone()),
            Expr::Concat(parts) => {
                let mut out = String::new();
                for part in parts {
                    match part.eval(doc) {
                        Some(Bson::String(s)) => out.push_str(&s),
                        _ => return Some(Bson::Null),
                    }
                }
                Some(Bson::String(out))
            }
            Expr::Round(inner, places) => Some(match inner.eval(doc) {
                Some(Bson::Double(v)) => Bson::Double(round_to(v, *places)),
                Some(int @ (Bson::Int32(_) | Bson::Int64(_))) => int,
                Some(decimal @ Bson::Decimal128(_)) => match as_f64(&decimal) {
                    Some(v) => Bson::Double(round_to(v, *places)),
                    None => Bson::Null,
                },
                _ => Bson::Null,
            }),
            Expr::Size(inner) => Some(match inner.eval(doc) {
                Some(Bson::Array(items)) => int_bson(items.len() as i64),
                _ => Bson::Null,
            }),
            Expr::Year(inner) => Some(date_part(inner.eval(doc), |d| d.year())),
            Expr::Month(inner) => Some(date_part(inner.eval(doc), |d| d.month() as i32)),
            Expr::Add(a, b) => Some(arithmetic(a.eval(doc), b.eval(doc), i64::checked_add, |x, y| x + y)),
            Expr::Subtract(a, b) => Some(arithmetic(a.eval(doc), b.eval(doc), i64::checked_sub, |x, y| x - y)),
            Expr::Multiply(a, b) => Some(arithmetic(a.eval(doc), b.eval(doc), i64::checked_mul, |x, y| x * y)),
            Expr::Divide(a, b) => {
                let (x, y) = (a.eval(doc), b.eval(doc));
                Some(match (x.as_ref().and_then(as_f64), y.as_ref().and_then(as_f64)) {
                    (Some(_), Some(d)) if d == 0.0 => Bson::Null,
                    (Some(n), Some(d)) => Bson::Double(n / d),
                    _ => Bson::Null,
                })
            }
        }
    }

    /// Server aggregation-expression form.
    pub fn to_bson(&self) -> Bson {
        match self {
            Expr::Field(path) => Bson::String(format!("${}", path)),
            Expr::Literal(value) => Bson::Document(doc! { "$literal": value.clone() }),
            Expr::Concat(parts) => {
                let parts: Vec<Bson> = parts.iter().map(Expr::to_bson).collect();
                Bson::Document(doc! { "$concat": parts })
            }
            Expr::Round(inner, places) => {
                Bson::Document(doc! { "$round": [inner.to_bson(), *places] })
            }
            Expr::Size(inner) => Bson::Document(doc! { "$size": inner.to_bson() }),
            Expr::Year(inner) => Bson::Document(doc! { "$year": inner.to_bson() }),
            Expr::Month(inner) => Bson::Document(doc! { "$month": inner.to_bson() }),
            Expr::Add(a, b) => Bson::Document(doc! { "$add": [a.to_bson(), b.to_bson()] }),
            Expr::Subtract(a, b) => {
                Bson::Document(doc! { "$subtract": [a.to_bson(), b.to_bson()] })
            }
            Expr::Multiply(a, b) => {
                Bson::Document(doc! { "$multiply": [a.to_bson(), b.to_bson()] })
            }
            Expr::Divide(a, b) => Bson::Document(doc! { "$divide": [a.to_bson(), b.to_bson()] }),
        }
    }
}

/// Rounds half to even at `places` decimals, like the server's `$round`.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round_ties_even() / factor
}

fn date_part(value: Option<Bson>, part: impl Fn(&DateTime<chrono::Utc>) -> i32) -> Bson {
    match value {
        Some(Bson::DateTime(dt)) => DateTime::from_timestamp_millis(dt.timestamp_millis())
            .map(|d| Bson::Int32(part(&d)))
            .unwrap_or(Bson::Null),
        _ => Bson::Null,
    }
}

fn arithmetic(
    a: Option<Bson>,
    b: Option<Bson>,
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> Bson {
    if is_nullish(a.as_ref()) || is_nullish(b.as_ref()) {
        return Bson::Null;
    }
    let (a, b) = (a.unwrap_or(Bson::Null), b.unwrap_or(Bson::Null));
    match (&a, &b) {
        (Bson::Int32(_) | Bson::Int64(_), Bson::Int32(_) | Bson::Int64(_)) => {
            let x = super::value::as_i64(&a).unwrap_or_default();
            let y = super::value::as_i64(&b).unwrap_or_default();
            match int_op(x, y) {
                Some(result) => int_bson(result),
                None => Bson::Double(float_op(x as f64, y as f64)),
            }
        }
        _ => match (as_f64(&a), as_f64(&b)) {
            (Some(x), Some(y)) => Bson::Double(float_op(x, y)),
            _ => Bson::Null,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::DateTime as BsonDateTime;

    #[test]
    fn concat_is_null_when_a_part_is_missing() {
        let name = Expr::concat(vec![
            Expr::field("student.firstName"),
            Expr::lit(" "),
            Expr::field("student.lastName"),
        ]);
        let full = doc! { "student": { "firstName": "Ada", "lastName": "Lovelace" } };
        let partial = doc! { "student": { "firstName": "Ada" } };

        assert_eq!(name.eval(&full), Some(Bson::String("Ada Lovelace".into())));
        assert_eq!(name.eval(&partial), Some(Bson::Null));
    }

    #[test]
    fn round_keeps_two_decimals_and_passes_null_through() {
        let expr = Expr::field("avg").round(2);
        assert_eq!(expr.eval(&doc! { "avg": 83.333333 }), Some(Bson::Double(83.33)));
        assert_eq!(expr.eval(&doc! { "avg": Bson::Null }), Some(Bson::Null));
        assert_eq!(round_to(2.675_000_1, 2), 2.68);
    }

    #[test]
    fn date_parts_are_extracted_in_utc() {
        let at = BsonDateTime::from_millis(1_709_251_200_000); // 2024-03-01T00:00:00Z
        let d = doc! { "enrolledAt": at };
        assert_eq!(Expr::field("enrolledAt").year().eval(&d), Some(Bson::Int32(2024)));
        assert_eq!(Expr::field("enrolledAt").month().eval(&d), Some(Bson::Int32(3)));
        assert_eq!(Expr::field("missing").month().eval(&d), Some(Bson::Null));
    }

    #[test]
    fn arithmetic_widens_to_double_when_needed() {
        let d = doc! { "price": 100, "count": 3, "discount": 0.5 };
        assert_eq!(
            Expr::field("price").multiply(Expr::field("count")).eval(&d),
            Some(Bson::Int32(300))
        );
        assert_eq!(
            Expr::field("price").multiply(Expr::field("discount")).eval(&d),
            Some(Bson::Double(50.0))
        );
        assert_eq!(
            Expr::field("price").divide(Expr::lit(0)).eval(&d),
            Some(Bson::Null)
        );
    }

    #[test]
    fn renders_aggregation_expressions() {
        assert_eq!(
            Expr::field("averageGrade").round(2).to_bson(),
            Bson::Document(doc! { "$round": ["$averageGrade", 2] })
        );
        assert_eq!(
            Expr::field("totalStudents").size().to_bson(),
            Bson::Document(doc! { "$size": "$totalStudents" })
        );
    }
}
