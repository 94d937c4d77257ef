//! Query timing and execution statistics. Observational only: nothing here
//! writes to the store.

use std::time::Instant;

use mongodb::bson::Document;
use serde::{Deserialize, Serialize};

use crate::database::DocumentStore;
use crate::pipeline::{round_to, Filter};
use crate::utils::error::AppError;
use crate::utils::metrics;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QueryTiming {
    pub label: String,
    pub result_count: usize,
    /// Wall-clock milliseconds, two decimals.
    pub duration_ms: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TimingComparison {
    pub label: String,
    pub before_ms: f64,
    pub after_ms: f64,
    /// Positive when `after` was faster.
    pub improvement_ms: f64,
}

/// Runs a filtered read and measures it. The timing is recorded in the
/// query-metrics registry under `label`.
pub async fn time_query(
    store: &dyn DocumentStore,
    collection: &str,
    filter: &Filter,
    label: &str,
) -> Result<QueryTiming, AppError> {
    let started = Instant::now();
    let docs = store.find(collection, filter).await?;
    let duration_ms = round_to(started.elapsed().as_secs_f64() * 1000.0, 2);

    metrics::record_query(label, docs.len(), duration_ms);
    log::debug!(
        "⏱️  {} on {}: {} documents in {} ms",
        label,
        collection,
        docs.len(),
        duration_ms
    );

    Ok(QueryTiming {
        label: label.to_string(),
        result_count: docs.len(),
        duration_ms,
    })
}

/// The store's explain output for a filtered read, unmodified.
pub async fn analyze_query_performance(
    store: &dyn DocumentStore,
    collection: &str,
    filter: &Filter,
) -> Result<Document, AppError> {
    let explain = store.explain(collection, filter).await?;
    if let Ok(stats) = explain.get_document("executionStats") {
        log::debug!("🔍 executionStats for {}: {}", collection, stats);
    }
    Ok(explain)
}

/// Delta between two runs of the same logical query.
pub fn compare(before: &QueryTiming, after: &QueryTiming) -> TimingComparison {
    TimingComparison {
        label: before.label.clone(),
        before_ms: before.duration_ms,
        after_ms: after.duration_ms,
        improvement_ms: round_to(before.duration_ms - after.duration_ms, 2),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryStore;
    use mongodb::bson::doc;

    #[tokio::test]
    async fn timing_counts_results_and_records_a_metric() {
        let store = MemoryStore::new();
        for n in 0..5 {
            store
                .insert_one("courses", doc! { "price": n * 25 })
                .await
                .unwrap();
        }

        let timing = time_query(&store, "courses", &Filter::gte("price", 50), "profiler-test:price")
            .await
            .unwrap();
        assert_eq!(timing.result_count, 3);
        assert!(timing.duration_ms >= 0.0);
        assert!(metrics::snapshot()
            .iter()
            .any(|(label, metric)| label == "profiler-test:price" && metric.last_result_count == 3));
    }

    #[tokio::test]
    async fn explain_passes_store_statistics_through() {
        let store = MemoryStore::new();
        store.insert_one("users", doc! { "role": "student" }).await.unwrap();

        let explain = analyze_query_performance(&store, "users", &Filter::eq("role", "student"))
            .await
            .unwrap();
        let stats = explain.get_document("executionStats").unwrap();
        assert_eq!(stats.get_i64("nReturned").unwrap(), 1);
    }

    #[test]
    fn compare_reports_the_improvement() {
        let before = QueryTiming {
            label: "email lookup".into(),
            result_count: 1,
            duration_ms: 12.5,
        };
        let after = QueryTiming {
            duration_ms: 2.25,
            ..before.clone()
        };
        let diff = compare(&before, &after);
        assert_eq!(diff.improvement_ms, 10.25);
        assert_eq!(diff.label, "email lookup");
    }
}
