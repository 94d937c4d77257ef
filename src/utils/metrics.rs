// Process-wide registry of profiled query timings
use std::collections::HashMap;
use std::sync::RwLock;

use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Serialize, utoipa::ToSchema)]
pub struct QueryMetric {
    pub runs: u64,
    pub total_ms: f64,
    pub last_ms: f64,
    pub last_result_count: usize,
}

lazy_static::lazy_static! {
    static ref QUERY_METRICS: RwLock<HashMap<String, QueryMetric>> = RwLock::new(HashMap::new());
}

pub fn record_query(label: &str, result_count: usize, duration_ms: f64) {
    if let Ok(mut metrics) = QUERY_METRICS.write() {
        let entry = metrics.entry(label.to_string()).or_default();
        entry.runs += 1;
        entry.total_ms += duration_ms;
        entry.last_ms = duration_ms;
        entry.last_result_count = result_count;
    }
}

/// Copy of every label's metric, sorted by label.
pub fn snapshot() -> Vec<(String, QueryMetric)> {
    let mut entries: Vec<(String, QueryMetric)> = QUERY_METRICS
        .read()
        .map(|metrics| {
            metrics
                .iter()
                .map(|(label, metric)| (label.clone(), metric.clone()))
                .collect()
        })
        .unwrap_or_default();
    entries.sort_by(|a, b| a.0.cmp(&b.0));
    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulates_runs_per_label() {
        record_query("metrics-test:users", 3, 1.5);
        record_query("metrics-test:users", 4, 2.5);

        let (_, metric) = snapshot()
            .into_iter()
            .find(|(label, _)| label == "metrics-test:users")
            .unwrap();
        assert_eq!(metric.runs, 2);
        assert_eq!(metric.total_ms, 4.0);
        assert_eq!(metric.last_ms, 2.5);
        assert_eq!(metric.last_result_count, 4);
    }
}
