use actix_web::HttpResponse;
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::utils::metrics as query_metrics;

static REQUEST_COUNT: AtomicU64 = AtomicU64::new(0);
static ERROR_COUNT: AtomicU64 = AtomicU64::new(0);

pub fn increment_request_count() {
    REQUEST_COUNT.fetch_add(1, Ordering::Relaxed);
}

pub fn increment_error_count() {
    ERROR_COUNT.fetch_add(1, Ordering::Relaxed);
}

#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct MetricsResponse {
    pub http_requests_total: u64,
    pub http_errors_total: u64,
}

fn render() -> String {
    let requests = REQUEST_COUNT.load(Ordering::Relaxed);
    let errors = ERROR_COUNT.load(Ordering::Relaxed);

    let mut metrics = format!(
        "# HELP http_requests_total Total number of HTTP requests\n\
         # TYPE http_requests_total counter\n\
         http_requests_total {}\n\
         \n\
         # HELP http_errors_total Total number of HTTP errors\n\
         # TYPE http_errors_total counter\n\
         http_errors_total {}\n",
        requests, errors
    );

    let queries = query_metrics::snapshot();
    if !queries.is_empty() {
        metrics.push_str(
            "\n# HELP query_runs_total Profiled query executions\n\
             # TYPE query_runs_total counter\n",
        );
        for (label, metric) in &queries {
            let _ = writeln!(metrics, "query_runs_total{{label=\"{}\"}} {}", escape(label), metric.runs);
        }
        metrics.push_str(
            "\n# HELP query_last_duration_ms Duration of the latest profiled run\n\
             # TYPE query_last_duration_ms gauge\n",
        );
        for (label, metric) in &queries {
            let _ = writeln!(
                metrics,
                "query_last_duration_ms{{label=\"{}\"}} {}",
                escape(label),
                metric.last_ms
            );
        }
    }
    metrics
}

fn escape(label: &str) -> String {
    label.replace('\\', "\\\\").replace('"', "\\\"")
}

#[utoipa::path(
    get,
    path = "/metrics",
    tag = "Health",
    responses(
        (status = 200, description = "System metrics", body = MetricsResponse)
    )
)]
pub async fn get_metrics() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(render())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_profiled_query_series() {
        query_metrics::record_query("metrics-render \"quoted\"", 2, 0.5);
        let body = render();
        assert!(body.contains("http_requests_total"));
        assert!(body.contains("query_runs_total{label=\"metrics-render \\\"quoted\\\"\"}"));
    }
}
