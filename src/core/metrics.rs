use std::sync::OnceLock;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::core::config::Settings;

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub(crate) fn init(settings: &Settings) -> anyhow::Result<()> {
    if !settings.telemetry().prometheus_enabled || PROM_HANDLE.get().is_some() {
        return Ok(());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    let _ = PROM_HANDLE.set(handle);
    describe();
    Ok(())
}

pub(crate) fn render() -> Option<String> {
    PROM_HANDLE.get().map(|handle| handle.render())
}

fn describe() {
    metrics::describe_counter!(
        "grading_jobs_total",
        "Grading round-trips by terminal outcome (graded, service_unavailable, schema_violation)"
    );
    metrics::describe_histogram!(
        "grading_duration_seconds",
        metrics::Unit::Seconds,
        "Wall time of one grading round-trip including reconciliation"
    );
    metrics::describe_counter!(
        "generation_requests_total",
        "Assignment content generation calls by outcome"
    );
    metrics::describe_counter!(
        "generation_questions_rejected_total",
        "Generated questions dropped by validation"
    );
    metrics::describe_counter!("http_requests_total", "HTTP responses by status code");
    metrics::describe_histogram!(
        "http_request_duration_seconds",
        metrics::Unit::Seconds,
        "HTTP request latency by status code"
    );
}
