// src/metrics.rs
//! Prometheus wiring and the counters the grader emits.
//! Without an installed recorder every call here is a no-op.

use axum::{routing::get, Router};
use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use std::time::Duration;

use crate::grade::Grade;

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the global Prometheus recorder. Call once per process.
    pub fn init() -> anyhow::Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .map_err(|e| anyhow::anyhow!("prometheus: install recorder: {e}"))?;
        ensure_described();
        Ok(Self { handle })
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}

/// One-time metric descriptions (so series show up on /metrics).
pub fn ensure_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("policy_scored_total", "Policy documents scored.");
        describe_counter!("policy_grade_total", "Scored documents by grade.");
        describe_histogram!("policy_score_ms", "Scoring time in milliseconds.");
        describe_counter!(
            "batch_fetch_errors_total",
            "Policy pages that could not be fetched."
        );
        describe_counter!(
            "batch_scoring_timeouts_total",
            "Documents that exceeded the scoring deadline."
        );
    });
}

pub fn record_scored(grade: Grade, elapsed: Duration) {
    counter!("policy_scored_total").increment(1);
    counter!("policy_grade_total", "grade" => grade.as_str()).increment(1);
    histogram!("policy_score_ms").record(elapsed.as_secs_f64() * 1_000.0);
}

pub fn record_fetch_error() {
    counter!("batch_fetch_errors_total").increment(1);
}

pub fn record_timeout() {
    counter!("batch_scoring_timeouts_total").increment(1);
}
