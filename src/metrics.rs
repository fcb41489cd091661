use anyhow::Context;
use axum::{routing::get, Router};
use metrics::{describe_counter, describe_histogram, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the global Prometheus recorder. Call once per process.
    pub fn init(flush_interval_secs: u64) -> anyhow::Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("prometheus: install recorder")?;

        describe_counter!("sentiment_requests_total", "Headlines scored.");
        describe_counter!(
            "sentiment_errors_total",
            "Scoring calls that fell back to neutral."
        );
        describe_histogram!("sentiment_latency_ms", "Scoring latency in milliseconds.");
        gauge!("sentiment_metrics_flush_interval_secs").set(flush_interval_secs as f64);

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
