use anyhow::{Context, Result};
use axum::{routing::get, Router};
use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

pub struct Metrics {
    pub handle: PrometheusHandle,
}

static GLOBAL: OnceCell<Metrics> = OnceCell::new();

impl Metrics {
    /// Install the process-wide Prometheus recorder (once) and describe the analysis series.
    ///
    /// Later calls return the already installed instance, so every router
    /// built in one process scrapes the same registry.
    pub fn global() -> Result<&'static Metrics> {
        GLOBAL.get_or_try_init(|| {
            // Use default buckets to avoid API differences across crate versions.
            let handle = PrometheusBuilder::new()
                .install_recorder()
                .context("prometheus: install recorder")?;

            describe_counter!(
                "analysis_requests_total",
                "Analysis requests served, by dimension."
            );
            describe_histogram!("analysis_posts", "Posts aggregated per analysis window.");
            describe_histogram!(
                "analysis_latency_ms",
                "Wall time per analysis request in milliseconds."
            );

            Ok(Self { handle })
        })
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
