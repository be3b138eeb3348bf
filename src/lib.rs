// src/lib.rs
// Public library surface for integration tests and the Shuttle binary.

pub mod aggregator;
pub mod api;
pub mod config;
pub mod dimension;
pub mod ingest;
pub mod metrics;
pub mod window;

// ---- Re-exports for stable public API ----
pub use crate::aggregator::{Aggregator, AnalysisResult, Analyzer};
pub use crate::api::{router, AppState};
pub use crate::dimension::Dimension;
pub use crate::ingest::sse_client::SseClient;

use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use tracing::info;

use crate::config::AppConfig;

/// Build the full application router: SSE client → aggregator → HTTP routes,
/// plus `/metrics` when enabled.
pub fn app(config: &AppConfig) -> Result<Router> {
    let client = SseClient::from_config(&config.feed);
    info!(
        feed_url = client.url(),
        max_window_secs = ?config.analysis.max_window_secs,
        metrics = config.metrics.enabled,
        "building analyzer app"
    );

    let state = AppState::new(Arc::new(Aggregator::new(client)))
        .with_max_window(config.analysis.max_window());
    let mut router = api::router(state);

    if config.metrics.enabled {
        let metrics = crate::metrics::Metrics::global()?;
        router = router.merge(metrics.router());
    }
    Ok(router)
}

/// Same as [`app`], with configuration resolved from env + config files.
pub fn app_from_env() -> Result<Router> {
    let config = AppConfig::load_default()?;
    app(&config)
}
