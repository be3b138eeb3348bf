//! Post Stream Analyzer — Binary Entrypoint
//! Boots the Axum HTTP server that samples the upstream SSE feed per request.

use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DEFAULT_LOG_FILTER: &str = "post_stream_analyzer=info,sse=info,analysis=info,warn";

/// Compact tracing logs; `RUST_LOG` overrides the default filter.
/// A no-op when the runtime has already installed a subscriber.
fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .try_init();
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    // This enables FEED_URL / ANALYZER_CONFIG_PATH from .env.
    let _ = dotenvy::dotenv();

    init_tracing();

    let router = post_stream_analyzer::app_from_env()?;
    Ok(router.into())
}
