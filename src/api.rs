use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use metrics::{counter, histogram};
use tower_http::cors::CorsLayer;

use crate::aggregator::{AnalysisResult, Analyzer};
use crate::dimension::Dimension;
use crate::window::{parse_window, WindowParseError};

#[derive(Clone)]
pub struct AppState {
    pub analyzer: Arc<dyn Analyzer>,
    /// Longest window a caller may request; `None` means unlimited.
    pub max_window: Option<Duration>,
}

impl AppState {
    pub fn new(analyzer: Arc<dyn Analyzer>) -> Self {
        Self {
            analyzer,
            max_window: None,
        }
    }

    pub fn with_max_window(mut self, max_window: Option<Duration>) -> Self {
        self.max_window = max_window;
        self
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/analysis", get(analysis))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(Debug, serde::Deserialize)]
pub struct AnalysisQuery {
    #[serde(default)]
    duration: Option<String>,
    #[serde(default)]
    dimension: Option<String>,
}

/// Rejections for `/analysis`; all are client errors with a plain-text body.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid duration: {0}")]
    Duration(#[from] WindowParseError),
    #[error("Invalid duration: exceeds maximum window of {}s", .0.as_secs())]
    WindowTooLong(Duration),
    #[error("Invalid dimension: {0}")]
    Dimension(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (StatusCode::BAD_REQUEST, self.to_string()).into_response()
    }
}

async fn analysis(
    State(state): State<AppState>,
    Query(q): Query<AnalysisQuery>,
) -> Result<Json<AnalysisResult>, ApiError> {
    let window = parse_window(q.duration.as_deref().unwrap_or_default())?;
    if let Some(max) = state.max_window {
        if window > max {
            return Err(ApiError::WindowTooLong(max));
        }
    }

    let raw_dimension = q.dimension.unwrap_or_default();
    let dimension: Dimension = raw_dimension
        .parse()
        .map_err(|_| ApiError::Dimension(raw_dimension.clone()))?;

    let started = Instant::now();
    let result = state.analyzer.analyze(window, dimension).await;
    let elapsed_ms = started.elapsed().as_secs_f64() * 1_000.0;

    counter!("analysis_requests_total", "dimension" => dimension.as_str()).increment(1);
    histogram!("analysis_posts").record(result.total_posts as f64);
    histogram!("analysis_latency_ms").record(elapsed_ms);
    tracing::info!(
        target: "analysis",
        %dimension,
        window_ms = window.as_millis() as u64,
        total_posts = result.total_posts,
        avg_value = result.average_value,
        elapsed_ms,
        "analysis served"
    );

    Ok(Json(result))
}
