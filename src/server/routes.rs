//! HTTP route handlers.

use axum::{extract::State, response::Html, Json};
use tracing::warn;

use crate::types::{HealthResponse, HealthStatus};

use super::AppState;

const VERSION: &str = env!("CARGO_PKG_VERSION");

const INDEX_HTML: &str = include_str!("../../static/index.html");

/// GET /
pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// Health check endpoint
///
/// GET /api/health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let indexed_tracks = match state.storage.count().await {
        Ok(count) => Some(count),
        Err(e) => {
            warn!(error = %e, "Vector index unavailable");
            None
        }
    };

    let storage_ready = indexed_tracks.is_some();
    let status = if storage_ready {
        HealthStatus::Healthy
    } else {
        HealthStatus::Degraded
    };

    Json(HealthResponse {
        status,
        version: VERSION.to_string(),
        uptime_seconds: state.uptime_seconds(),
        mode: state.pipeline.mode().to_string(),
        storage: state.config.storage.mode.to_string(),
        storage_ready,
        indexed_tracks,
    })
}
