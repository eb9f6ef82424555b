//! Mood search route handler.

use axum::{extract::State, Json};
use tracing::info;

use crate::error::AppError;
use crate::types::{SearchRequest, SearchResponse};

use super::extractors::JsonBody;
use super::AppState;

/// POST /api/search
///
/// Find indexed songs for a free-text mood and, depending on the configured
/// mode, explain them and recommend new ones.
pub async fn search(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<SearchRequest>,
) -> Result<Json<SearchResponse>, AppError> {
    let mood = req.mood.unwrap_or_default();
    let outcome = state.pipeline.search(&mood).await?;

    info!(
        matches = outcome.matches.len(),
        recommendations = outcome.recommendations.as_ref().map_or(0, Vec::len),
        "Mood search complete"
    );

    Ok(Json(outcome.into()))
}
