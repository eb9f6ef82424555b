//! HTTP server setup and routing.

mod extractors;
mod routes;
mod search;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Instant;
use tower_http::trace::TraceLayer;

use crate::config::AppConfig;
use crate::embedding::EmbeddingClient;
use crate::llm::ChatModel;
use crate::pipeline::MoodSearchPipeline;
use crate::storage::VectorStorage;

pub use extractors::JsonBody;

/// Shared application state passed to all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub pipeline: Arc<MoodSearchPipeline>,
    /// Same index the pipeline searches, kept for health probes
    pub storage: Arc<dyn VectorStorage>,
    /// Server start time for uptime calculation
    pub started_at: Instant,
}

impl AppState {
    /// Build the state and the search pipeline from configured clients.
    pub fn new(
        config: AppConfig,
        embedder: Arc<dyn EmbeddingClient>,
        storage: Arc<dyn VectorStorage>,
        chat: Arc<dyn ChatModel>,
    ) -> Self {
        let pipeline =
            MoodSearchPipeline::new(embedder, storage.clone(), chat, config.search.clone());

        Self {
            config: Arc::new(config),
            pipeline: Arc::new(pipeline),
            storage,
            started_at: Instant::now(),
        }
    }

    /// Get uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

/// Creates the application router with all routes configured
pub fn create_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(routes::health))
        .route("/search", post(search::search));

    Router::new()
        .route("/", get(routes::index))
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
