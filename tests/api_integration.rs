//! Integration tests for API endpoints.
//!
//! The router runs against an in-memory index with scripted embedding and
//! chat clients, so no network access is needed.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum_test::TestServer;
use serde_json::{json, Value};

use moodmatch::config::{AppConfig, PipelineMode, StorageMode};
use moodmatch::embedding::{EmbeddingClient, EmbeddingError};
use moodmatch::llm::{ChatMessage, ChatModel, LlmError};
use moodmatch::server::{create_router, AppState};
use moodmatch::storage::{MemoryStorage, TrackMetadata, VectorStorage};

const RECOMMENDATIONS: &str = "Midnight City - M83 - Synthpop, Electronic\n\
    Mr. Brightside - The Killers - Rock\n\
    Titanium - David Guetta - EDM, Pop\n\
    Levels - Avicii - House\n\
    Hey Ya! - OutKast - Hip Hop, Funk";

#[derive(Default)]
struct CountingEmbedder {
    calls: Mutex<Vec<String>>,
}

#[async_trait]
impl EmbeddingClient for CountingEmbedder {
    fn model(&self) -> &str {
        "test-embedding"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.calls.lock().unwrap().push(text.to_string());
        Ok(vec![1.0, 0.0])
    }
}

/// Answers the analysis prompt, then the recommendation prompt.
struct ScriptedChat {
    fail: bool,
}

#[async_trait]
impl ChatModel for ScriptedChat {
    fn model(&self) -> &str {
        "test-chat"
    }

    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, LlmError> {
        if self.fail {
            return Err(LlmError::Api {
                status: 401,
                message: "invalid api key".to_string(),
            });
        }

        let prompt = &messages[messages.len() - 1].content;
        if prompt.contains("Song Title - Artist - Genre1, Genre2") {
            Ok(RECOMMENDATIONS.to_string())
        } else {
            Ok("Fast tempo and bright synths.".to_string())
        }
    }
}

fn test_config(mode: PipelineMode) -> AppConfig {
    let mut config = AppConfig::default();
    config.storage.mode = StorageMode::Memory;
    config.search.mode = mode;
    config
}

async fn seeded_storage() -> Arc<MemoryStorage> {
    let storage = Arc::new(MemoryStorage::new(2));
    let tracks = [
        ("spotify:track:a", "Dancing Queen", "ABBA", [1.0, 0.0]),
        ("spotify:track:b", "September", "Earth, Wind & Fire", [0.9, 0.1]),
        ("spotify:track:c", "Hey Ya!", "OutKast", [0.7, 0.3]),
        ("spotify:track:d", "Hurt", "Johnny Cash", [0.0, 1.0]),
    ];

    for (uri, name, artist, vector) in tracks {
        let text = format!(
            "name: {name}\nartist: {artist}\nalbum: Hits\npopularity: 80\npreview_url: None\nuri: {uri}"
        );
        let metadata = TrackMetadata::new(uri, name)
            .with_text(text)
            .with_artists(vec![artist.to_string()]);
        storage.upsert(uri, &vector, metadata).await.unwrap();
    }
    storage
}

struct Harness {
    server: TestServer,
    embedder: Arc<CountingEmbedder>,
}

async fn create_test_server(mode: PipelineMode, chat_fails: bool) -> Harness {
    let embedder = Arc::new(CountingEmbedder::default());
    let storage: Arc<dyn VectorStorage> = seeded_storage().await;
    let state = AppState::new(
        test_config(mode),
        embedder.clone(),
        storage,
        Arc::new(ScriptedChat { fail: chat_fails }),
    );

    Harness {
        server: TestServer::new(create_router(state)).unwrap(),
        embedder,
    }
}

#[tokio::test]
async fn test_health_endpoint() {
    let harness = create_test_server(PipelineMode::Recommend, false).await;

    let response = harness.server.get("/api/health").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["mode"], "recommend");
    assert_eq!(body["storage"], "memory");
    assert_eq!(body["storage_ready"], true);
    assert_eq!(body["indexed_tracks"], 4);
}

#[tokio::test]
async fn test_index_page() {
    let harness = create_test_server(PipelineMode::Recommend, false).await;

    let response = harness.server.get("/").await;

    response.assert_status_ok();
    assert!(response.text().contains("MOODMATCH"));
}

#[tokio::test]
async fn test_search_recommends_five_songs() {
    let harness = create_test_server(PipelineMode::Recommend, false).await;

    let response = harness
        .server
        .post("/api/search")
        .json(&json!({ "mood": "energetic" }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();

    let matches = body["matches"].as_array().unwrap();
    assert_eq!(matches.len(), 5);
    assert_eq!(matches[0]["id"], "rec_0");
    assert_eq!(matches[0]["metadata"]["track_name"], "Midnight City");
    assert_eq!(matches[0]["metadata"]["artist_name"], "M83");
    assert_eq!(matches[0]["metadata"]["genres"], json!(["Synthpop", "Electronic"]));

    let sources = body["sourceSongs"].as_array().unwrap();
    assert_eq!(sources.len(), 3);
    assert_eq!(sources[0]["name"], "Dancing Queen");
    assert_eq!(sources[0]["artist"], "ABBA");
    assert_eq!(sources[0]["preview_url"], Value::Null);

    assert_eq!(body["analysis"], "Fast tempo and bright synths.");

    let calls = harness.embedder.calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].contains("energetic"));
}

#[tokio::test]
async fn test_search_matches_mode() {
    let harness = create_test_server(PipelineMode::Matches, true).await;

    let response = harness
        .server
        .post("/api/search")
        .json(&json!({ "mood": "happy" }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    let matches = body["matches"].as_array().unwrap();
    assert_eq!(matches.len(), 3);
    assert_eq!(matches[0]["metadata"]["track_name"], "Dancing Queen");
    assert!(matches[0]["score"].as_f64().unwrap() > 0.99);
    assert!(body.get("analysis").is_none());
}

#[tokio::test]
async fn test_search_rejects_blank_mood() {
    let harness = create_test_server(PipelineMode::Recommend, false).await;

    let response = harness
        .server
        .post("/api/search")
        .json(&json!({ "mood": "   " }))
        .await;

    response.assert_status_bad_request();
    response.assert_json(&json!({ "message": "No mood provided" }));
    assert!(harness.embedder.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_search_rejects_missing_mood() {
    let harness = create_test_server(PipelineMode::Recommend, false).await;

    let response = harness.server.post("/api/search").json(&json!({})).await;

    response.assert_status_bad_request();
    response.assert_json(&json!({ "message": "No mood provided" }));
}

#[tokio::test]
async fn test_search_rejects_malformed_body() {
    let harness = create_test_server(PipelineMode::Recommend, false).await;

    let response = harness.server.post("/api/search").text("{mood").await;

    response.assert_status_bad_request();
    let body: Value = response.json();
    assert_eq!(body["message"], "Invalid request body");
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_search_upstream_failure() {
    let harness = create_test_server(PipelineMode::Recommend, true).await;

    let response = harness
        .server
        .post("/api/search")
        .json(&json!({ "mood": "calm" }))
        .await;

    response.assert_status_internal_server_error();
    let body: Value = response.json();
    assert_eq!(body["message"], "An unexpected error occurred");
    assert!(body["error"].as_str().unwrap().contains("invalid api key"));
}

#[tokio::test]
async fn test_search_route_rejects_get() {
    let harness = create_test_server(PipelineMode::Recommend, false).await;

    let response = harness.server.get("/api/search").await;

    response.assert_status(axum::http::StatusCode::METHOD_NOT_ALLOWED);
}
