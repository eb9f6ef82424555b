//! MoodMatch server - Entry Point

use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use moodmatch::{
    config::AppConfig,
    embedding::OpenAiEmbeddings,
    llm::OpenAiChat,
    server,
    storage::open_storage,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    init_logging();

    info!("Starting MoodMatch");

    // Missing credentials are fatal here rather than on the first search
    let config = AppConfig::load().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    let openai = &config.openai;
    info!(
        embedding_model = %openai.embedding_model,
        chat_model = %openai.chat_model,
        storage = %config.storage.mode,
        mode = %config.search.mode,
        top_k = config.search.top_k,
        "Configuration loaded"
    );

    let api_key = openai.require_api_key()?;
    let embedder = OpenAiEmbeddings::new(
        &openai.base_url,
        api_key,
        &openai.embedding_model,
        openai.timeout(),
        openai.retry_policy(),
    )
    .context("Failed to create embedding client")?;
    let chat = OpenAiChat::new(
        &openai.base_url,
        api_key,
        &openai.chat_model,
        openai.timeout(),
        openai.retry_policy(),
    )
    .context("Failed to create chat client")?;

    let storage = open_storage(&config.storage, openai.embedding_dimensions)
        .context("Failed to open vector index")?;
    storage
        .initialize()
        .await
        .context("Failed to initialize vector index")?;

    let addr = config.server.socket_addr()?;

    // Create app state
    let state = server::AppState::new(config, Arc::new(embedder), storage, Arc::new(chat));

    // Create router
    let app = server::create_router(state);

    // Bind to socket
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!(%addr, "Server listening");

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Initialize the tracing subscriber for logging
fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "moodmatch=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        }
        () = terminate => {
            info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
