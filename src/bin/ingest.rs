//! Load a saved-tracks export into the vector index.
//!
//! Reads newline-delimited JSON records from a file or stdin:
//!
//! ```text
//! moodmatch-ingest --input saved_tracks.jsonl
//! airbyte-export | moodmatch-ingest
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::io::BufReader;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use moodmatch::{
    config::AppConfig,
    embedding::OpenAiEmbeddings,
    ingest::{TrackIngestor, SAVED_TRACKS_STREAM},
    storage::open_storage,
};

#[derive(Parser, Debug)]
#[command(name = "moodmatch-ingest")]
#[command(about = "Embed saved tracks and upsert them into the vector index")]
struct Args {
    /// NDJSON file to read; stdin when omitted
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Only records from this stream are ingested
    #[arg(short, long, default_value = SAVED_TRACKS_STREAM)]
    stream: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let args = Args::parse();

    let config = AppConfig::load().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    let openai = &config.openai;
    let embedder = OpenAiEmbeddings::new(
        &openai.base_url,
        openai.require_api_key()?,
        &openai.embedding_model,
        openai.timeout(),
        openai.retry_policy(),
    )
    .context("Failed to create embedding client")?;

    let storage = open_storage(&config.storage, openai.embedding_dimensions)
        .context("Failed to open vector index")?;
    storage
        .initialize()
        .await
        .context("Failed to initialize vector index")?;

    let ingestor = TrackIngestor::new(Arc::new(embedder), storage).with_stream(&args.stream);

    let summary = match &args.input {
        Some(path) => {
            info!(path = %path.display(), stream = %args.stream, "Ingesting from file");
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("Failed to open {}", path.display()))?;
            ingestor.ingest_lines(BufReader::new(file)).await?
        }
        None => {
            info!(stream = %args.stream, "Ingesting from stdin");
            ingestor
                .ingest_lines(BufReader::new(tokio::io::stdin()))
                .await?
        }
    };

    println!(
        "Ingested {} tracks ({} skipped, {} failed)",
        summary.processed, summary.skipped, summary.failed
    );
    Ok(())
}

fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "moodmatch=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
