//! Ingestion of saved-track exports into the vector index.
//!
//! Input is newline-delimited JSON, one `{ "stream": ..., "data": ... }`
//! record per line. Each saved track is rendered into a `key: value` text
//! description, embedded, and upserted under its URI.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, info, warn};

use crate::embedding::{EmbeddingClient, EmbeddingError};
use crate::storage::{AudioFeatures, StorageError, TrackMetadata, VectorStorage};

/// Stream name of saved-track records in the export
pub const SAVED_TRACKS_STREAM: &str = "saved_tracks";

const UNKNOWN: &str = "unknown";

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Malformed record: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Track has no URI")]
    MissingUri,

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Failed to read input: {0}")]
    Io(#[from] std::io::Error),
}

/// One line of the export. `data` is only interpreted for the selected stream.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceRecord {
    pub stream: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedTrack {
    pub track: Track,
    #[serde(default)]
    pub added_at: Option<String>,
    #[serde(default)]
    pub artist_genres: Option<Vec<String>>,
    #[serde(default)]
    pub audio_features: Option<AudioFeatures>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Track {
    pub uri: String,
    pub name: String,
    #[serde(default)]
    pub artists: Vec<ArtistRef>,
    #[serde(default)]
    pub album: Option<AlbumRef>,
    #[serde(default)]
    pub duration_ms: u64,
    #[serde(default)]
    pub popularity: i64,
    #[serde(default)]
    pub preview_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtistRef {
    #[serde(default)]
    pub uri: Option<String>,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlbumRef {
    #[serde(default)]
    pub uri: Option<String>,
    pub name: String,
}

impl SavedTrack {
    fn artist_names(&self) -> Vec<String> {
        self.track.artists.iter().map(|a| a.name.clone()).collect()
    }

    fn genres(&self) -> Vec<String> {
        self.artist_genres.clone().unwrap_or_default()
    }

    /// Index payload for this track; `text` is the rendered description.
    pub fn to_metadata(&self) -> TrackMetadata {
        let mut metadata = TrackMetadata::new(&self.track.uri, &self.track.name)
            .with_text(format_track_text(self))
            .with_artists(self.artist_names())
            .with_genres(self.genres());

        if let Some(album) = &self.track.album {
            metadata = metadata.with_album(&album.name);
        }
        if let Some(features) = &self.audio_features {
            metadata = metadata.with_audio_features(features.clone());
        }
        if let Some(added_at) = &self.added_at {
            metadata = metadata.with_added_at(added_at);
        }
        metadata
    }
}

fn feature(value: Option<f64>) -> String {
    value.map_or_else(|| UNKNOWN.to_string(), |v| v.to_string())
}

/// Render the `key: value` description that is embedded and stored as `text`.
///
/// The first artist gets its own `artist:` line so the search side can read
/// it back without parsing the full list.
pub fn format_track_text(record: &SavedTrack) -> String {
    let track = &record.track;
    let mut lines = vec![format!("name: {}", track.name)];

    if let Some(first) = track.artists.first() {
        lines.push(format!("artist: {}", first.name));
    }

    let artists = track
        .artists
        .iter()
        .map(|a| format!("name: {}", a.name))
        .collect::<Vec<_>>()
        .join(", ");
    lines.push(format!("artists: {artists}"));

    if let Some(album) = &track.album {
        lines.push(format!("album: {}", album.name));
    }

    lines.push(format!("popularity: {}", track.popularity));
    lines.push(format!(
        "preview_url: {}",
        track.preview_url.as_deref().unwrap_or("None")
    ));
    lines.push(format!("uri: {}", track.uri));
    lines.push(format!("duration_ms: {}", track.duration_ms));

    if let Some(added_at) = &record.added_at {
        lines.push(format!("added_at: {added_at}"));
    }

    let genres = record.genres();
    lines.push(format!(
        "genres: {}",
        if genres.is_empty() {
            UNKNOWN.to_string()
        } else {
            genres.join(", ")
        }
    ));

    let features = record.audio_features.clone().unwrap_or_default();
    lines.push("audio_features: {".to_string());
    for (key, value) in [
        ("tempo", features.tempo),
        ("energy", features.energy),
        ("valence", features.valence),
        ("danceability", features.danceability),
        ("acousticness", features.acousticness),
        ("instrumentalness", features.instrumentalness),
    ] {
        lines.push(format!("  {key}: {}", feature(value)));
    }
    lines.push("}".to_string());

    lines.join("\n")
}

/// What happened to a single input line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineOutcome {
    Ingested,
    /// Blank line or a record from another stream
    Skipped,
}

/// Totals for one ingestion run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestSummary {
    pub processed: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Embeds saved tracks and writes them to the index, one at a time.
pub struct TrackIngestor {
    embedder: Arc<dyn EmbeddingClient>,
    storage: Arc<dyn VectorStorage>,
    stream: String,
}

impl TrackIngestor {
    pub fn new(embedder: Arc<dyn EmbeddingClient>, storage: Arc<dyn VectorStorage>) -> Self {
        Self {
            embedder,
            storage,
            stream: SAVED_TRACKS_STREAM.to_string(),
        }
    }

    /// Process records of `stream` instead of `saved_tracks`
    pub fn with_stream(mut self, stream: impl Into<String>) -> Self {
        self.stream = stream.into();
        self
    }

    /// Embed one track and upsert it by URI. Re-ingesting overwrites.
    pub async fn ingest_record(&self, record: &SavedTrack) -> Result<(), IngestError> {
        if record.track.uri.trim().is_empty() {
            return Err(IngestError::MissingUri);
        }

        let metadata = record.to_metadata();
        let embedding = self.embedder.embed(&metadata.text).await?;
        self.storage
            .upsert(&record.track.uri, &embedding, metadata)
            .await?;

        info!(
            uri = %record.track.uri,
            name = %record.track.name,
            artist = record.track.artists.first().map_or(UNKNOWN, |a| a.name.as_str()),
            "Ingested track"
        );
        Ok(())
    }

    pub async fn ingest_line(&self, line: &str) -> Result<LineOutcome, IngestError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(LineOutcome::Skipped);
        }

        let record: SourceRecord = serde_json::from_str(line)?;
        if record.stream != self.stream {
            debug!(stream = %record.stream, "Skipping record from other stream");
            return Ok(LineOutcome::Skipped);
        }

        let saved: SavedTrack = serde_json::from_value(record.data)?;
        self.ingest_record(&saved).await?;
        Ok(LineOutcome::Ingested)
    }

    /// Ingest every line of `reader`.
    ///
    /// Bad lines and failed tracks are logged and counted; only a failure to
    /// read the input ends the run early.
    pub async fn ingest_lines<R>(&self, reader: R) -> Result<IngestSummary, IngestError>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut summary = IngestSummary::default();
        let mut lines = reader.lines();
        let mut line_number = 0usize;

        while let Some(line) = lines.next_line().await? {
            line_number += 1;
            match self.ingest_line(&line).await {
                Ok(LineOutcome::Ingested) => summary.processed += 1,
                Ok(LineOutcome::Skipped) => summary.skipped += 1,
                Err(e) => {
                    warn!(line = line_number, error = %e, "Failed to ingest record");
                    summary.failed += 1;
                }
            }
        }

        info!(
            processed = summary.processed,
            skipped = summary.skipped,
            failed = summary.failed,
            "Ingestion finished"
        );
        Ok(summary)
    }
}
