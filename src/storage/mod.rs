//! Vector storage module for track embeddings.
//!
//! This module provides a storage abstraction for the track index,
//! with implementations for:
//! - Qdrant (hosted/docker vector database)
//! - an in-process index for local runs and tests

mod memory;
#[cfg(feature = "storage")]
mod qdrant;

pub use memory::MemoryStorage;
#[cfg(feature = "storage")]
pub use qdrant::QdrantStorage;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::{StorageConfig, StorageMode};

/// Error type for storage operations
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Invalid embedding dimension: expected {expected}, got {got}")]
    InvalidDimension { expected: usize, got: usize },

    #[error("Storage operation failed: {0}")]
    OperationFailed(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// Audio analysis values attached to a saved track. Every field is optional
/// because the sync pipeline does not always have them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AudioFeatures {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub danceability: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub energy: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loudness: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speechiness: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acousticness: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instrumentalness: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub liveness: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tempo: Option<f64>,
}

/// Metadata stored with each embedding.
///
/// `text` is the canonical description the search path parses back; the
/// structured fields are derived from the same record at ingestion time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackMetadata {
    /// Track URI, also the entry identifier
    pub uri: String,
    /// Denormalized `key: value` description of the track
    pub text: String,
    /// Track name
    pub name: String,
    /// Artist names
    pub artists: Vec<String>,
    /// Album name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
    /// Genre tags
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_features: Option<AudioFeatures>,
    /// When the track was saved, as reported by the source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub added_at: Option<String>,
}

impl TrackMetadata {
    /// Create new track metadata
    pub fn new(uri: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    /// Builder method to set the text description
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Builder method to add artists
    pub fn with_artists(mut self, artists: Vec<String>) -> Self {
        self.artists = artists;
        self
    }

    /// Builder method to add album
    pub fn with_album(mut self, album: impl Into<String>) -> Self {
        self.album = Some(album.into());
        self
    }

    /// Builder method to add genres
    pub fn with_genres(mut self, genres: Vec<String>) -> Self {
        self.genres = genres;
        self
    }

    pub fn with_audio_features(mut self, features: AudioFeatures) -> Self {
        self.audio_features = Some(features);
        self
    }

    pub fn with_added_at(mut self, added_at: impl Into<String>) -> Self {
        self.added_at = Some(added_at.into());
        self
    }
}

/// Result of a similarity search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// Entry identifier (track URI)
    pub id: String,
    /// Similarity score, higher is closer
    pub score: f32,
    /// Track metadata
    pub metadata: TrackMetadata,
}

/// Trait for vector storage backends
#[async_trait]
pub trait VectorStorage: Send + Sync {
    /// Initialize storage and create the collection if needed
    async fn initialize(&self) -> Result<(), StorageError>;

    /// Insert or overwrite the entry at `id`
    async fn upsert(
        &self,
        id: &str,
        embedding: &[f32],
        metadata: TrackMetadata,
    ) -> Result<(), StorageError>;

    /// Up to `limit` entries by descending similarity. Entries scoring below
    /// `min_score` are left out; an empty index yields an empty list.
    async fn search(
        &self,
        query: &[f32],
        limit: usize,
        min_score: Option<f32>,
    ) -> Result<Vec<SearchResult>, StorageError>;

    /// Number of entries in the index
    async fn count(&self) -> Result<u64, StorageError>;
}

pub(crate) fn check_dimension(expected: usize, embedding: &[f32]) -> Result<(), StorageError> {
    if embedding.len() != expected {
        return Err(StorageError::InvalidDimension {
            expected,
            got: embedding.len(),
        });
    }
    Ok(())
}

/// Open the configured backend. Nothing is contacted until `initialize`.
pub fn open_storage(
    config: &StorageConfig,
    dimension: usize,
) -> Result<Arc<dyn VectorStorage>, StorageError> {
    match config.mode {
        StorageMode::Memory => Ok(Arc::new(MemoryStorage::new(dimension))),
        #[cfg(feature = "storage")]
        StorageMode::Qdrant => {
            let collection = config
                .require_index_name()
                .map_err(|e| StorageError::ConnectionFailed(e.to_string()))?;
            let storage =
                QdrantStorage::new(&config.url, config.api_key.clone(), collection, dimension)?;
            Ok(Arc::new(storage))
        }
        #[cfg(not(feature = "storage"))]
        StorageMode::Qdrant => Err(StorageError::ConnectionFailed(
            "Qdrant support requires the `storage` feature".to_string(),
        )),
    }
}
