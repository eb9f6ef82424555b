//! Qdrant vector database implementation.

use async_trait::async_trait;
use qdrant_client::qdrant::{
    point_id::PointIdOptions, CreateCollectionBuilder, Distance, PointId, PointStruct,
    SearchPointsBuilder, UpsertPointsBuilder, Value as QdrantValue, VectorParamsBuilder,
};
use qdrant_client::{Payload, Qdrant};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{
    check_dimension, AudioFeatures, SearchResult, StorageError, TrackMetadata, VectorStorage,
};

/// Qdrant-based vector storage implementation
pub struct QdrantStorage {
    client: Arc<Qdrant>,
    /// Collection holding the ingested tracks
    collection: String,
    /// Vector size the collection is created with
    dimension: usize,
}

impl std::fmt::Debug for QdrantStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QdrantStorage")
            .field("collection", &self.collection)
            .field("dimension", &self.dimension)
            .finish()
    }
}

impl QdrantStorage {
    /// Create a new Qdrant storage client
    pub fn new(
        url: &str,
        api_key: Option<String>,
        collection: impl Into<String>,
        dimension: usize,
    ) -> Result<Self, StorageError> {
        let collection = collection.into();
        info!(%url, %collection, has_api_key = api_key.is_some(), "Connecting to Qdrant");

        let mut builder = Qdrant::from_url(url);

        if let Some(key) = api_key {
            builder = builder.api_key(key);
        }

        let client = builder
            .build()
            .map_err(|e| StorageError::ConnectionFailed(e.to_string()))?;

        Ok(Self {
            client: Arc::new(client),
            collection,
            dimension,
        })
    }

    /// Convert TrackMetadata to Qdrant Payload
    fn metadata_to_payload(metadata: &TrackMetadata) -> Result<Payload, StorageError> {
        let mut payload = json!({
            "uri": metadata.uri,
            "text": metadata.text,
            "name": metadata.name,
            "artists": metadata.artists,
            "album": metadata.album,
            "genres": metadata.genres,
        });

        if let Some(ref features) = metadata.audio_features {
            payload["audio_features"] = serde_json::to_value(features)
                .map_err(|e| StorageError::SerializationError(e.to_string()))?;
        }

        if let Some(ref added_at) = metadata.added_at {
            payload["added_at"] = json!(added_at);
        }

        Payload::try_from(payload).map_err(|e| StorageError::SerializationError(e.to_string()))
    }

    /// Convert Qdrant payload to TrackMetadata.
    ///
    /// Every field is optional; entries written by other tools may carry only
    /// the text blob, in which case `uri` is left empty.
    fn payload_to_metadata(payload: &HashMap<String, QdrantValue>) -> TrackMetadata {
        let uri = payload
            .get("uri")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .unwrap_or_default();

        let text = payload
            .get("text")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .unwrap_or_default();

        let name = payload
            .get("name")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .unwrap_or_default();

        let artists = Self::string_list(payload, "artists");
        let genres = Self::string_list(payload, "genres");

        let album = payload
            .get("album")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string());

        let added_at = payload
            .get("added_at")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string());

        let audio_features = payload
            .get("audio_features")
            .and_then(|v| v.as_struct())
            .map(|s| {
                let number = |key: &str| {
                    s.fields
                        .get(key)
                        .and_then(|v| v.as_double().or_else(|| v.as_integer().map(|i| i as f64)))
                };
                AudioFeatures {
                    danceability: number("danceability"),
                    energy: number("energy"),
                    key: number("key"),
                    loudness: number("loudness"),
                    mode: number("mode"),
                    speechiness: number("speechiness"),
                    acousticness: number("acousticness"),
                    instrumentalness: number("instrumentalness"),
                    liveness: number("liveness"),
                    valence: number("valence"),
                    tempo: number("tempo"),
                }
            });

        TrackMetadata {
            uri,
            text,
            name,
            artists,
            album,
            genres,
            audio_features,
            added_at,
        }
    }

    fn string_list(payload: &HashMap<String, QdrantValue>, key: &str) -> Vec<String> {
        payload
            .get(key)
            .and_then(|v| v.as_list())
            .map(|list| {
                list.iter()
                    .filter_map(|v| v.as_str())
                    .map(|s| s.to_string())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Identifier of a search hit: the payload URI, else the Qdrant point id.
    fn result_id(metadata: &TrackMetadata, point_id: Option<&PointId>) -> Option<String> {
        if !metadata.uri.is_empty() {
            return Some(metadata.uri.clone());
        }

        match point_id?.point_id_options.as_ref()? {
            PointIdOptions::Num(n) => Some(n.to_string()),
            PointIdOptions::Uuid(uuid) => Some(uuid.clone()),
        }
    }

    /// Generate a deterministic point ID from the track URI.
    ///
    /// Qdrant only accepts integers and UUIDs, so the URI is hashed into a
    /// UUIDv5; re-ingesting a URI always hits the same point.
    fn uri_to_point_id(uri: &str) -> PointId {
        PointId {
            point_id_options: Some(PointIdOptions::Uuid(
                uuid::Uuid::new_v5(&uuid::Uuid::NAMESPACE_URL, uri.as_bytes()).to_string(),
            )),
        }
    }
}

#[async_trait]
impl VectorStorage for QdrantStorage {
    async fn initialize(&self) -> Result<(), StorageError> {
        let exists = self
            .client
            .collection_exists(&self.collection)
            .await
            .map_err(|e| StorageError::ConnectionFailed(e.to_string()))?;

        if !exists {
            info!(collection = %self.collection, dim = self.dimension, "Creating collection");

            self.client
                .create_collection(
                    CreateCollectionBuilder::new(&self.collection).vectors_config(
                        VectorParamsBuilder::new(self.dimension as u64, Distance::Cosine),
                    ),
                )
                .await
                .map_err(|e| StorageError::OperationFailed(e.to_string()))?;

            info!(collection = %self.collection, "Collection created");
        } else {
            debug!(collection = %self.collection, "Collection already exists");
        }

        Ok(())
    }

    async fn upsert(
        &self,
        id: &str,
        embedding: &[f32],
        metadata: TrackMetadata,
    ) -> Result<(), StorageError> {
        check_dimension(self.dimension, embedding)?;

        let point_id = Self::uri_to_point_id(id);
        let payload = Self::metadata_to_payload(&metadata)?;

        debug!(collection = %self.collection, %id, "Upserting point");

        let point = PointStruct::new(point_id, embedding.to_vec(), payload);

        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection, vec![point]).wait(true))
            .await
            .map_err(|e| StorageError::OperationFailed(e.to_string()))?;

        Ok(())
    }

    async fn search(
        &self,
        query: &[f32],
        limit: usize,
        min_score: Option<f32>,
    ) -> Result<Vec<SearchResult>, StorageError> {
        check_dimension(self.dimension, query)?;

        debug!(collection = %self.collection, %limit, "Searching points");

        let mut search_builder =
            SearchPointsBuilder::new(&self.collection, query.to_vec(), limit as u64)
                .with_payload(true);

        if let Some(threshold) = min_score {
            search_builder = search_builder.score_threshold(threshold);
        }

        let response = self
            .client
            .search_points(search_builder)
            .await
            .map_err(|e| StorageError::OperationFailed(e.to_string()))?;

        let results = response
            .result
            .into_iter()
            .filter_map(|scored_point| {
                let metadata = Self::payload_to_metadata(&scored_point.payload);
                if metadata.uri.is_empty() {
                    warn!(
                        collection = %self.collection,
                        point = ?scored_point.id,
                        "Search hit has no uri in its payload, using the point id"
                    );
                }

                let Some(id) = Self::result_id(&metadata, scored_point.id.as_ref()) else {
                    warn!(collection = %self.collection, "Search hit has no id, skipping");
                    return None;
                };

                Some(SearchResult {
                    id,
                    score: scored_point.score,
                    metadata,
                })
            })
            .collect();

        Ok(results)
    }

    async fn count(&self) -> Result<u64, StorageError> {
        let info = self
            .client
            .collection_info(&self.collection)
            .await
            .map_err(|e| StorageError::OperationFailed(e.to_string()))?;

        Ok(info.result.and_then(|r| r.points_count).unwrap_or(0))
    }
}
