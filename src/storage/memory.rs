//! In-process vector index with brute-force cosine search.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, warn};

use super::{check_dimension, SearchResult, StorageError, TrackMetadata, VectorStorage};

/// Helper trait to recover from poisoned RwLocks
trait RecoverableLock<T> {
    fn read_or_recover(&self) -> RwLockReadGuard<'_, T>;
    fn write_or_recover(&self) -> RwLockWriteGuard<'_, T>;
}

impl<T> RecoverableLock<T> for RwLock<T> {
    fn read_or_recover(&self) -> RwLockReadGuard<'_, T> {
        self.read().unwrap_or_else(|poisoned| {
            warn!("RwLock was poisoned during read, recovering");
            poisoned.into_inner()
        })
    }

    fn write_or_recover(&self) -> RwLockWriteGuard<'_, T> {
        self.write().unwrap_or_else(|poisoned| {
            warn!("RwLock was poisoned during write, recovering");
            poisoned.into_inner()
        })
    }
}

/// Cosine of the angle between `a` and `b`; 0.0 when either is empty, zero
/// or the lengths differ.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let (dot, norm_a, norm_b) = a
        .iter()
        .zip(b)
        .fold((0.0f32, 0.0f32, 0.0f32), |(dot, na, nb), (x, y)| {
            (dot + x * y, na + x * x, nb + y * y)
        });

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a.sqrt() * norm_b.sqrt())
}

struct Entry {
    embedding: Vec<f32>,
    metadata: TrackMetadata,
}

/// Vector index held in memory. Contents are lost when the process exits.
pub struct MemoryStorage {
    dimension: usize,
    entries: RwLock<HashMap<String, Entry>>,
}

impl std::fmt::Debug for MemoryStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStorage")
            .field("dimension", &self.dimension)
            .field("entries", &self.entries.read_or_recover().len())
            .finish()
    }
}

impl MemoryStorage {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            entries: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl VectorStorage for MemoryStorage {
    async fn initialize(&self) -> Result<(), StorageError> {
        Ok(())
    }

    async fn upsert(
        &self,
        id: &str,
        embedding: &[f32],
        metadata: TrackMetadata,
    ) -> Result<(), StorageError> {
        check_dimension(self.dimension, embedding)?;

        debug!(%id, "Upserting entry");
        self.entries.write_or_recover().insert(
            id.to_string(),
            Entry {
                embedding: embedding.to_vec(),
                metadata,
            },
        );
        Ok(())
    }

    async fn search(
        &self,
        query: &[f32],
        limit: usize,
        min_score: Option<f32>,
    ) -> Result<Vec<SearchResult>, StorageError> {
        check_dimension(self.dimension, query)?;

        let entries = self.entries.read_or_recover();
        let mut results: Vec<SearchResult> = entries
            .iter()
            .map(|(id, entry)| SearchResult {
                id: id.clone(),
                score: cosine_similarity(query, &entry.embedding),
                metadata: entry.metadata.clone(),
            })
            .filter(|r| min_score.map_or(true, |min| r.score >= min))
            .collect();

        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(limit);

        Ok(results)
    }

    async fn count(&self) -> Result<u64, StorageError> {
        Ok(self.entries.read_or_recover().len() as u64)
    }
}
