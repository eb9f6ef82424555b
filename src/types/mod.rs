//! Request and response types for the HTTP API.

pub mod search;

use serde::{Deserialize, Serialize};

pub use search::*;

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    pub uptime_seconds: u64,
    /// Pipeline shape this deployment runs
    pub mode: String,
    /// Vector index backend
    pub storage: String,
    /// Whether the index answered the health probe
    pub storage_ready: bool,
    /// Entries in the index, absent when the index could not be reached
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indexed_tracks: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
}
