use config::{Config, ConfigError, Environment};
use serde::Deserialize;
use std::net::SocketAddr;
use std::time::Duration;

use crate::retry::RetryPolicy;

/// Application configuration loaded from environment variables.
///
/// All settings can be configured via environment variables with the `MOODMATCH_` prefix
/// and `__` between nested keys. For example: `MOODMATCH_SERVER__PORT=3000`,
/// `MOODMATCH_OPENAI__API_KEY=sk-...`, `MOODMATCH_STORAGE__INDEX_NAME=saved-tracks`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Embedding and chat completion service
    #[serde(default)]
    pub openai: OpenAiConfig,

    /// Vector index configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// Mood search pipeline configuration
    #[serde(default)]
    pub search: SearchConfig,

    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiConfig {
    /// Bearer key for the embedding and chat endpoints (required)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Base URL of an OpenAI-compatible API
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// Dimensionality of vectors produced by `embedding_model`
    #[serde(default = "default_embedding_dimensions")]
    pub embedding_dimensions: usize,

    #[serde(default = "default_chat_model")]
    pub chat_model: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Retries for transient failures (connect errors, timeouts, 429, 5xx)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            embedding_model: default_embedding_model(),
            embedding_dimensions: default_embedding_dimensions(),
            chat_model: default_chat_model(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-ada-002".to_string()
}

fn default_embedding_dimensions() -> usize {
    1536
}

fn default_chat_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    2
}

impl OpenAiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            ..RetryPolicy::default()
        }
    }

    /// Returns the API key or a descriptive error naming the variable to set
    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        match self.api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => Ok(key),
            _ => Err(ConfigError::Message(
                "MOODMATCH_OPENAI__API_KEY is not set".to_string(),
            )),
        }
    }
}

/// Vector index backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageMode {
    /// Qdrant server or Qdrant Cloud
    #[default]
    Qdrant,
    /// In-process index, lost on restart
    Memory,
}

impl std::fmt::Display for StorageMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageMode::Qdrant => write!(f, "qdrant"),
            StorageMode::Memory => write!(f, "memory"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub mode: StorageMode,

    /// Qdrant server URL (e.g., http://localhost:6334 or https://xxx.cloud.qdrant.io:6334)
    #[serde(default = "default_qdrant_url")]
    pub url: String,

    /// API key for Qdrant Cloud or authenticated instances
    #[serde(default)]
    pub api_key: Option<String>,

    /// Name of the collection holding the ingested tracks
    #[serde(default)]
    pub index_name: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            mode: StorageMode::default(),
            url: default_qdrant_url(),
            api_key: None,
            index_name: None,
        }
    }
}

fn default_qdrant_url() -> String {
    "http://localhost:6334".to_string()
}

impl StorageConfig {
    pub fn require_index_name(&self) -> Result<&str, ConfigError> {
        match self.index_name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => Ok(name),
            _ => Err(ConfigError::Message(
                "MOODMATCH_STORAGE__INDEX_NAME is not set".to_string(),
            )),
        }
    }
}

/// Which stages of the mood search pipeline run for every request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineMode {
    /// Return the nearest indexed tracks only
    Matches,
    /// Nearest tracks plus a model-written explanation
    Analyze,
    /// Nearest tracks, explanation, and five fresh recommendations
    #[default]
    Recommend,
}

impl std::fmt::Display for PipelineMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineMode::Matches => write!(f, "matches"),
            PipelineMode::Analyze => write!(f, "analyze"),
            PipelineMode::Recommend => write!(f, "recommend"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    #[serde(default)]
    pub mode: PipelineMode,

    /// Number of nearest neighbours fetched per query
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Similarity floor; hits below it are dropped by the index
    #[serde(default)]
    pub min_score: Option<f32>,

    /// Wrap the mood in the keyword template before embedding
    #[serde(default = "default_expand_context")]
    pub expand_context: bool,

    /// Return raw matches instead of failing when a language model stage fails
    #[serde(default)]
    pub fallback_to_matches: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            mode: PipelineMode::default(),
            top_k: default_top_k(),
            min_score: None,
            expand_context: default_expand_context(),
            fallback_to_matches: false,
        }
    }
}

fn default_top_k() -> usize {
    3
}

fn default_expand_context() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

impl ServerConfig {
    /// Returns the socket address for binding the server
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| ConfigError::Message(format!("Invalid server address: {e}")))
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// `.env.local` and `.env` in the working directory are read first when present;
    /// variables already set in the process environment win.
    /// - `MOODMATCH_OPENAI__API_KEY` -> openai.api_key
    /// - `MOODMATCH_STORAGE__INDEX_NAME` -> storage.index_name
    /// - `MOODMATCH_SEARCH__TOP_K` -> search.top_k
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::from_filename(".env.local").ok();
        dotenvy::dotenv().ok();

        let config = Config::builder()
            .add_source(
                Environment::with_prefix("MOODMATCH")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Check that everything the service needs at first use is present.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.openai.require_api_key()?;

        if self.openai.embedding_dimensions == 0 {
            return Err(ConfigError::Message(
                "MOODMATCH_OPENAI__EMBEDDING_DIMENSIONS must be greater than 0".to_string(),
            ));
        }

        if self.storage.mode == StorageMode::Qdrant {
            self.storage.require_index_name()?;
        }

        if self.search.top_k == 0 {
            return Err(ConfigError::Message(
                "MOODMATCH_SEARCH__TOP_K must be greater than 0".to_string(),
            ));
        }

        self.server.socket_addr()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.openai.api_key = Some("sk-test".to_string());
        config.storage.index_name = Some("saved-tracks".to_string());
        config
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();

        assert_eq!(config.openai.embedding_model, "text-embedding-ada-002");
        assert_eq!(config.openai.embedding_dimensions, 1536);
        assert_eq!(config.openai.chat_model, "gpt-3.5-turbo");
        assert_eq!(config.storage.mode, StorageMode::Qdrant);
        assert_eq!(config.search.mode, PipelineMode::Recommend);
        assert_eq!(config.search.top_k, 3);
        assert!(config.search.expand_context);
        assert!(!config.search.fallback_to_matches);
        assert_eq!(config.server.port, 3000);
    }

    #[test]
    fn test_socket_addr() {
        let server = ServerConfig::default();
        let addr = server.socket_addr().unwrap();
        assert_eq!(addr.port(), 3000);
    }

    #[test]
    fn test_invalid_socket_addr() {
        let server = ServerConfig {
            host: "not a host".to_string(),
            port: 80,
        };
        assert!(server.socket_addr().is_err());
    }

    #[test]
    fn test_validate_accepts_complete_config() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_validate_requires_api_key() {
        let mut config = valid_config();
        config.openai.api_key = Some("   ".to_string());

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("MOODMATCH_OPENAI__API_KEY"));
    }

    #[test]
    fn test_validate_requires_index_name_for_qdrant() {
        let mut config = valid_config();
        config.storage.index_name = None;

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("MOODMATCH_STORAGE__INDEX_NAME"));

        config.storage.mode = StorageMode::Memory;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_top_k() {
        let mut config = valid_config();
        config.search.top_k = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_modes_deserialize_lowercase() {
        let mode: PipelineMode = serde_json::from_str(r#""analyze""#).unwrap();
        assert_eq!(mode, PipelineMode::Analyze);

        let storage: StorageMode = serde_json::from_str(r#""memory""#).unwrap();
        assert_eq!(storage, StorageMode::Memory);
    }

    #[test]
    fn test_retry_policy_from_config() {
        let mut config = OpenAiConfig::default();
        config.max_retries = 5;
        assert_eq!(config.retry_policy().max_retries, 5);
    }
}
