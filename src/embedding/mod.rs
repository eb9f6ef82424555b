//! Text embedding clients.
//!
//! Ingestion and search both go through [`EmbeddingClient`] so that indexed
//! tracks and mood queries land in the same vector space.

mod openai;

pub use openai::OpenAiEmbeddings;

use async_trait::async_trait;

use crate::retry::Retryable;

/// Errors that can occur when requesting an embedding
#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
    #[error("Cannot embed empty text")]
    EmptyInput,

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Embedding request timed out")]
    Timeout,

    #[error("Embedding API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid embedding response: {0}")]
    InvalidResponse(String),
}

impl Retryable for EmbeddingError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Connection(_) | Self::Timeout => true,
            Self::Api { status, .. } => *status == 429 || *status >= 500,
            Self::EmptyInput | Self::InvalidResponse(_) => false,
        }
    }
}

/// Turns text into a fixed-length vector.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Model identifier, for logging
    fn model(&self) -> &str;

    /// Embed a single non-empty text. Every call is a live round trip.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;
}
