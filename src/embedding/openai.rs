//! OpenAI-compatible `/embeddings` client.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::{EmbeddingClient, EmbeddingError};
use crate::retry::RetryPolicy;

/// Embedding client for any service speaking the OpenAI embeddings protocol
/// (OpenAI, Together, a local gateway).
pub struct OpenAiEmbeddings {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    retry: RetryPolicy,
}

impl std::fmt::Debug for OpenAiEmbeddings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiEmbeddings")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

impl OpenAiEmbeddings {
    /// Create a new client.
    ///
    /// # Arguments
    /// * `base_url` - API root including the version segment (e.g. "https://api.openai.com/v1").
    /// * `api_key` - Bearer token.
    /// * `model` - Embedding model (e.g. "text-embedding-ada-002").
    /// * `timeout` - Per-attempt request timeout.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
        retry: RetryPolicy,
    ) -> Result<Self, EmbeddingError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EmbeddingError::Connection(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            retry,
        })
    }

    async fn request_once(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let url = format!("{}/embeddings", self.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&EmbeddingRequest {
                model: &self.model,
                input: text,
            })
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    EmbeddingError::Timeout
                } else {
                    EmbeddingError::Connection(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::InvalidResponse(e.to_string()))?;

        let embedding = parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| EmbeddingError::InvalidResponse("Response contained no data".into()))?;

        if embedding.is_empty() {
            return Err(EmbeddingError::InvalidResponse(
                "Response contained an empty vector".into(),
            ));
        }

        Ok(embedding)
    }
}

#[async_trait]
impl EmbeddingClient for OpenAiEmbeddings {
    fn model(&self) -> &str {
        &self.model
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if text.trim().is_empty() {
            return Err(EmbeddingError::EmptyInput);
        }

        debug!(model = %self.model, chars = text.len(), "Requesting embedding");

        let embedding = self
            .retry
            .run("embed", || self.request_once(text))
            .await?;

        debug!(dim = embedding.len(), "Embedding received");
        Ok(embedding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> OpenAiEmbeddings {
        OpenAiEmbeddings::new(
            "http://127.0.0.1:9/v1/",
            "sk-test",
            "text-embedding-ada-002",
            Duration::from_millis(200),
            RetryPolicy::none(),
        )
        .unwrap()
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        assert_eq!(client().base_url, "http://127.0.0.1:9/v1");
    }

    #[test]
    fn test_debug_hides_api_key() {
        let debug = format!("{:?}", client());
        assert!(!debug.contains("sk-test"));
        assert!(debug.contains("text-embedding-ada-002"));
    }

    #[tokio::test]
    async fn test_empty_text_rejected_without_request() {
        let err = client().embed("   ").await.unwrap_err();
        assert!(matches!(err, EmbeddingError::EmptyInput));
    }

    #[test]
    fn test_response_parsing() {
        let json = r#"{"object":"list","data":[{"object":"embedding","index":0,"embedding":[0.1,-0.2,0.3]}],"model":"m"}"#;
        let parsed: EmbeddingResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.data[0].embedding, vec![0.1, -0.2, 0.3]);
    }
}
