use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::pipeline::PipelineError;

/// Message sent with every 500 response; the detail goes in `error`.
pub const UNEXPECTED_ERROR_MESSAGE: &str = "An unexpected error occurred";

/// Application-level errors
#[derive(Debug, Error)]
pub enum AppError {
    /// Rejected input, the message is shown to the user as is
    #[error("{0}")]
    BadRequest(String),

    /// The request body could not be read as JSON
    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    /// Embedding, vector index or chat service failure
    #[error("Upstream error: {0}")]
    Upstream(String),
}

impl AppError {
    /// Returns the appropriate HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) | Self::InvalidBody(_) => StatusCode::BAD_REQUEST,
            Self::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Body of the error response
    pub fn to_response_body(&self) -> ErrorResponse {
        match self {
            Self::BadRequest(message) => ErrorResponse {
                message: message.clone(),
                error: None,
            },
            Self::InvalidBody(detail) => ErrorResponse {
                message: "Invalid request body".to_string(),
                error: Some(detail.clone()),
            },
            Self::Upstream(detail) => ErrorResponse {
                message: UNEXPECTED_ERROR_MESSAGE.to_string(),
                error: Some(detail.clone()),
            },
        }
    }
}

impl From<PipelineError> for AppError {
    fn from(e: PipelineError) -> Self {
        if e.is_validation() {
            Self::BadRequest(e.to_string())
        } else {
            Self::Upstream(e.to_string())
        }
    }
}

/// Error response body structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }
        (status, Json(self.to_response_body())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LlmError;

    #[test]
    fn test_empty_mood_is_bad_request() {
        let err = AppError::from(PipelineError::EmptyMood);
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

        let body = serde_json::to_value(err.to_response_body()).unwrap();
        assert_eq!(body, serde_json::json!({ "message": "No mood provided" }));
    }

    #[test]
    fn test_upstream_failure_envelope() {
        let err = AppError::from(PipelineError::Llm(LlmError::Timeout));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = err.to_response_body();
        assert_eq!(body.message, UNEXPECTED_ERROR_MESSAGE);
        assert_eq!(body.error.as_deref(), Some("Request timeout"));
    }

    #[test]
    fn test_invalid_body_carries_detail() {
        let err = AppError::InvalidBody("expected value at line 1".to_string());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

        let body = err.to_response_body();
        assert_eq!(body.message, "Invalid request body");
        assert!(body.error.is_some());
    }

    #[test]
    fn test_every_pipeline_failure_maps_to_a_variant() {
        let cases = [
            (PipelineError::EmptyMood, StatusCode::BAD_REQUEST),
            (
                PipelineError::Llm(LlmError::InvalidResponse("empty".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (source, expected) in cases {
            let err = AppError::from(source);
            match &err {
                AppError::BadRequest(_) => assert_eq!(expected, StatusCode::BAD_REQUEST),
                AppError::Upstream(_) => assert_eq!(expected, StatusCode::INTERNAL_SERVER_ERROR),
                AppError::InvalidBody(_) => panic!("pipeline errors never map to InvalidBody"),
            }
            assert_eq!(err.status_code(), expected);
        }
    }
}
