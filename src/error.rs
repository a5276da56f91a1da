//! Request-time errors and their HTTP mapping

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::search::SearchError;

/// Errors that end a request. Each maps to one HTTP response.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Together API error {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("Bad API response: {0}")]
    MalformedResponse(String),

    #[error("Failed to reach upstream: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Search failed: {0}")]
    Search(#[from] SearchError),

    #[error("IMAGE_API_KEY is not set")]
    ImageNotConfigured,

    #[error("Image API error {status}: {body}")]
    ImageUpstream { status: u16, body: String },
}

impl ServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::Transport(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        tracing::error!(status = %status, error = %self, "Request failed");
        (status, Json(serde_json::json!({ "detail": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[test]
    fn test_upstream_error_message_embeds_status_and_body() {
        let err = ServiceError::Upstream {
            status: 429,
            body: "rate limited".to_string(),
        };
        assert_eq!(err.to_string(), "Together API error 429: rate limited");
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_into_response_detail_body() {
        let resp = ServiceError::MalformedResponse("missing choices[0].message.content".to_string()).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = to_bytes(resp.into_body(), 1024).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["detail"], "Bad API response: missing choices[0].message.content");
    }

    #[test]
    fn test_image_not_configured_message() {
        assert_eq!(ServiceError::ImageNotConfigured.to_string(), "IMAGE_API_KEY is not set");
    }
}
