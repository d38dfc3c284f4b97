use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

/// Failures at the generative-AI boundary.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GatewayError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("request timed out")]
    Timeout,

    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("unreadable response envelope: {0}")]
    MalformedEnvelope(String),

    #[error("response carried no candidate text")]
    EmptyReply,

    #[error("structured reply was not valid JSON: {0}")]
    InvalidStructuredReply(String),

    #[error("generation task failed: {0}")]
    TaskFailed(String),
}

impl GatewayError {
    /// The message shown to the user for this failure.
    pub fn user_message(&self) -> String {
        match self {
            GatewayError::Transport(_)
            | GatewayError::Timeout
            | GatewayError::Status { .. }
            | GatewayError::TaskFailed(_) => {
                format!("An error occurred while calling the AI model: {}", self)
            }
            GatewayError::MalformedEnvelope(_)
            | GatewayError::EmptyReply
            | GatewayError::InvalidStructuredReply(_) => {
                "Failed to get a valid response from the AI model. Please try again.".to_string()
            }
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GatewayError::Timeout
        } else if err.is_decode() {
            GatewayError::MalformedEnvelope(err.to_string())
        } else {
            GatewayError::Transport(err.to_string())
        }
    }
}

/// Errors returned to HTTP clients.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Unknown session {0}")]
    SessionNotFound(Uuid),

    #[error("Unknown chapter {0}")]
    ChapterNotFound(usize),

    #[error("Invalid upload: {0}")]
    BadUpload(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::SessionNotFound(_) | ApiError::ChapterNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadUpload(_) => StatusCode::BAD_REQUEST,
        };

        let body = Json(json!({
            "success": false,
            "error": self.to_string(),
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_failures_name_the_cause() {
        let err = GatewayError::Status {
            status: 503,
            message: "overloaded".to_string(),
        };
        assert_eq!(
            err.user_message(),
            "An error occurred while calling the AI model: HTTP 503: overloaded"
        );
    }

    #[test]
    fn test_shape_failures_share_one_message() {
        for err in [
            GatewayError::EmptyReply,
            GatewayError::MalformedEnvelope("eof".to_string()),
            GatewayError::InvalidStructuredReply("eof".to_string()),
        ] {
            assert_eq!(
                err.user_message(),
                "Failed to get a valid response from the AI model. Please try again."
            );
        }
    }

    #[test]
    fn test_api_error_status_codes() {
        let response = ApiError::ChapterNotFound(7).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = ApiError::BadUpload("not UTF-8".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
