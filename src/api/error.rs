//! JSON error responses.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::error;

use crate::error::{ConversationError, LlmError, StorageError};

/// An error rendered as `{"error": message}` with a matching status.
#[derive(Debug)]
pub enum ApiError {
    MethodNotAllowed,
    BadRequest(String),
    NotFound(String),
    /// A collaborator is not configured.
    Unavailable(String),
    /// A collaborator failed.
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> &str {
        match self {
            Self::MethodNotAllowed => "Method Not Allowed",
            Self::BadRequest(m) | Self::NotFound(m) | Self::Unavailable(m) | Self::Internal(m) => m,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() && status != StatusCode::SERVICE_UNAVAILABLE {
            error!(status = status.as_u16(), error = self.message(), "Request failed");
        }
        (status, Json(json!({ "error": self.message() }))).into_response()
    }
}

impl From<LlmError> for ApiError {
    fn from(e: LlmError) -> Self {
        if e.is_not_configured() {
            Self::Unavailable("GEMINI_API_KEY is not configured".to_string())
        } else {
            Self::Internal(e.to_string())
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(e: StorageError) -> Self {
        if e.is_not_configured() {
            Self::Unavailable("Supabase is not configured".to_string())
        } else {
            Self::Internal(e.to_string())
        }
    }
}

impl From<ConversationError> for ApiError {
    fn from(e: ConversationError) -> Self {
        match e {
            ConversationError::SessionNotFound(_) => Self::NotFound(e.to_string()),
            ConversationError::EmptyMessage
            | ConversationError::FlowComplete
            | ConversationError::FlowInProgress => Self::BadRequest(e.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collaborator_errors_map_to_status() {
        assert_eq!(
            ApiError::from(LlmError::NotConfigured).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        let upstream = LlmError::RequestFailed {
            provider: "gemini".into(),
            reason: "timeout".into(),
        };
        assert_eq!(ApiError::from(upstream).status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            ApiError::from(StorageError::NotConfigured).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ApiError::from(StorageError::RequestFailed("refused".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn conversation_errors_map_to_client_status() {
        assert_eq!(
            ApiError::from(ConversationError::EmptyMessage).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(ConversationError::SessionNotFound("session_x".into())).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(ApiError::MethodNotAllowed.message(), "Method Not Allowed");
    }
}
