//! # Errors
//!
//! Error types shared by the client core, the endpoint bindings and the stores.
//!
//! [`ApiError`] is what every network-facing operation returns. It keeps enough
//! of the failed response (status, URL, decoded body) for callers to build a
//! user-facing message with [`ApiError::user_message`], which mirrors how the
//! notification surface picks a description: the body's `message`, then its
//! `detail`, then the error text itself.

use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

use crate::{tokens::TokenStoreError, validation::ValidationError};

#[derive(Debug, Error)]
pub enum ApiError {
    /// The backend answered with a non-success status.
    #[error("request to {url} failed with status {status}")]
    Status {
        status: StatusCode,
        url: String,
        body: Value,
    },

    /// Connection, TLS or timeout failure before a status was received.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),

    /// The shared token refresh failed; the session is gone.
    #[error("session refresh failed: {0}")]
    RefreshFailed(String),

    #[error("not authenticated")]
    Unauthenticated,

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    TokenStore(#[from] TokenStoreError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    /// HTTP status of the failed response, if one was received.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Transport(err) => err.status(),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(StatusCode::UNAUTHORIZED)
    }

    /// Decoded response body of a failed request (`Value::Null` when absent).
    pub fn body(&self) -> Option<&Value> {
        match self {
            ApiError::Status { body, .. } => Some(body),
            _ => None,
        }
    }

    /// Best-effort human readable description of the failure.
    ///
    /// Looks for a `message` and then a `detail` string in the response body,
    /// falls back to the error's own text, and finally to `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        if let Some(body) = self.body() {
            for key in ["message", "detail"] {
                if let Some(text) = body.get(key).and_then(Value::as_str) {
                    if !text.trim().is_empty() {
                        return text.to_string();
                    }
                }
            }
        }

        let text = self.to_string();
        if text.trim().is_empty() {
            fallback.to_string()
        } else {
            text
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn status_error(body: Value) -> ApiError {
        ApiError::Status {
            status: StatusCode::BAD_REQUEST,
            url: "http://localhost/api/products".to_string(),
            body,
        }
    }

    #[test]
    fn test_user_message_prefers_body_message() {
        let err = status_error(json!({ "message": "Part number is required", "detail": "x" }));
        assert_eq!(err.user_message("Failed"), "Part number is required");
    }

    #[test]
    fn test_user_message_uses_detail_when_message_missing() {
        let err = status_error(json!({ "detail": "Conversation not found" }));
        assert_eq!(err.user_message("Failed"), "Conversation not found");
    }

    #[test]
    fn test_user_message_falls_back_to_error_text() {
        let err = status_error(Value::Null);
        assert_eq!(
            err.user_message("Failed"),
            "request to http://localhost/api/products failed with status 400 Bad Request"
        );
    }

    #[test]
    fn test_status_accessors() {
        let err = ApiError::Status {
            status: StatusCode::UNAUTHORIZED,
            url: "u".into(),
            body: Value::Null,
        };
        assert!(err.is_unauthorized());
        assert_eq!(err.status(), Some(StatusCode::UNAUTHORIZED));
        assert!(!ApiError::Unauthenticated.is_unauthorized());
    }
}
