//! Custom error types for the API client

use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

/// Error raised by every [`crate::ApiClient`] operation
#[derive(Error, Debug)]
pub enum ApiError {
    /// The backend rejected the bearer token; the session has been cleared
    #[error("Unauthorized - please sign in again")]
    Unauthorized,

    /// The requested record does not exist
    #[error("{0}")]
    NotFound(String),

    /// Input rejected locally before any request was sent
    #[error("Invalid request: {0}")]
    Validation(String),

    /// Any other non-2xx response
    #[error("{message}")]
    Status { status: StatusCode, message: String },

    /// The request never produced a response
    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),

    /// A 2xx response whose body could not be understood
    #[error("Unexpected response from server: {0}")]
    Decode(String),

    /// Reading a local file for upload failed
    #[error("Could not read file: {0}")]
    Io(#[from] std::io::Error),

    /// The configured base URL cannot be used
    #[error("Invalid API URL: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized)
    }

    /// HTTP status attached to the error, if the backend answered
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Unauthorized => Some(StatusCode::UNAUTHORIZED),
            ApiError::NotFound(_) => Some(StatusCode::NOT_FOUND),
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Type alias for API results
pub type ApiResult<T> = Result<T, ApiError>;

/// Extract a human readable message from an error body.
///
/// Understands `{"detail": "..."}`, validation-style `{"detail": [{"msg": ...}]}`,
/// `{"message": "..."}` and `{"error": "..."}`; falls back to the raw text.
pub(crate) fn error_message(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }

    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body) {
        for key in ["detail", "message", "error"] {
            match map.get(key) {
                Some(Value::String(message)) if !message.is_empty() => {
                    return Some(message.clone());
                }
                Some(Value::Array(items)) => {
                    let messages: Vec<&str> = items
                        .iter()
                        .filter_map(|item| item.get("msg").and_then(Value::as_str))
                        .collect();
                    if !messages.is_empty() {
                        return Some(messages.join("; "));
                    }
                }
                _ => {}
            }
        }
        return None;
    }

    Some(body.chars().take(500).collect())
}
