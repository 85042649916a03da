//! Normalized upstream errors.

use std::sync::Arc;

use reqwest::StatusCode;
use thiserror::Error;

/// Maximum number of body characters used as an error message.
const MAX_MESSAGE_CHARS: usize = 200;

/// Errors from the backend or recommendation service.
///
/// Cheap to clone so a failed fetch can be shared by every caller waiting on
/// the same cache key.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// The request never produced a response.
    #[error("HTTP error: {0}")]
    Http(#[source] Arc<reqwest::Error>),

    /// Any other non-success status.
    #[error("API returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited, retry after the given number of seconds.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// The body was not the JSON we expected.
    #[error("JSON parse error: {0}")]
    Decode(#[source] Arc<serde_json::Error>),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(Arc::new(err))
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(Arc::new(err))
    }
}

impl ApiError {
    /// Build an error from a non-success response.
    pub(crate) fn from_response(status: StatusCode, retry_after: Option<u64>, body: &str) -> Self {
        let message = extract_message(status, body);
        match status {
            StatusCode::UNAUTHORIZED => Self::Unauthorized(message),
            StatusCode::FORBIDDEN => Self::Forbidden(message),
            StatusCode::NOT_FOUND => Self::NotFound(message),
            StatusCode::TOO_MANY_REQUESTS => Self::RateLimited(retry_after.unwrap_or(1)),
            _ => Self::Status {
                status: status.as_u16(),
                message,
            },
        }
    }

    /// HTTP status behind this error, if there was a response.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Unauthorized(_) => Some(401),
            Self::Forbidden(_) => Some(403),
            Self::NotFound(_) => Some(404),
            Self::RateLimited(_) => Some(429),
            Self::Http(_) | Self::Decode(_) => None,
        }
    }

    /// Whether an idempotent request may be retried.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Http(_) => true,
            Self::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }

    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Message safe to show to a visitor.
    ///
    /// Client errors (validation, conflicts) carry the backend's own message;
    /// everything else gets a generic sentence.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Status { status, message } if *status < 500 && !message.is_empty() => {
                message.clone()
            }
            Self::Unauthorized(message) if !message.is_empty() => message.clone(),
            Self::Unauthorized(_) => "Please sign in to continue.".to_string(),
            Self::Forbidden(_) => "You don't have access to that.".to_string(),
            Self::NotFound(_) => "We couldn't find what you were looking for.".to_string(),
            Self::RateLimited(_) => {
                "Too many requests. Please wait a moment and try again.".to_string()
            }
            Self::Http(_) => "We couldn't reach the shop right now. Please try again.".to_string(),
            Self::Status { .. } | Self::Decode(_) => {
                "Something went wrong on our side. Please try again.".to_string()
            }
        }
    }
}

/// Pick the most useful message out of an error body.
///
/// Prefers the JSON `message` or `error` field, then the start of the raw
/// body, then the status reason phrase.
fn extract_message(status: StatusCode, body: &str) -> String {
    if let Ok(serde_json::Value::Object(map)) = serde_json::from_str::<serde_json::Value>(body) {
        for field in ["message", "error"] {
            if let Some(serde_json::Value::String(message)) = map.get(field)
                && !message.trim().is_empty()
            {
                return message.trim().to_string();
            }
        }
    }

    let trimmed = body.trim();
    if !trimmed.is_empty() {
        return trimmed.chars().take(MAX_MESSAGE_CHARS).collect();
    }

    status
        .canonical_reason()
        .map_or_else(|| status.as_str().to_string(), ToString::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_from_json_fields() {
        let err = ApiError::from_response(
            StatusCode::BAD_REQUEST,
            None,
            r#"{"message":"Product already reviewed"}"#,
        );
        assert_eq!(err.to_string(), "API returned 400: Product already reviewed");
        assert_eq!(err.user_message(), "Product already reviewed");

        let err = ApiError::from_response(StatusCode::CONFLICT, None, r#"{"error":"Email taken"}"#);
        assert_eq!(err.user_message(), "Email taken");
    }

    #[test]
    fn test_message_from_raw_body_is_truncated() {
        let body = "x".repeat(500);
        let ApiError::Status { message, .. } =
            ApiError::from_response(StatusCode::BAD_GATEWAY, None, &body)
        else {
            panic!("expected status error");
        };
        assert_eq!(message.len(), 200);
    }

    #[test]
    fn test_message_falls_back_to_reason() {
        let err = ApiError::from_response(StatusCode::NOT_FOUND, None, "");
        assert!(matches!(err, ApiError::NotFound(ref m) if m == "Not Found"));
    }

    #[test]
    fn test_status_mapping() {
        assert!(matches!(
            ApiError::from_response(StatusCode::UNAUTHORIZED, None, "{}"),
            ApiError::Unauthorized(_)
        ));
        assert!(matches!(
            ApiError::from_response(StatusCode::FORBIDDEN, None, ""),
            ApiError::Forbidden(_)
        ));
        assert!(matches!(
            ApiError::from_response(StatusCode::TOO_MANY_REQUESTS, Some(30), ""),
            ApiError::RateLimited(30)
        ));
    }

    #[test]
    fn test_server_errors_are_retryable_and_generic() {
        let err = ApiError::from_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            None,
            r#"{"message":"NullPointerException at line 42"}"#,
        );
        assert!(err.is_retryable());
        assert_eq!(err.status(), Some(500));
        assert!(!err.user_message().contains("NullPointer"));

        let not_found = ApiError::NotFound("gone".to_string());
        assert!(!not_found.is_retryable());
        assert!(not_found.is_not_found());
    }
}
