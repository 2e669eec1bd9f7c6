//! Client error types

use crate::types::ApiErrorBody;
use thiserror::Error;

/// Client error types
#[derive(Debug, Error)]
pub enum ClientError {
    /// Network or request error
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Server returned an error status
    #[error("Server error {status}: {message}")]
    ServerError { status: u16, message: String },

    /// Authentication failed or the token was rejected
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Resource not found
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Bad request
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Forbidden, e.g. an admin-only endpoint called by a user
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Duplicate registration, course or membership
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Configuration(String),
}

impl ClientError {
    /// Create error from HTTP status code and raw response body
    pub fn from_status(status: reqwest::StatusCode, body: String) -> Self {
        let message = extract_message(&body).unwrap_or_else(|| {
            if body.trim().is_empty() {
                status.to_string()
            } else {
                body
            }
        });

        match status.as_u16() {
            400 => Self::BadRequest(message),
            401 => Self::AuthenticationFailed(message),
            403 => Self::Forbidden(message),
            404 => Self::NotFound(message),
            409 => Self::Conflict(message),
            _ => Self::ServerError {
                status: status.as_u16(),
                message,
            },
        }
    }

    /// Whether the backend rejected the bearer token
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::AuthenticationFailed(_))
    }

    /// Whether the request never produced an HTTP response
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Request(e) if e.is_connect() || e.is_timeout())
    }
}

fn extract_message(body: &str) -> Option<String> {
    let parsed: ApiErrorBody = serde_json::from_str(body).ok()?;
    parsed.error.or(parsed.message).or(parsed.msg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn maps_status_codes() {
        assert!(matches!(
            ClientError::from_status(StatusCode::UNAUTHORIZED, String::new()),
            ClientError::AuthenticationFailed(_)
        ));
        assert!(matches!(
            ClientError::from_status(StatusCode::CONFLICT, String::new()),
            ClientError::Conflict(_)
        ));
        assert!(matches!(
            ClientError::from_status(StatusCode::BAD_GATEWAY, String::new()),
            ClientError::ServerError { status: 502, .. }
        ));
    }

    #[test]
    fn prefers_backend_error_field() {
        let err = ClientError::from_status(
            StatusCode::BAD_REQUEST,
            r#"{"error": "No available spots in this course"}"#.to_string(),
        );
        assert_eq!(err.to_string(), "Bad request: No available spots in this course");
    }

    #[test]
    fn falls_back_to_raw_body() {
        let err = ClientError::from_status(StatusCode::FORBIDDEN, "nope".to_string());
        assert_eq!(err.to_string(), "Forbidden: nope");
    }

    #[test]
    fn only_unauthorized_counts_as_expired() {
        assert!(ClientError::AuthenticationFailed("x".into()).is_auth_expired());
        assert!(!ClientError::Forbidden("x".into()).is_auth_expired());
    }
}
