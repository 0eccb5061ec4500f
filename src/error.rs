//! Error handling for the nurse directory client

use std::fmt;
use thiserror::Error;

use crate::validation::ValidationError;

/// Unified error type for the nurse directory client
#[derive(Error, Debug)]
pub enum Error {
    /// Network or transport related errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization or deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing errors
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// Inline image decoding errors
    #[error("Image decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    /// Local preference file errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The server answered with a non-2xx status
    #[error("Request failed with status {status}: {message}")]
    Status { status: u16, message: String },

    /// The server answered 2xx without a usable payload
    #[error("Empty response body (status {status})")]
    EmptyBody { status: u16 },

    /// Local input validation failed before any request was made
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// Session persistence errors
    #[error("Session error: {0}")]
    Session(String),

    /// General errors
    #[error("{0}")]
    General(String),
}

impl Error {
    /// Create a new session error
    pub fn session<T: fmt::Display>(msg: T) -> Self {
        Error::Session(msg.to_string())
    }

    /// Create a new general error
    pub fn general<T: fmt::Display>(msg: T) -> Self {
        Error::General(msg.to_string())
    }

    /// HTTP status code carried by the error, if the server answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Status { status, .. } | Error::EmptyBody { status } => Some(*status),
            Error::Http(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Whether the request never produced an HTTP response
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Http(err) if err.status().is_none())
    }

    /// Whether the server rejected the request as conflicting with existing data
    /// (taken username or empty fields)
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::Status { status: 400 | 409, .. })
    }

    /// Short form for user-facing messages: the bare status code when the
    /// server answered, the error text otherwise
    pub fn summary(&self) -> String {
        match self {
            Error::Status { status, .. } => status.to_string(),
            Error::EmptyBody { .. } => "empty response".to_string(),
            other => other.to_string(),
        }
    }
}

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        let err = Error::Status {
            status: 400,
            message: "duplicate".to_string(),
        };
        assert_eq!(err.status(), Some(400));
        assert!(err.is_conflict());
        assert!(!err.is_transport());

        let err = Error::Status {
            status: 500,
            message: String::new(),
        };
        assert!(!err.is_conflict());

        assert_eq!(err.summary(), "500");

        let err = Error::EmptyBody { status: 204 };
        assert_eq!(err.status(), Some(204));
        assert_eq!(err.summary(), "empty response");
        assert_eq!(err.to_string(), "Empty response body (status 204)");
    }

    #[test]
    fn test_validation_message_passes_through() {
        let err: Error = ValidationError::PasswordTooShort.into();
        assert_eq!(
            err.to_string(),
            "Password must be at least 8 characters long"
        );
        assert_eq!(err.status(), None);
    }
}
