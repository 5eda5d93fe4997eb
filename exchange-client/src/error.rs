//! Client error types

use shared::error::ErrorCode;
use thiserror::Error;

/// Client error type
///
/// `Api` is a definite rejection: the server processed the request and
/// refused it, so nothing was applied. Every other variant leaves the
/// server-side outcome unknown.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Server answered with an error envelope
    #[error("API error {code}: {message}")]
    Api { code: ErrorCode, message: String },

    /// Request timed out; it may or may not have been applied
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Could not reach the server
    #[error("Connection failed: {0}")]
    Connect(String),

    /// Response was not a well-formed envelope
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Other HTTP transport failure
    #[error("HTTP error: {0}")]
    Http(reqwest::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_connect() {
            Self::Connect(err.to_string())
        } else {
            Self::Http(err)
        }
    }
}

impl ClientError {
    /// Server-side error code, when the server answered
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            Self::Api { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Whether the request may have been applied despite the error
    pub fn is_ambiguous(&self) -> bool {
        !matches!(self, Self::Api { .. })
    }
}

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;
