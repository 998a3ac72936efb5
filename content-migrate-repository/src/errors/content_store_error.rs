//! Content store error types.
//!
//! This module defines the unified error type for all content store operations,
//! covering transport failures, non-success responses and unexpected payload shapes.

use thiserror::Error;

/// Unified errors from content store operations.
///
/// Used by the `ContentStore` trait and all of its implementations. A malformed
/// response is reported through the same type as a transport failure so callers
/// handle both the same way.
#[derive(Debug, Clone, Error)]
pub enum ContentStoreError {
    /// Failed to reach the store (DNS, connection refused, TLS, ...). Nothing was sent.
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// The connection broke after the request may have been sent.
    #[error("Request interrupted: {0}")]
    Interrupted(String),

    /// The request did not complete within the configured timeout.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// The store answered with a non-success status.
    #[error("HTTP {status} from {url}: {body}")]
    Status {
        status: u16,
        url: String,
        body: String,
    },

    /// The store answered with a payload of an unexpected shape.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Failed to build the request body.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// The addressed record does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Unknown error.
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl ContentStoreError {
    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::ConnectionError(msg.into())
    }

    /// Create an interrupted-request error.
    pub fn interrupted(msg: impl Into<String>) -> Self {
        Self::Interrupted(msg.into())
    }

    /// Create a timeout error.
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    /// Create a status error.
    pub fn status(status: u16, url: impl Into<String>, body: impl Into<String>) -> Self {
        Self::Status {
            status,
            url: url.into(),
            body: body.into(),
        }
    }

    /// Create a malformed response error.
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedResponse(msg.into())
    }

    /// Create a serialization error.
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::SerializationError(msg.into())
    }

    /// Create a not found error.
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an unknown error.
    pub fn unknown(msg: impl Into<String>) -> Self {
        Self::Unknown(msg.into())
    }

    /// Whether retrying the same request may succeed.
    ///
    /// Connection failures, timeouts, rate limiting (429) and server errors (5xx) are
    /// transient. Client errors and malformed payloads are not.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::ConnectionError(_) | Self::Interrupted(_) | Self::Timeout(_) => true,
            Self::Status { status, .. } => *status == 429 || (500..600).contains(status),
            _ => false,
        }
    }

    /// Whether the request certainly never reached the store.
    ///
    /// Only such failures may be retried for requests that are not idempotent.
    pub fn is_unsent(&self) -> bool {
        matches!(self, Self::ConnectionError(_))
    }
}

impl From<reqwest::Error> for ContentStoreError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_connect() {
            Self::ConnectionError(err.to_string())
        } else if err.is_request() {
            Self::Interrupted(err.to_string())
        } else if err.is_decode() {
            Self::MalformedResponse(err.to_string())
        } else if err.is_builder() {
            Self::SerializationError(err.to_string())
        } else {
            Self::Unknown(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ContentStoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::MalformedResponse(err.to_string())
    }
}
