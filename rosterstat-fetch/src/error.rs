//! Fetch error types.

use std::time::Duration;

use rosterstat_core::ErrorKind;
use thiserror::Error;

// ============================================================================
// Main Fetch Error
// ============================================================================

/// Error type for fetch operations.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The upstream reported 404.
    #[error("Not found: {url}")]
    NotFound {
        /// Requested URL.
        url: String,
    },

    /// The upstream rejected the bearer token (401 or 403).
    #[error("Unauthorized (HTTP {status})")]
    Unauthorized {
        /// HTTP status code.
        status: u16,
    },

    /// Rate limited by the upstream.
    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited {
        /// Server-supplied wait, if any.
        retry_after: Option<Duration>,
    },

    /// Request timed out.
    #[error("Request timed out")]
    Timeout,

    /// Network failure or 5xx response.
    #[error("Transient error: {0}")]
    Transient(String),

    /// The upstream rejected the request with a non-retryable 4xx status.
    #[error("HTTP {status}: {body}")]
    HttpStatus {
        /// HTTP status code.
        status: u16,
        /// Truncated response body.
        body: String,
    },

    /// Invalid response from the upstream.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The OAuth token endpoint could not issue a token.
    #[error("Auth provider down: {0}")]
    AuthProviderDown(String),

    /// Every allowed attempt failed.
    #[error("Gave up after {attempts} attempts: {last}")]
    RetriesExhausted {
        /// Attempts made.
        attempts: u32,
        /// Error from the final attempt.
        last: Box<FetchError>,
    },

    /// The run was cancelled.
    #[error("Cancelled")]
    Cancelled,

    /// The HTTP client or a request could not be built.
    #[error("Client error: {0}")]
    Client(String),
}

impl FetchError {
    /// Classifies the error into the shared failure taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Unauthorized { .. } => ErrorKind::Unauthorized,
            Self::RateLimited { .. } => ErrorKind::RateLimited,
            Self::Timeout | Self::Transient(_) => ErrorKind::TransientNetwork,
            Self::HttpStatus { .. } | Self::Client(_) => ErrorKind::MalformedRequest,
            Self::InvalidResponse(_) | Self::Json(_) => ErrorKind::MalformedResponse,
            Self::AuthProviderDown(_) => ErrorKind::AuthProviderDown,
            Self::RetriesExhausted { last, .. } => last.kind(),
            Self::Cancelled => ErrorKind::Cancelled,
        }
    }

    /// Returns the server-supplied wait for rate-limit errors.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } => *retry_after,
            Self::RetriesExhausted { last, .. } => last.retry_after(),
            _ => None,
        }
    }

    /// Returns the number of attempts if retries were exhausted.
    pub fn attempts(&self) -> Option<u32> {
        match self {
            Self::RetriesExhausted { attempts, .. } => Some(*attempts),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else if err.is_builder() {
            FetchError::Client(err.to_string())
        } else {
            FetchError::Transient(err.to_string())
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
