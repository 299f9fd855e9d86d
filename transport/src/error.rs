//! Error types for the transport layer

use thiserror::Error;

/// Errors that can occur when talking to the platform
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// HTTP request failed before a response arrived
    #[error("Request failed: {0}")]
    RequestFailed(String),

    /// Request body could not be serialized
    #[error("Failed to encode request: {0}")]
    Encode(String),

    /// Response did not match the expected shape
    #[error("Failed to parse response: {0}")]
    Decode(String),

    /// Rate limited - too many requests
    #[error("Rate limited - too many requests")]
    RateLimited,

    /// Unauthorized - invalid API key
    #[error("Unauthorized - invalid API key")]
    Unauthorized,

    /// API returned an error
    #[error("API error (status {status}): {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Response body
        message: String,
    },
}

impl TransportError {
    /// Whether the same request may succeed if sent again
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::RequestFailed(_) | Self::RateLimited => true,
            Self::ApiError { status, .. } => *status >= 500,
            Self::Encode(_) | Self::Decode(_) | Self::Unauthorized => false,
        }
    }
}
