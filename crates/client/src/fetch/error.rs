//! HTTP transport error types.

use std::sync::Arc;

use httpcache_core::TransportFailure;

/// Errors from the HTTP transport.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    /// The URL could not be parsed or joined.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// Request timeout.
    #[error("request timeout: {0}")]
    Timeout(Arc<reqwest::Error>),

    /// The host could not be connected to.
    #[error("connection failed: {0}")]
    Connect(Arc<reqwest::Error>),

    /// Response body exceeded the configured limit.
    #[error("response too large: {size} bytes exceeds {limit}")]
    TooLarge { size: usize, limit: usize },

    /// Any other network error.
    #[error("network error: {0}")]
    Network(Arc<reqwest::Error>),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout(Arc::new(err))
        } else if err.is_connect() {
            TransportError::Connect(Arc::new(err))
        } else {
            TransportError::Network(Arc::new(err))
        }
    }
}

impl From<url::ParseError> for TransportError {
    fn from(err: url::ParseError) -> Self {
        TransportError::InvalidUrl(err.to_string())
    }
}

impl From<TransportError> for TransportFailure {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Timeout(_) | TransportError::Connect(_) | TransportError::Network(_) => {
                TransportFailure::Unreachable(err.to_string())
            }
            TransportError::InvalidUrl(_) | TransportError::TooLarge { .. } => {
                TransportFailure::Rejected(err.to_string())
            }
        }
    }
}
