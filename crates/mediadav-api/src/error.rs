//! Error types for the Immich API client

use thiserror::Error;

/// Result type for API operations
pub type Result<T> = std::result::Result<T, ApiError>;

/// Errors produced by [`crate::ImmichClient`]
#[derive(Debug, Error)]
pub enum ApiError {
    /// Transport failure or non-2xx status, after every retry attempt failed
    #[error("upstream request to {url} failed after {attempts} attempts: {source}")]
    UpstreamUnavailable {
        url: String,
        attempts: u32,
        #[source]
        source: reqwest::Error,
    },

    /// The response was 2xx but the body did not match the expected shape
    #[error("unexpected response body from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ApiError {
    /// Check if this error came from an unreachable or failing upstream
    /// (as opposed to a payload the client could not understand)
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::UpstreamUnavailable { .. })
    }
}
