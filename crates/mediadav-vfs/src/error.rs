//! Error types for the VFS core
//!
//! Absence and misuse are distinct outcomes: [`VfsError::NotFound`] is the
//! normal "no such resource" signal the protocol layer maps to 404, while
//! [`VfsError::UnsupportedGroup`] marks a structural lookup that the tree
//! shape can never satisfy, so misconfigured callers can be diagnosed.

use thiserror::Error;

/// Result type for VFS operations
pub type Result<T> = std::result::Result<T, VfsError>;

/// Errors produced by the VFS core
#[derive(Debug, Error)]
pub enum VfsError {
    /// Path segment does not resolve to any known entity (including assets
    /// excluded by the ignore-list)
    #[error("not found: {0}")]
    NotFound(String),

    /// Structural lookup of a group name other than the fixed kinds
    #[error("unsupported asset group {name:?} under {path}")]
    UnsupportedGroup { path: String, name: String },

    /// Asset backing file could not be opened for reading
    #[error("content unavailable for {path}: {source}")]
    ContentUnavailable {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Asset metadata carried a timestamp that is not valid ISO-8601
    #[error("invalid timestamp {value:?} on {path}: {source}")]
    InvalidTimestamp {
        path: String,
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    /// Upstream API failure that could not be absorbed
    #[error(transparent)]
    Upstream(#[from] mediadav_api::ApiError),

    /// Initial population found a completely unreachable upstream
    #[error("initial library load failed: all {failed} album fetches failed")]
    InitialLoadFailed { failed: usize },
}

impl VfsError {
    /// Create a not-found error for a path
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound(path.into())
    }

    /// Check if this is the standard absent-resource outcome
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
