//! MediaDAV API - Immich REST client
//!
//! This crate provides a typed client for the subset of the Immich API that
//! MediaDAV consumes: album listings, album details (including assets), and
//! tag listings.

pub mod client;
pub mod error;
pub mod models;

// Re-exports
pub use client::ImmichClient;
pub use error::{ApiError, Result};
pub use models::{Album, AlbumSummary, Asset, AssetType, Tag};
