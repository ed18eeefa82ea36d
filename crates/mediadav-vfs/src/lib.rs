//! MediaDAV VFS - the virtual filesystem core
//!
//! Maps hierarchical paths onto a periodically refreshed in-memory snapshot
//! of a remote Immich library. The pieces:
//!
//! - [`Snapshot`]: immutable point-in-time view of albums/tags/assets
//! - [`MetadataCache`]: owns the current snapshot and rebuilds it on a timer
//! - [`PathResolver`]: walks a `/`-separated path to a [`Node`]
//! - [`Node`]: the polymorphic tree (collections and asset leaves)
//! - [`MediaDavProvider`]: the contract the protocol layer consumes
//!
//! Snapshots are never mutated after construction; the cache replaces the
//! current `Arc<Snapshot>` atomically, so a request keeps the view it
//! started with even when a refresh completes mid-request.

pub mod cache;
pub mod error;
#[cfg(test)]
pub(crate) mod testutil;
pub mod node;
pub mod provider;
pub mod resolver;
pub mod snapshot;

// Re-exports
pub use cache::{CacheConfig, MetadataCache, RefreshHandle, RefreshStats};
pub use error::{Result, VfsError};
pub use node::{AssetKind, AssetNode, Node};
pub use provider::MediaDavProvider;
pub use resolver::{PathResolver, ResolveOptions, RootLayout};
pub use snapshot::{AlbumEntry, Snapshot};
