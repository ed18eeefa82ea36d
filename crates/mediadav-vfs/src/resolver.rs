//! Deterministic path-to-node resolution
//!
//! A resolver is built once per request from the snapshot that is current
//! at that moment and walks the path one segment at a time. Empty segments
//! collapse, so `/Trip//images/` resolves like `/Trip/images`.

use crate::error::Result;
use crate::node::Node;
use crate::snapshot::Snapshot;
use serde::Deserialize;
use std::sync::Arc;

/// Shape of the tree root
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RootLayout {
    /// `/` lists album names directly
    #[default]
    Albums,
    /// `/` lists the fixed pair `albums`/`tags`
    Grouped,
}

/// Resolution configuration
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolveOptions {
    /// Drop the `images`/`videos` grouping and expose an album's assets
    /// directly under the album
    pub flatten: bool,
    pub layout: RootLayout,
}

/// Walks virtual paths against one snapshot
#[derive(Debug, Clone)]
pub struct PathResolver {
    snapshot: Arc<Snapshot>,
    options: ResolveOptions,
}

impl PathResolver {
    #[must_use]
    pub fn new(snapshot: Arc<Snapshot>, options: ResolveOptions) -> Self {
        Self { snapshot, options }
    }

    /// Resolve a `/`-separated virtual path to a node.
    ///
    /// Errors are [`crate::VfsError::NotFound`] for unknown entities
    /// (including ignore-listed assets) and
    /// [`crate::VfsError::UnsupportedGroup`] for a non-flattened lookup
    /// outside the two fixed group names.
    pub fn resolve(&self, path: &str) -> Result<Node> {
        let mut node = Node::root(self.snapshot.clone(), self.options);
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            node = node.resolve_child(segment)?;
        }
        Ok(node)
    }
}
