//! Provider contract for the protocol layer
//!
//! `resolve(path)` is pure delegation into [`PathResolver`] against the
//! cache's current snapshot. `start()` populates the cache before any
//! request is served and spawns the periodic refresh loop; `stop()` signals
//! the loop and joins it, so no refresh starts after `stop()` returns.

use crate::cache::{CacheConfig, MetadataCache, RefreshHandle, RefreshStats, spawn_refresh_loop};
use crate::error::{Result, VfsError};
use crate::node::Node;
use crate::resolver::{PathResolver, ResolveOptions};
use crate::snapshot::Snapshot;
use mediadav_api::ImmichClient;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

/// The read-only filesystem provider the protocol layer consumes
pub struct MediaDavProvider {
    cache: Arc<MetadataCache>,
    options: ResolveOptions,
    refresh: Mutex<Option<RefreshHandle>>,
}

impl MediaDavProvider {
    pub fn new(client: ImmichClient, cache_config: CacheConfig, options: ResolveOptions) -> Self {
        Self {
            cache: Arc::new(MetadataCache::new(client, cache_config)),
            options,
            refresh: Mutex::new(None),
        }
    }

    /// Populate the cache and start the background refresh loop.
    ///
    /// A reachable-but-empty upstream produces a valid empty snapshot; a
    /// completely unreachable one (every configured album failed, or the
    /// discovery call itself failed) is a startup error so the process does
    /// not come up serving nothing silently.
    pub async fn start(&self) -> Result<RefreshStats> {
        let stats = self.cache.refresh().await?;
        if stats.is_total_failure() {
            return Err(VfsError::InitialLoadFailed {
                failed: stats.albums_failed,
            });
        }

        let mut refresh = self.refresh.lock().await;
        if refresh.is_none() {
            *refresh = Some(spawn_refresh_loop(self.cache.clone()));
        }

        info!(
            albums = stats.albums_loaded,
            assets = stats.visible_assets,
            "provider started"
        );
        Ok(stats)
    }

    /// Stop the refresh loop and wait for it to exit. Idempotent.
    pub async fn stop(&self) {
        if let Some(handle) = self.refresh.lock().await.take() {
            handle.stop().await;
            info!("provider stopped");
        }
    }

    /// Resolve a virtual path against the snapshot current right now. The
    /// returned node keeps that snapshot for its whole lifetime.
    pub fn resolve(&self, path: &str) -> Result<Node> {
        PathResolver::new(self.cache.current(), self.options).resolve(path)
    }

    /// The current snapshot, for callers that need more than one lookup
    /// against a single consistent view
    #[must_use]
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.cache.current()
    }

    /// Resolution options this provider serves with
    #[must_use]
    pub fn options(&self) -> ResolveOptions {
        self.options
    }
}
