//! Metadata cache: owns the current snapshot and rebuilds it on a timer
//!
//! `refresh()` fetches every configured album (or discovers them all when
//! the list is empty), skips albums whose fetch exhausted its retries, and
//! swaps the rebuilt snapshot in atomically. Readers clone the current
//! `Arc<Snapshot>` once per request; writers never block them.

use crate::error::{Result, VfsError};
use crate::snapshot::Snapshot;
use mediadav_api::ImmichClient;
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Cache configuration
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Explicit album ids to serve; empty means discover all via
    /// `GET /api/albums`
    pub album_ids: Vec<String>,
    /// Lowercased file extensions excluded from every listing and lookup
    pub ignore_extensions: Vec<String>,
    /// Interval between background refresh cycles
    pub refresh_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            album_ids: Vec::new(),
            ignore_extensions: Vec::new(),
            refresh_interval: Duration::from_secs(3600),
        }
    }
}

/// Outcome of one refresh cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshStats {
    pub albums_loaded: usize,
    pub albums_failed: usize,
    pub visible_assets: usize,
}

impl RefreshStats {
    /// True when the cycle produced nothing despite albums being configured
    /// or discovered; the previous snapshot is kept in that case
    #[must_use]
    pub fn is_total_failure(&self) -> bool {
        self.albums_loaded == 0 && self.albums_failed > 0
    }
}

/// Holds the current [`Snapshot`] and refreshes it from upstream
pub struct MetadataCache {
    client: ImmichClient,
    config: CacheConfig,
    current: RwLock<Arc<Snapshot>>,
}

impl MetadataCache {
    /// Create a cache starting from an empty snapshot.
    ///
    /// Ignore-list entries are normalized to lowercase here so the per-asset
    /// filter can compare directly.
    pub fn new(client: ImmichClient, mut config: CacheConfig) -> Self {
        for ext in &mut config.ignore_extensions {
            *ext = ext.to_lowercase();
        }
        Self {
            client,
            config,
            current: RwLock::new(Arc::new(Snapshot::empty())),
        }
    }

    /// The current snapshot. Callers keep the returned `Arc` for the whole
    /// request and never re-read mid-request.
    #[must_use]
    pub fn current(&self) -> Arc<Snapshot> {
        self.current.read().clone()
    }

    /// Configured refresh interval
    #[must_use]
    pub fn refresh_interval(&self) -> Duration {
        self.config.refresh_interval
    }

    /// Rebuild the snapshot from upstream and swap it in.
    ///
    /// Per-album failures are skipped and counted, not fatal. A cycle that
    /// loads nothing while observing failures keeps the previous snapshot,
    /// so clients see stale-but-available data during an outage. Only a
    /// failed album-id discovery call (needed when no explicit ids are
    /// configured) errors out.
    pub async fn refresh(&self) -> Result<RefreshStats> {
        let ids = if self.config.album_ids.is_empty() {
            self.client
                .list_albums()
                .await?
                .into_iter()
                .map(|a| a.id)
                .collect()
        } else {
            self.config.album_ids.clone()
        };

        let mut albums = Vec::with_capacity(ids.len());
        let mut failed = 0usize;
        for id in &ids {
            match self.client.album(id).await {
                Ok(album) => albums.push(album),
                Err(e) => {
                    failed += 1;
                    warn!(album_id = %id, error = %e, "skipping album after failed fetch");
                }
            }
        }

        let tags = match self.client.list_tags().await {
            Ok(tags) => tags.into_iter().map(|t| t.name).collect(),
            Err(e) => {
                warn!(error = %e, "tag listing failed, serving no tags this cycle");
                Vec::new()
            }
        };

        let stats = RefreshStats {
            albums_loaded: albums.len(),
            albums_failed: failed,
            visible_assets: 0,
        };

        if stats.is_total_failure() {
            error!(
                albums_failed = failed,
                "refresh loaded no albums, keeping previous snapshot"
            );
            return Ok(stats);
        }

        let snapshot = Snapshot::build(albums, tags, &self.config.ignore_extensions);
        let stats = RefreshStats {
            visible_assets: snapshot.visible_assets(),
            ..stats
        };

        *self.current.write() = Arc::new(snapshot);

        info!(
            albums = stats.albums_loaded,
            failed = stats.albums_failed,
            assets = stats.visible_assets,
            "library snapshot refreshed"
        );
        Ok(stats)
    }
}

/// Handle to a running background refresh loop
pub struct RefreshHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl RefreshHandle {
    /// Signal the loop and wait for it to finish. The signal wins over the
    /// pending sleep, so this never waits out a full refresh interval, and
    /// no refresh starts after it returns.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            error!(error = %e, "refresh loop task failed");
        }
    }
}

/// Spawn the periodic refresh loop for `cache`
pub fn spawn_refresh_loop(cache: Arc<MetadataCache>) -> RefreshHandle {
    let (shutdown, mut stopped) = watch::channel(false);
    let interval = cache.refresh_interval();

    let task = tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = tokio::time::sleep(interval) => {
                    debug!("periodic refresh starting");
                    if let Err(e) = cache.refresh().await {
                        error!(error = %e, "periodic refresh failed");
                    }
                }
                _ = stopped.changed() => {
                    debug!("refresh loop stopping");
                    break;
                }
            }
        }
    });

    RefreshHandle { shutdown, task }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Json, Router, extract::Path, extract::State, http::StatusCode, routing::get};
    use std::net::SocketAddr;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Upstream stub: albums "a" and "b"; album "b" can be forced to fail
    #[derive(Default)]
    struct Upstream {
        fail_b: AtomicBool,
        fail_all: AtomicBool,
    }

    async fn spawn_upstream(state: Arc<Upstream>) -> SocketAddr {
        let router = Router::new()
            .route(
                "/api/albums",
                get(|State(s): State<Arc<Upstream>>| async move {
                    if s.fail_all.load(Ordering::SeqCst) {
                        return Err(StatusCode::SERVICE_UNAVAILABLE);
                    }
                    Ok(Json(serde_json::json!([
                        {"id": "a", "albumName": "Alps", "assetCount": 1},
                        {"id": "b", "albumName": "Beach", "assetCount": 1},
                    ])))
                }),
            )
            .route(
                "/api/albums/{id}",
                get(
                    |State(s): State<Arc<Upstream>>, Path(id): Path<String>| async move {
                        if s.fail_all.load(Ordering::SeqCst)
                            || (id == "b" && s.fail_b.load(Ordering::SeqCst))
                        {
                            return Err(StatusCode::SERVICE_UNAVAILABLE);
                        }
                        let name = if id == "a" { "Alps" } else { "Beach" };
                        let file = if id == "a" { "peak.jpg" } else { "wave.jpg" };
                        Ok(Json(serde_json::json!({
                            "id": id,
                            "albumName": name,
                            "assetCount": 1,
                            "assets": [{
                                "id": format!("asset-{id}"),
                                "originalFileName": file,
                                "originalMimeType": "image/jpeg",
                                "originalPath": format!("/library/{file}"),
                                "type": "IMAGE",
                                "fileCreatedAt": "2024-06-01T10:00:00Z",
                                "fileModifiedAt": "2024-06-01T10:00:00Z"
                            }]
                        })))
                    },
                ),
            )
            .route(
                "/api/tags",
                get(|| async { Json(serde_json::json!([{"name": "sunsets"}])) }),
            )
            .with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        addr
    }

    fn cache_for(addr: SocketAddr, config: CacheConfig) -> MetadataCache {
        let client = ImmichClient::new(format!("http://{addr}"), "k")
            .with_retry(2, Duration::from_millis(5));
        MetadataCache::new(client, config)
    }

    #[tokio::test]
    async fn test_refresh_discovers_albums_when_no_ids_configured() {
        let addr = spawn_upstream(Arc::default()).await;
        let cache = cache_for(addr, CacheConfig::default());

        let stats = cache.refresh().await.unwrap();

        assert_eq!(stats.albums_loaded, 2);
        assert_eq!(stats.albums_failed, 0);
        let snap = cache.current();
        assert_eq!(snap.album_names(), vec!["Alps", "Beach"]);
        assert_eq!(snap.tags(), ["sunsets"]);
    }

    #[tokio::test]
    async fn test_refresh_uses_explicit_album_ids() {
        let addr = spawn_upstream(Arc::default()).await;
        let cache = cache_for(
            addr,
            CacheConfig {
                album_ids: vec!["a".to_string()],
                ..CacheConfig::default()
            },
        );

        cache.refresh().await.unwrap();

        assert_eq!(cache.current().album_names(), vec!["Alps"]);
    }

    #[tokio::test]
    async fn test_partial_failure_skips_only_failing_album() {
        let upstream = Arc::new(Upstream::default());
        upstream.fail_b.store(true, Ordering::SeqCst);
        let addr = spawn_upstream(upstream).await;
        let cache = cache_for(addr, CacheConfig::default());

        let stats = cache.refresh().await.unwrap();

        assert_eq!(stats.albums_loaded, 1);
        assert_eq!(stats.albums_failed, 1);
        assert_eq!(cache.current().album_names(), vec!["Alps"]);
    }

    #[tokio::test]
    async fn test_refresh_is_idempotent_with_unchanged_upstream() {
        let addr = spawn_upstream(Arc::default()).await;
        let cache = cache_for(addr, CacheConfig::default());

        cache.refresh().await.unwrap();
        let first = cache.current();
        cache.refresh().await.unwrap();
        let second = cache.current();

        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(first.album_names(), second.album_names());
        assert_eq!(
            first.album("Alps").unwrap().images.keys().collect::<Vec<_>>(),
            second.album("Alps").unwrap().images.keys().collect::<Vec<_>>(),
        );
    }

    #[tokio::test]
    async fn test_total_failure_keeps_previous_snapshot() {
        let upstream = Arc::new(Upstream::default());
        let addr = spawn_upstream(upstream.clone()).await;
        let cache = cache_for(
            addr,
            CacheConfig {
                // Explicit ids so discovery is not needed during the outage
                album_ids: vec!["a".to_string(), "b".to_string()],
                ..CacheConfig::default()
            },
        );

        cache.refresh().await.unwrap();
        assert_eq!(cache.current().album_names(), vec!["Alps", "Beach"]);

        upstream.fail_all.store(true, Ordering::SeqCst);
        let stats = cache.refresh().await.unwrap();

        assert!(stats.is_total_failure());
        // Stale but available
        assert_eq!(cache.current().album_names(), vec!["Alps", "Beach"]);
    }

    #[tokio::test]
    async fn test_in_flight_reader_keeps_its_snapshot_across_refresh() {
        let upstream = Arc::new(Upstream::default());
        let addr = spawn_upstream(upstream.clone()).await;
        let cache = cache_for(addr, CacheConfig::default());

        cache.refresh().await.unwrap();
        let reader_view = cache.current();

        upstream.fail_b.store(true, Ordering::SeqCst);
        cache.refresh().await.unwrap();

        // The in-flight reader still sees both albums; new readers see one
        assert_eq!(reader_view.album_names(), vec!["Alps", "Beach"]);
        assert_eq!(cache.current().album_names(), vec!["Alps"]);
    }

    #[tokio::test]
    async fn test_ignore_list_changes_exactly_the_filtered_set() {
        let addr = spawn_upstream(Arc::default()).await;

        let plain = cache_for(addr, CacheConfig::default());
        plain.refresh().await.unwrap();
        assert_eq!(plain.current().visible_assets(), 2);

        let filtered = cache_for(
            addr,
            CacheConfig {
                ignore_extensions: vec!["JPG".to_string()],
                ..CacheConfig::default()
            },
        );
        filtered.refresh().await.unwrap();

        // Normalized to lowercase, so every .jpg asset is filtered
        assert_eq!(filtered.current().visible_assets(), 0);
        assert_eq!(filtered.current().album_names(), vec!["Alps", "Beach"]);
    }

    #[tokio::test]
    async fn test_stop_wakes_sleeping_refresh_loop() {
        let addr = spawn_upstream(Arc::default()).await;
        let cache = Arc::new(cache_for(
            addr,
            CacheConfig {
                // Long interval: stop must not wait for it
                refresh_interval: Duration::from_secs(3600),
                ..CacheConfig::default()
            },
        ));

        let handle = spawn_refresh_loop(cache);
        tokio::time::timeout(Duration::from_secs(1), handle.stop())
            .await
            .expect("stop() should win over the pending sleep");
    }
}
