//! Immich API client with bounded retry
//!
//! Every call is a single authenticated GET. Transport failures and non-2xx
//! statuses are retried a fixed number of times with a fixed inter-attempt
//! delay (no backoff, no jitter), after which the error surfaces to the
//! caller. A 2xx body that fails to deserialize is not retried.

use crate::error::{ApiError, Result};
use crate::models::{Album, AlbumSummary, Tag};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::warn;

/// Default number of attempts per request
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default delay between attempts
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Client for the Immich REST API
#[derive(Debug, Clone)]
pub struct ImmichClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    max_attempts: u32,
    retry_delay: Duration,
}

impl ImmichClient {
    /// Create a client for the given Immich instance
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }

    /// Override the retry policy (attempts must be at least 1)
    #[must_use]
    pub fn with_retry(mut self, max_attempts: u32, retry_delay: Duration) -> Self {
        self.max_attempts = max_attempts.max(1);
        self.retry_delay = retry_delay;
        self
    }

    /// The base URL this client talks to (no trailing slash)
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `GET /api/albums` - all albums visible to the API key
    pub async fn list_albums(&self) -> Result<Vec<AlbumSummary>> {
        self.get_json("/api/albums").await
    }

    /// `GET /api/albums/{id}` - one album's detail, including its assets
    pub async fn album(&self, album_id: &str) -> Result<Album> {
        self.get_json(&format!("/api/albums/{album_id}")).await
    }

    /// `GET /api/tags` - all tag names visible to the API key
    pub async fn list_tags(&self) -> Result<Vec<Tag>> {
        self.get_json("/api/tags").await
    }

    /// Fetch and deserialize one endpoint, retrying transient failures
    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.try_get(&url).await {
                Ok(body) => {
                    return serde_json::from_slice(&body).map_err(|source| ApiError::Decode {
                        url: url.clone(),
                        source,
                    });
                }
                Err(e) => {
                    warn!(
                        url = %url,
                        attempt,
                        max_attempts = self.max_attempts,
                        error = %e,
                        "upstream request failed"
                    );
                    if attempt >= self.max_attempts {
                        return Err(ApiError::UpstreamUnavailable {
                            url,
                            attempts: attempt,
                            source: e,
                        });
                    }
                    tokio::time::sleep(self.retry_delay).await;
                }
            }
        }
    }

    /// One GET attempt; non-2xx statuses count as failures
    async fn try_get(&self, url: &str) -> std::result::Result<bytes::Bytes, reqwest::Error> {
        self.http
            .get(url)
            .header("x-api-key", &self.api_key)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Json, Router, extract::State, http::HeaderMap, http::StatusCode, routing::get};
    use std::net::SocketAddr;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Instant;

    async fn spawn_stub(router: Router) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        addr
    }

    fn test_client(addr: SocketAddr) -> ImmichClient {
        ImmichClient::new(format!("http://{addr}"), "test-key")
            .with_retry(3, Duration::from_millis(20))
    }

    #[tokio::test]
    async fn test_list_albums_parses_payload() {
        let router = Router::new().route(
            "/api/albums",
            get(|| async {
                Json(serde_json::json!([
                    {"id": "a1", "albumName": "Trip", "assetCount": 3},
                    {"id": "a2", "albumName": "Pets", "assetCount": 1},
                ]))
            }),
        );
        let addr = spawn_stub(router).await;

        let albums = test_client(addr).list_albums().await.unwrap();
        assert_eq!(albums.len(), 2);
        assert_eq!(albums[0].album_name, "Trip");
        assert_eq!(albums[1].asset_count, 1);
    }

    #[tokio::test]
    async fn test_api_key_header_is_sent() {
        let seen: Arc<std::sync::Mutex<Option<String>>> = Arc::new(std::sync::Mutex::new(None));
        let seen_clone = seen.clone();
        let router = Router::new().route(
            "/api/tags",
            get(move |headers: HeaderMap| {
                let seen = seen_clone.clone();
                async move {
                    *seen.lock().unwrap() = headers
                        .get("x-api-key")
                        .and_then(|v| v.to_str().ok())
                        .map(String::from);
                    Json(serde_json::json!([{"name": "sunsets"}]))
                }
            }),
        );
        let addr = spawn_stub(router).await;

        let tags = test_client(addr).list_tags().await.unwrap();
        assert_eq!(tags[0].name, "sunsets");
        assert_eq!(seen.lock().unwrap().as_deref(), Some("test-key"));
    }

    #[tokio::test]
    async fn test_retry_recovers_from_transient_failures() {
        let attempts = Arc::new(AtomicU32::new(0));
        let router = Router::new().route(
            "/api/albums/{id}",
            get(
                |State(attempts): State<Arc<AtomicU32>>| async move {
                    // Fail twice, then succeed on the third attempt
                    if attempts.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(StatusCode::SERVICE_UNAVAILABLE)
                    } else {
                        Ok(Json(serde_json::json!({
                            "id": "a1", "albumName": "Trip", "assetCount": 0, "assets": []
                        })))
                    }
                },
            ),
        )
        .with_state(attempts.clone());
        let addr = spawn_stub(router).await;

        let start = Instant::now();
        let album = test_client(addr).album("a1").await.unwrap();

        assert_eq!(album.album_name, "Trip");
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        // Two failures mean two inter-attempt sleeps
        assert!(start.elapsed() >= Duration::from_millis(40));
    }

    #[tokio::test]
    async fn test_retry_bound_is_respected() {
        let attempts = Arc::new(AtomicU32::new(0));
        let router = Router::new().route(
            "/api/albums",
            get(|State(attempts): State<Arc<AtomicU32>>| async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                StatusCode::INTERNAL_SERVER_ERROR
            }),
        )
        .with_state(attempts.clone());
        let addr = spawn_stub(router).await;

        let err = test_client(addr).list_albums().await.unwrap_err();

        assert!(err.is_transient());
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_malformed_body_is_not_retried() {
        let attempts = Arc::new(AtomicU32::new(0));
        let router = Router::new().route(
            "/api/tags",
            get(|State(attempts): State<Arc<AtomicU32>>| async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                Json(serde_json::json!({"not": "a list"}))
            }),
        )
        .with_state(attempts.clone());
        let addr = spawn_stub(router).await;

        let err = test_client(addr).list_tags().await.unwrap_err();

        assert!(!err.is_transient());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unreachable_upstream_reports_attempts() {
        // Nothing is listening on this address
        let client = ImmichClient::new("http://127.0.0.1:1", "k")
            .with_retry(2, Duration::from_millis(5));

        match client.list_albums().await.unwrap_err() {
            ApiError::UpstreamUnavailable { attempts, .. } => assert_eq!(attempts, 2),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let client = ImmichClient::new("http://immich.local:2283/", "k");
        assert_eq!(client.base_url(), "http://immich.local:2283");
    }
}
