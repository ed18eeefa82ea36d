//! mediadav-server - read-only WebDAV gateway for an Immich library
//!
//! Loads album metadata into an in-memory snapshot at startup, refreshes it
//! periodically in the background, and serves the resulting virtual tree
//! over a minimal WebDAV surface.

mod config;
mod dav;

use anyhow::{Context, Result};
use clap::Parser;
use config::Config;
use mediadav_api::ImmichClient;
use mediadav_vfs::{CacheConfig, MediaDavProvider, ResolveOptions, RootLayout};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "mediadav-server")]
#[command(about = "Read-only WebDAV server exposing an Immich photo library")]
#[command(version)]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Immich server base URL
    #[arg(long, env = "IMMICH_URL")]
    upstream_url: Option<String>,

    /// Immich API key
    #[arg(long, env = "IMMICH_API_KEY")]
    api_key: Option<String>,

    /// Listen address for the WebDAV server
    #[arg(short, long)]
    listen: Option<String>,

    /// Comma-delimited album IDs to expose (default: all albums)
    #[arg(long, env = "ALBUM_IDS")]
    album_ids: Option<String>,

    /// Comma-delimited file extensions to hide
    #[arg(long, env = "EXCLUDED_FILE_TYPES")]
    excluded_file_types: Option<String>,

    /// Hours between metadata refreshes
    #[arg(long, env = "REFRESH_RATE_HOURS")]
    refresh_hours: Option<f64>,

    /// Expose assets directly under albums instead of images/videos groups
    #[arg(long, env = "FLATTEN_ASSET_STRUCTURE")]
    flatten: bool,

    /// Root layout: albums or grouped
    #[arg(long)]
    grouped_root: bool,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Args {
    /// File settings first, then CLI/env on top
    fn into_config(self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => toml::from_str("").context("building default configuration")?,
        };

        if let Some(url) = self.upstream_url {
            config.upstream_url = url;
        }
        if let Some(key) = self.api_key {
            config.api_key = key;
        }
        if let Some(listen) = self.listen {
            config.listen = listen;
        }
        if let Some(ids) = self.album_ids {
            config.album_ids = config::split_list(&ids);
        }
        if let Some(types) = self.excluded_file_types {
            config.excluded_file_types = config::split_list(&types);
        }
        if let Some(hours) = self.refresh_hours {
            config.refresh_hours = hours;
        }
        if self.flatten {
            config.flatten = true;
        }
        if self.grouped_root {
            config.layout = RootLayout::Grouped;
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| args.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = args.into_config()?;

    info!("Starting mediadav-server");
    info!("Upstream: {}", config.upstream_url);
    if config.album_ids.is_empty() {
        info!("Albums: all discovered upstream");
    } else {
        info!("Albums: {} configured", config.album_ids.len());
    }
    if !config.excluded_file_types.is_empty() {
        info!("Excluded file types: {:?}", config.excluded_file_types);
    }

    let client = ImmichClient::new(&config.upstream_url, &config.api_key);
    let cache_config = CacheConfig {
        album_ids: config.album_ids.clone(),
        ignore_extensions: config.excluded_file_types.clone(),
        refresh_interval: config.refresh_interval(),
    };
    let options = ResolveOptions {
        flatten: config.flatten,
        layout: config.layout,
    };
    let provider = Arc::new(MediaDavProvider::new(client, cache_config, options));

    let stats = provider
        .start()
        .await
        .context("loading initial metadata from upstream")?;
    info!(
        "Initial snapshot: {} albums, {} assets",
        stats.albums_loaded, stats.visible_assets
    );

    let addr: SocketAddr = config
        .listen
        .parse()
        .with_context(|| format!("invalid listen address {}", config.listen))?;
    let listener = TcpListener::bind(addr).await?;
    info!("Serving WebDAV on {}", addr);

    axum::serve(listener, dav::router(provider.clone()).into_make_service())
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("Shutting down...");
        })
        .await?;

    provider.stop().await;
    info!("Server shut down gracefully");

    Ok(())
}
