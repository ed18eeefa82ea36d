//! Tree nodes: collections at each hierarchy level plus the asset leaf
//!
//! One tagged enum instead of a class-per-level hierarchy; every variant
//! carries only the snapshot data it needs, so a node stays valid for its
//! whole request even if the cache swaps snapshots underneath.

use crate::error::{Result, VfsError};
use crate::resolver::{ResolveOptions, RootLayout};
use crate::snapshot::{AlbumEntry, Snapshot};
use chrono::{DateTime, Utc};
use mediadav_api::Asset;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::warn;

/// The two fixed asset groupings inside a non-flattened album
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Images,
    Videos,
}

impl AssetKind {
    /// Fixed listing for a non-flattened album
    pub const ALL: [AssetKind; 2] = [AssetKind::Images, AssetKind::Videos];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Images => "images",
            Self::Videos => "videos",
        }
    }

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "images" => Some(Self::Images),
            "videos" => Some(Self::Videos),
            _ => None,
        }
    }
}

/// A resolved position in the virtual tree
#[derive(Debug, Clone)]
pub enum Node {
    /// `/`
    Root(RootNode),
    /// `/albums` (grouped layout only)
    AlbumIndex(AlbumIndexNode),
    /// `/tags` (grouped layout only)
    TagIndex(TagIndexNode),
    /// A single tag; terminal, listable but empty
    Tag(TagNode),
    /// One album
    Album(AlbumNode),
    /// `<album>/images` or `<album>/videos`
    AssetGroup(AssetGroupNode),
    /// A single image or video file
    Asset(AssetNode),
}

#[derive(Debug, Clone)]
pub struct RootNode {
    snapshot: Arc<Snapshot>,
    options: ResolveOptions,
}

#[derive(Debug, Clone)]
pub struct AlbumIndexNode {
    path: String,
    snapshot: Arc<Snapshot>,
    flatten: bool,
}

#[derive(Debug, Clone)]
pub struct TagIndexNode {
    path: String,
    snapshot: Arc<Snapshot>,
}

#[derive(Debug, Clone)]
pub struct TagNode {
    path: String,
}

#[derive(Debug, Clone)]
pub struct AlbumNode {
    path: String,
    album: Arc<AlbumEntry>,
    flatten: bool,
}

#[derive(Debug, Clone)]
pub struct AssetGroupNode {
    path: String,
    album: Arc<AlbumEntry>,
    kind: AssetKind,
}

fn join(path: &str, name: &str) -> String {
    if path == "/" {
        format!("/{name}")
    } else {
        format!("{path}/{name}")
    }
}

impl Node {
    /// The tree root for one snapshot and layout
    #[must_use]
    pub fn root(snapshot: Arc<Snapshot>, options: ResolveOptions) -> Self {
        Self::Root(RootNode { snapshot, options })
    }

    /// Collections can be listed and descended into; assets cannot
    #[must_use]
    pub fn is_collection(&self) -> bool {
        !matches!(self, Self::Asset(_))
    }

    /// Virtual path of this node, `/`-rooted
    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            Self::Root(_) => "/",
            Self::AlbumIndex(n) => &n.path,
            Self::TagIndex(n) => &n.path,
            Self::Tag(n) => &n.path,
            Self::Album(n) => &n.path,
            Self::AssetGroup(n) => &n.path,
            Self::Asset(n) => &n.path,
        }
    }

    /// Last path segment (empty for the root)
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.path().rsplit('/').next().unwrap_or("")
    }

    /// Child names in listing order: snapshot order for the root album
    /// list, name order inside albums and groups
    pub fn list_children(&self) -> Result<Vec<String>> {
        match self {
            Self::Root(n) => Ok(match n.options.layout {
                RootLayout::Albums => n.snapshot.album_names(),
                RootLayout::Grouped => vec!["albums".to_string(), "tags".to_string()],
            }),
            Self::AlbumIndex(n) => {
                let mut names = n.snapshot.album_names();
                names.sort();
                Ok(names)
            }
            Self::TagIndex(n) => Ok(n.snapshot.tags().to_vec()),
            Self::Tag(_) => Ok(Vec::new()),
            Self::Album(n) => Ok(if n.flatten {
                n.album.all.keys().cloned().collect()
            } else {
                AssetKind::ALL.iter().map(|k| k.as_str().to_string()).collect()
            }),
            Self::AssetGroup(n) => Ok(n.assets().keys().cloned().collect()),
            Self::Asset(_) => Ok(Vec::new()),
        }
    }

    /// Exact, case-sensitive lookup of one child
    pub fn resolve_child(&self, name: &str) -> Result<Node> {
        let child_path = join(self.path(), name);
        match self {
            Self::Root(n) => match n.options.layout {
                RootLayout::Albums => album_child(&n.snapshot, name, child_path, n.options.flatten),
                RootLayout::Grouped => match name {
                    "albums" => Ok(Self::AlbumIndex(AlbumIndexNode {
                        path: child_path,
                        snapshot: n.snapshot.clone(),
                        flatten: n.options.flatten,
                    })),
                    "tags" => Ok(Self::TagIndex(TagIndexNode {
                        path: child_path,
                        snapshot: n.snapshot.clone(),
                    })),
                    _ => Err(VfsError::not_found(child_path)),
                },
            },
            Self::AlbumIndex(n) => album_child(&n.snapshot, name, child_path, n.flatten),
            Self::TagIndex(n) => {
                if n.snapshot.tags().iter().any(|t| t == name) {
                    Ok(Self::Tag(TagNode { path: child_path }))
                } else {
                    Err(VfsError::not_found(child_path))
                }
            }
            Self::Album(n) => {
                if n.flatten {
                    match n.album.all.get(name) {
                        Some(asset) => Ok(Self::Asset(AssetNode::new(child_path, asset.clone()))),
                        None => Err(VfsError::not_found(child_path)),
                    }
                } else {
                    match AssetKind::from_name(name) {
                        Some(kind) => Ok(Self::AssetGroup(AssetGroupNode {
                            path: child_path,
                            album: n.album.clone(),
                            kind,
                        })),
                        None => Err(VfsError::UnsupportedGroup {
                            path: n.path.clone(),
                            name: name.to_string(),
                        }),
                    }
                }
            }
            Self::AssetGroup(n) => match n.assets().get(name) {
                Some(asset) => Ok(Self::Asset(AssetNode::new(child_path, asset.clone()))),
                None => Err(VfsError::not_found(child_path)),
            },
            Self::Tag(_) | Self::Asset(_) => Err(VfsError::not_found(child_path)),
        }
    }
}

fn album_child(
    snapshot: &Arc<Snapshot>,
    name: &str,
    child_path: String,
    flatten: bool,
) -> Result<Node> {
    match snapshot.album(name) {
        Some(album) => Ok(Node::Album(AlbumNode {
            path: child_path,
            album,
            flatten,
        })),
        None => Err(VfsError::not_found(child_path)),
    }
}

impl AssetGroupNode {
    fn assets(&self) -> &BTreeMap<String, Arc<Asset>> {
        match self.kind {
            AssetKind::Images => &self.album.images,
            AssetKind::Videos => &self.album.videos,
        }
    }
}

/// Leaf node for a single media file
#[derive(Debug, Clone)]
pub struct AssetNode {
    path: String,
    asset: Arc<Asset>,
}

impl AssetNode {
    pub(crate) fn new(path: String, asset: Arc<Asset>) -> Self {
        Self { path, asset }
    }

    /// Virtual path of this asset
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The underlying metadata record
    #[must_use]
    pub fn asset(&self) -> &Asset {
        &self.asset
    }

    /// MIME type, verbatim from upstream metadata
    #[must_use]
    pub fn mime_type(&self) -> &str {
        &self.asset.original_mime_type
    }

    /// Size in bytes of the backing file, or `None` when the file cannot be
    /// inspected (e.g. the library volume is not mounted where upstream
    /// recorded it). The request continues with an unknown length.
    pub async fn content_length(&self) -> Option<u64> {
        match tokio::fs::metadata(&self.asset.original_path).await {
            Ok(meta) => Some(meta.len()),
            Err(e) => {
                warn!(
                    backing_path = %self.asset.original_path,
                    error = %e,
                    "asset length unavailable, check the library mount"
                );
                None
            }
        }
    }

    /// Creation timestamp from upstream metadata
    pub fn created_at(&self) -> Result<DateTime<Utc>> {
        self.parse_timestamp(&self.asset.file_created_at)
    }

    /// Modification timestamp from upstream metadata
    pub fn modified_at(&self) -> Result<DateTime<Utc>> {
        self.parse_timestamp(&self.asset.file_modified_at)
    }

    fn parse_timestamp(&self, value: &str) -> Result<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(value)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|source| VfsError::InvalidTimestamp {
                path: self.path.clone(),
                value: value.to_string(),
                source,
            })
    }

    /// Entity tag derived from {virtual path, modified time, length}; stable
    /// across requests while none of the three change. Unknown length is
    /// fingerprinted as 0.
    pub async fn etag(&self) -> Result<String> {
        let modified = self.modified_at()?;
        let length = self.content_length().await.unwrap_or(0);
        let digest = Sha256::digest(self.path.as_bytes());
        Ok(format!(
            "{}-{}-{}",
            &hex::encode(digest)[..32],
            modified.timestamp(),
            length
        ))
    }

    /// Open the backing file for streaming read
    pub async fn open(&self) -> Result<tokio::fs::File> {
        tokio::fs::File::open(&self.asset.original_path)
            .await
            .map_err(|source| VfsError::ContentUnavailable {
                path: self.asset.original_path.clone(),
                source,
            })
    }
}
