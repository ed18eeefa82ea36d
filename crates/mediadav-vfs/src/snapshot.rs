//! Immutable point-in-time view of the remote library
//!
//! A snapshot is built from whatever album fetches succeeded during one
//! refresh cycle and is never mutated afterwards. Albums keep upstream
//! order; assets within a group list in name order (BTreeMap). Duplicate
//! names within one grouping are last-wins, matching the name→asset map the
//! listing is served from.

use mediadav_api::{Album, Asset, AssetType};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Replace characters that are unsafe in exposed entry names.
///
/// `>` is rejected by WebDAV clients observed in the wild; `/` is the path
/// separator here.
#[must_use]
pub fn sanitize_name(name: &str) -> String {
    name.replace(['>', '/'], "_")
}

/// Ignore-list check: the lowercased text after the final `.` of the file
/// name (the whole name when it has no dot). `ignore` entries must already
/// be lowercase.
#[must_use]
pub fn is_ignored(file_name: &str, ignore: &[String]) -> bool {
    let extension = file_name
        .rsplit('.')
        .next()
        .unwrap_or(file_name)
        .to_lowercase();
    ignore.iter().any(|ext| *ext == extension)
}

/// One album inside a snapshot, with its derived per-kind groupings
#[derive(Debug)]
pub struct AlbumEntry {
    pub id: String,
    /// Sanitized display name, used for path resolution
    pub name: String,
    pub asset_count: u64,
    /// name → asset, IMAGE kind only, post ignore-list filter
    pub images: BTreeMap<String, Arc<Asset>>,
    /// name → asset, VIDEO kind only, post ignore-list filter
    pub videos: BTreeMap<String, Arc<Asset>>,
    /// name → asset across every kind, for flattened resolution
    pub all: BTreeMap<String, Arc<Asset>>,
}

impl AlbumEntry {
    fn build(album: Album, ignore: &[String]) -> Self {
        let mut images = BTreeMap::new();
        let mut videos = BTreeMap::new();
        let mut all = BTreeMap::new();

        for asset in album.assets {
            if is_ignored(&asset.original_file_name, ignore) {
                continue;
            }
            let name = asset.original_file_name.clone();
            let asset = Arc::new(asset);
            match asset.asset_type {
                AssetType::Image => {
                    images.insert(name.clone(), asset.clone());
                }
                AssetType::Video => {
                    videos.insert(name.clone(), asset.clone());
                }
                AssetType::Other => {}
            }
            all.insert(name, asset);
        }

        Self {
            id: album.id,
            name: sanitize_name(&album.album_name),
            asset_count: album.asset_count,
            images,
            videos,
            all,
        }
    }

    /// Number of assets visible after filtering
    #[must_use]
    pub fn visible_assets(&self) -> usize {
        self.all.len()
    }
}

/// Immutable aggregate of all albums and tags from one refresh cycle
#[derive(Debug, Default)]
pub struct Snapshot {
    albums: Vec<Arc<AlbumEntry>>,
    /// Sanitized album name → index into `albums`; later duplicates win
    index: HashMap<String, usize>,
    /// Tag names, sorted
    tags: Vec<String>,
}

impl Snapshot {
    /// An empty snapshot - valid, just nothing to list
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a snapshot from fetched albums and tag names.
    ///
    /// `ignore` entries must already be lowercase.
    #[must_use]
    pub fn build(albums: Vec<Album>, mut tags: Vec<String>, ignore: &[String]) -> Self {
        let albums: Vec<Arc<AlbumEntry>> = albums
            .into_iter()
            .map(|a| Arc::new(AlbumEntry::build(a, ignore)))
            .collect();

        let mut index = HashMap::with_capacity(albums.len());
        for (i, entry) in albums.iter().enumerate() {
            index.insert(entry.name.clone(), i);
        }

        tags.sort();

        Self { albums, index, tags }
    }

    /// Album names in upstream order
    #[must_use]
    pub fn album_names(&self) -> Vec<String> {
        self.albums.iter().map(|a| a.name.clone()).collect()
    }

    /// Exact, case-sensitive lookup by sanitized album name
    #[must_use]
    pub fn album(&self, name: &str) -> Option<Arc<AlbumEntry>> {
        self.index.get(name).map(|&i| self.albums[i].clone())
    }

    /// All albums in upstream order
    #[must_use]
    pub fn albums(&self) -> &[Arc<AlbumEntry>] {
        &self.albums
    }

    /// Sorted tag names
    #[must_use]
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Total visible assets across all albums
    #[must_use]
    pub fn visible_assets(&self) -> usize {
        self.albums.iter().map(|a| a.visible_assets()).sum()
    }
}
