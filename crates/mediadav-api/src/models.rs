//! Typed records for the Immich API payloads MediaDAV consumes
//!
//! Required fields are enforced at deserialization time, so a malformed
//! album payload fails the fetch with a descriptive error instead of
//! surfacing as a missing-key lookup deep inside node logic.

use serde::Deserialize;

/// One entry of `GET /api/albums`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlbumSummary {
    pub id: String,
    pub album_name: String,
    #[serde(default)]
    pub asset_count: u64,
}

/// Full album detail from `GET /api/albums/{id}`, including its assets
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Album {
    pub id: String,
    pub album_name: String,
    #[serde(default)]
    pub asset_count: u64,
    #[serde(default)]
    pub assets: Vec<Asset>,
}

/// A single media item inside an album
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    pub id: String,
    pub original_file_name: String,
    pub original_mime_type: String,
    /// Upstream-local filesystem path; only readable when the serving
    /// process shares the mounted library volume with Immich
    pub original_path: String,
    #[serde(rename = "type")]
    pub asset_type: AssetType,
    /// ISO-8601 timestamp, parsed lazily at metadata access
    pub file_created_at: String,
    /// ISO-8601 timestamp, parsed lazily at metadata access
    pub file_modified_at: String,
}

/// Immich asset kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AssetType {
    Image,
    Video,
    /// Anything Immich may add later (e.g. AUDIO); never listed under
    /// `images/` or `videos/`
    #[serde(other)]
    Other,
}

/// One entry of `GET /api/tags`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_album_detail_parses_camel_case() {
        let album: Album = serde_json::from_value(serde_json::json!({
            "id": "a1",
            "albumName": "Trip",
            "assetCount": 2,
            "assets": [{
                "id": "x1",
                "originalFileName": "beach.jpg",
                "originalMimeType": "image/jpeg",
                "originalPath": "/library/beach.jpg",
                "type": "IMAGE",
                "fileCreatedAt": "2024-06-01T10:00:00.000Z",
                "fileModifiedAt": "2024-06-02T10:00:00.000Z"
            }]
        }))
        .unwrap();

        assert_eq!(album.album_name, "Trip");
        assert_eq!(album.assets.len(), 1);
        assert_eq!(album.assets[0].asset_type, AssetType::Image);
        assert_eq!(album.assets[0].original_mime_type, "image/jpeg");
    }

    #[test]
    fn test_unknown_asset_type_maps_to_other() {
        let asset: Asset = serde_json::from_value(serde_json::json!({
            "id": "x2",
            "originalFileName": "note.aac",
            "originalMimeType": "audio/aac",
            "originalPath": "/library/note.aac",
            "type": "AUDIO",
            "fileCreatedAt": "2024-06-01T10:00:00Z",
            "fileModifiedAt": "2024-06-01T10:00:00Z"
        }))
        .unwrap();

        assert_eq!(asset.asset_type, AssetType::Other);
    }

    #[test]
    fn test_missing_required_field_is_rejected() {
        // No originalPath: must fail at parse time, not at content open
        let result: std::result::Result<Asset, _> =
            serde_json::from_value(serde_json::json!({
                "id": "x3",
                "originalFileName": "beach.jpg",
                "originalMimeType": "image/jpeg",
                "type": "IMAGE",
                "fileCreatedAt": "2024-06-01T10:00:00Z",
                "fileModifiedAt": "2024-06-01T10:00:00Z"
            }));

        assert!(result.is_err());
    }

    #[test]
    fn test_album_without_assets_defaults_empty() {
        let album: Album = serde_json::from_value(serde_json::json!({
            "id": "a2",
            "albumName": "Empty"
        }))
        .unwrap();

        assert!(album.assets.is_empty());
        assert_eq!(album.asset_count, 0);
    }
}
