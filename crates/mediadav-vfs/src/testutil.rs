//! Shared fixtures for the in-crate test modules

use mediadav_api::{Album, Asset, AssetType};

pub(crate) fn asset(name: &str, kind: AssetType) -> Asset {
    Asset {
        id: format!("id-{name}"),
        original_file_name: name.to_string(),
        original_mime_type: match kind {
            AssetType::Image => "image/jpeg".to_string(),
            AssetType::Video => "video/quicktime".to_string(),
            AssetType::Other => "application/octet-stream".to_string(),
        },
        original_path: format!("/library/{name}"),
        asset_type: kind,
        file_created_at: "2024-06-01T10:00:00.000Z".to_string(),
        file_modified_at: "2024-06-02T10:00:00.000Z".to_string(),
    }
}

pub(crate) fn album(name: &str, assets: Vec<Asset>) -> Album {
    Album {
        id: format!("album-{name}"),
        album_name: name.to_string(),
        asset_count: assets.len() as u64,
        assets,
    }
}
