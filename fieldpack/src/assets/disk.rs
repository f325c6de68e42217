//! Directory-backed asset stores.
//!
//! Each asset gets its own directory named after the SHA-256 of its id, with
//! an `asset.json` manifest recording the asset id:
//!
//! ```text
//! <root>/styles/<sha256(style_reference)>/asset.json
//!                                         style.json
//! <root>/tiles/<sha256(tile_asset_id)>/asset.json
//!                                      <z>/<x>/<y>.<ext>
//! ```
//!
//! The manifest is written last, so an interrupted load never shows up in
//! `list_all`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use super::http::{redact, HttpClient};
use super::{
    AssetError, BoxFuture, LoadProgress, NetworkRestriction, ProgressFn, StyleAsset,
    StyleAssetStore, StyleFetchOptions, TileAsset, TileAssetStore, TileRegionRequest,
};
use crate::coord::{tiles_in_bounds, TileRange};
use crate::package::now_millis;

/// Largest tile region a single fetch will download.
pub const DEFAULT_MAX_TILES: u64 = 50_000;

const MANIFEST_FILE: &str = "asset.json";
const STYLE_FILE: &str = "style.json";
const MAPBOX_STYLE_PREFIX: &str = "mapbox://styles/";
const MAPBOX_STYLE_API: &str = "https://api.mapbox.com/styles/v1/";

/// Directory name for an asset id.
pub fn asset_key(id: &str) -> String {
    format!("{:x}", Sha256::digest(id.as_bytes()))
}

/// Metadata stored next to each asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetManifest {
    pub id: String,
    /// Where the asset was loaded from, without query parameters.
    pub source: String,
    pub resource_count: u64,
    pub created_at: i64,
}

fn storage_error(context: &str, path: &Path, e: io::Error) -> AssetError {
    AssetError::Storage(format!("{} {}: {}", context, path.display(), e))
}

/// Write to temp file first, then rename for atomicity
fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), AssetError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| storage_error("failed to create", parent, e))?;
    }
    let temp_path = path.with_extension("tmp");
    fs::write(&temp_path, contents).map_err(|e| storage_error("failed to write", &temp_path, e))?;
    fs::rename(&temp_path, path).map_err(|e| storage_error("failed to rename", path, e))
}

fn read_manifest(dir: &Path) -> Option<AssetManifest> {
    let raw = fs::read_to_string(dir.join(MANIFEST_FILE)).ok()?;
    match serde_json::from_str(&raw) {
        Ok(manifest) => Some(manifest),
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "Ignoring unreadable asset manifest");
            None
        }
    }
}

fn write_manifest(dir: &Path, manifest: &AssetManifest) -> Result<(), AssetError> {
    let json = serde_json::to_vec_pretty(manifest)
        .map_err(|e| AssetError::Storage(format!("failed to encode manifest: {}", e)))?;
    write_atomic(&dir.join(MANIFEST_FILE), &json)
}

fn list_manifests(root: &Path) -> Result<Vec<String>, AssetError> {
    let entries = match fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(storage_error("failed to read", root, e)),
    };

    let mut ids = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            if let Some(manifest) = read_manifest(&path) {
                ids.push(manifest.id);
            }
        }
    }
    ids.sort();
    Ok(ids)
}

fn remove_asset_dir(root: &Path, id: &str) -> Result<(), AssetError> {
    let dir = root.join(asset_key(id));
    match fs::remove_dir_all(&dir) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(id = %id, "Asset already absent");
            Ok(())
        }
        Err(e) => Err(storage_error("failed to remove", &dir, e)),
    }
}

async fn blocking<T, F>(f: F) -> Result<T, AssetError>
where
    F: FnOnce() -> Result<T, AssetError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AssetError::Storage(format!("worker task failed: {}", e)))?
}

/// Where a style's JSON comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
enum StyleSource {
    Remote(String),
    Local(PathBuf),
}

/// Style store that keeps each style document on disk.
///
/// Understands `http(s)://` URLs, `file://` paths and `mapbox://styles/`
/// references. The last needs an access token.
pub struct DiskStyleStore {
    root: PathBuf,
    http: Arc<dyn HttpClient>,
    access_token: Option<String>,
}

impl DiskStyleStore {
    pub fn new(root: impl Into<PathBuf>, http: Arc<dyn HttpClient>) -> Self {
        Self {
            root: root.into(),
            http,
            access_token: None,
        }
    }

    /// Token appended to `mapbox://` style requests (builder pattern).
    pub fn with_access_token(mut self, token: Option<String>) -> Self {
        self.access_token = token.filter(|t| !t.trim().is_empty());
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, reference: &str) -> Result<StyleSource, AssetError> {
        if reference.starts_with("http://") || reference.starts_with("https://") {
            return Ok(StyleSource::Remote(reference.to_string()));
        }
        if let Some(path) = reference.strip_prefix("file://") {
            return Ok(StyleSource::Local(PathBuf::from(path)));
        }
        if let Some(rest) = reference.strip_prefix(MAPBOX_STYLE_PREFIX) {
            let token = self.access_token.as_deref().ok_or_else(|| {
                AssetError::InvalidRequest(format!("{} needs an access token", reference))
            })?;
            return Ok(StyleSource::Remote(format!(
                "{}{}?access_token={}",
                MAPBOX_STYLE_API, rest, token
            )));
        }
        Err(AssetError::InvalidRequest(format!(
            "unsupported style reference: {}",
            reference
        )))
    }
}

impl StyleAssetStore for DiskStyleStore {
    fn fetch(
        &self,
        style_reference: &str,
        options: StyleFetchOptions,
        progress: ProgressFn,
    ) -> BoxFuture<'_, Result<StyleAsset, AssetError>> {
        let reference = style_reference.to_string();
        let dir = self.root.join(asset_key(style_reference));
        let http = Arc::clone(&self.http);
        let source = self.resolve(style_reference);

        Box::pin(async move {
            let source = source?;
            blocking(move || {
                let style_path = dir.join(STYLE_FILE);
                if options.accept_expired && style_path.exists() && read_manifest(&dir).is_some() {
                    debug!(style = %reference, "Reusing stored style");
                    progress(LoadProgress::new(1, 1));
                    return Ok(StyleAsset {
                        id: reference,
                        completed_resources: 1,
                        required_resources: 1,
                    });
                }

                progress(LoadProgress::new(0, 1));
                let (bytes, origin) = match &source {
                    StyleSource::Remote(url) => (http.get(url)?, redact(url).to_string()),
                    StyleSource::Local(path) => (
                        fs::read(path).map_err(|e| storage_error("failed to read", path, e))?,
                        path.display().to_string(),
                    ),
                };

                serde_json::from_slice::<serde_json::Value>(&bytes).map_err(|e| {
                    AssetError::InvalidRequest(format!("style is not valid JSON: {}", e))
                })?;

                write_atomic(&style_path, &bytes)?;
                write_manifest(
                    &dir,
                    &AssetManifest {
                        id: reference.clone(),
                        source: origin,
                        resource_count: 1,
                        created_at: now_millis(),
                    },
                )?;
                progress(LoadProgress::new(1, 1));
                info!(style = %reference, bytes = bytes.len(), "Stored style");

                Ok(StyleAsset {
                    id: reference,
                    completed_resources: 1,
                    required_resources: 1,
                })
            })
            .await
        })
    }

    fn remove(&self, id: &str) -> BoxFuture<'_, Result<(), AssetError>> {
        let root = self.root.clone();
        let id = id.to_string();
        Box::pin(blocking(move || remove_asset_dir(&root, &id)))
    }

    fn list_all(&self) -> BoxFuture<'_, Result<Vec<String>, AssetError>> {
        let root = self.root.clone();
        Box::pin(blocking(move || list_manifests(&root)))
    }
}

/// Tile store that downloads XYZ tiles from a URL template.
///
/// The template uses `{z}`, `{x}` and `{y}` placeholders, for example
/// `https://tiles.example.com/{z}/{x}/{y}.jpg`.
pub struct DiskTileStore {
    root: PathBuf,
    http: Arc<dyn HttpClient>,
    url_template: Option<String>,
    max_tiles: u64,
}

impl DiskTileStore {
    pub fn new(root: impl Into<PathBuf>, http: Arc<dyn HttpClient>) -> Self {
        Self {
            root: root.into(),
            http,
            url_template: None,
            max_tiles: DEFAULT_MAX_TILES,
        }
    }

    /// Set the tile URL template (builder pattern).
    pub fn with_url_template(mut self, template: Option<String>) -> Self {
        self.url_template = template.filter(|t| !t.trim().is_empty());
        self
    }

    /// Cap the number of tiles one region may need (builder pattern).
    pub fn with_max_tiles(mut self, max_tiles: u64) -> Self {
        self.max_tiles = max_tiles;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn plan(&self, request: &TileRegionRequest) -> Result<Vec<TileRange>, AssetError> {
        let descriptor = &request.descriptor;
        if descriptor.min_zoom > descriptor.max_zoom {
            return Err(AssetError::InvalidRequest(format!(
                "min zoom {} is above max zoom {}",
                descriptor.min_zoom, descriptor.max_zoom
            )));
        }
        let bounds = request
            .polygon
            .bounding_box()
            .ok_or_else(|| AssetError::InvalidRequest("region polygon is empty".to_string()))?;

        let ranges = (descriptor.min_zoom..=descriptor.max_zoom)
            .map(|zoom| tiles_in_bounds(&bounds, zoom))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| AssetError::InvalidRequest(e.to_string()))?;

        let total: u64 = ranges.iter().map(TileRange::len).sum();
        if total > self.max_tiles {
            return Err(AssetError::InvalidRequest(format!(
                "region needs {} tiles, limit is {}",
                total, self.max_tiles
            )));
        }
        Ok(ranges)
    }
}

fn tile_url(template: &str, zoom: u8, col: u32, row: u32) -> String {
    template
        .replace("{z}", &zoom.to_string())
        .replace("{x}", &col.to_string())
        .replace("{y}", &row.to_string())
}

fn tile_extension(template: Option<&str>) -> String {
    template
        .map(redact)
        .and_then(|t| Path::new(t).extension())
        .and_then(|e| e.to_str())
        .filter(|e| !e.contains('}'))
        .unwrap_or("tile")
        .to_string()
}

impl TileAssetStore for DiskTileStore {
    fn fetch(
        &self,
        tile_asset_id: &str,
        request: TileRegionRequest,
        progress: ProgressFn,
    ) -> BoxFuture<'_, Result<TileAsset, AssetError>> {
        let id = tile_asset_id.to_string();
        let dir = self.root.join(asset_key(tile_asset_id));
        let http = Arc::clone(&self.http);
        let template = self.url_template.clone();
        let plan = self.plan(&request);

        Box::pin(async move {
            let ranges = plan?;
            let options = request.options;
            if template.is_none() && options.network_restriction != NetworkRestriction::DisallowAll
            {
                return Err(AssetError::InvalidRequest(
                    "no tile URL template configured".to_string(),
                ));
            }

            blocking(move || {
                let total: u64 = ranges.iter().map(TileRange::len).sum();
                let extension = tile_extension(template.as_deref());
                let mut completed = 0;
                let mut downloaded = 0;
                progress(LoadProgress::new(0, total));

                for tile in ranges.iter().flat_map(|r| r.tiles()) {
                    let path = dir
                        .join(tile.zoom.to_string())
                        .join(tile.col.to_string())
                        .join(format!("{}.{}", tile.row, extension));

                    if !(options.accept_expired && path.exists()) {
                        let template = match (&template, options.network_restriction) {
                            (Some(t), NetworkRestriction::None)
                            | (Some(t), NetworkRestriction::DisallowExpensive) => t,
                            _ => {
                                return Err(AssetError::Network(format!(
                                    "tile {}/{}/{} is not stored and network access is disallowed",
                                    tile.zoom, tile.col, tile.row
                                )))
                            }
                        };
                        let bytes = http.get(&tile_url(template, tile.zoom, tile.col, tile.row))?;
                        write_atomic(&path, &bytes)?;
                        downloaded += 1;
                    }

                    completed += 1;
                    progress(LoadProgress::new(completed, total));
                }

                write_manifest(
                    &dir,
                    &AssetManifest {
                        id: id.clone(),
                        source: template.as_deref().map(redact).unwrap_or_default().to_string(),
                        resource_count: total,
                        created_at: now_millis(),
                    },
                )?;
                info!(
                    tile_asset_id = %id,
                    tiles = total,
                    downloaded = downloaded,
                    "Stored tile region"
                );

                Ok(TileAsset {
                    id,
                    completed_resources: completed,
                    required_resources: total,
                })
            })
            .await
        })
    }

    fn remove(&self, id: &str) -> BoxFuture<'_, Result<(), AssetError>> {
        let root = self.root.clone();
        let id = id.to_string();
        Box::pin(blocking(move || remove_asset_dir(&root, &id)))
    }

    fn list_all(&self) -> BoxFuture<'_, Result<Vec<String>, AssetError>> {
        let root = self.root.clone();
        Box::pin(blocking(move || list_manifests(&root)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{no_progress, TileFetchOptions, TilesetDescriptor};
    use crate::package::Bounds;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    struct CountingClient {
        body: Vec<u8>,
        calls: AtomicUsize,
        urls: Mutex<Vec<String>>,
    }

    impl CountingClient {
        fn new(body: &[u8]) -> Arc<Self> {
            Arc::new(Self {
                body: body.to_vec(),
                calls: AtomicUsize::new(0),
                urls: Mutex::new(Vec::new()),
            })
        }
    }

    impl HttpClient for CountingClient {
        fn get(&self, url: &str) -> Result<Vec<u8>, AssetError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.urls.lock().push(url.to_string());
            Ok(self.body.clone())
        }
    }

    fn tile_request(accept_expired: bool) -> TileRegionRequest {
        TileRegionRequest {
            polygon: Bounds::new(-49.0, -22.0, -48.9, -21.9).to_polygon(),
            descriptor: TilesetDescriptor {
                style_reference: "https://styles.example.com/sat.json".to_string(),
                min_zoom: 10,
                max_zoom: 11,
                pixel_ratio: 1.0,
            },
            options: TileFetchOptions {
                accept_expired,
                network_restriction: NetworkRestriction::None,
            },
        }
    }

    #[tokio::test]
    async fn test_style_fetch_list_remove() {
        let temp = TempDir::new().unwrap();
        let client = CountingClient::new(br#"{"version": 8}"#);
        let store = DiskStyleStore::new(temp.path(), client.clone());
        let reference = "https://styles.example.com/sat.json";

        let asset = store
            .fetch(reference, StyleFetchOptions { accept_expired: true }, no_progress())
            .await
            .unwrap();
        assert_eq!(asset.id, reference);
        assert_eq!(store.list_all().await.unwrap(), vec![reference.to_string()]);

        // Second fetch reuses the stored copy
        store
            .fetch(reference, StyleFetchOptions { accept_expired: true }, no_progress())
            .await
            .unwrap();
        assert_eq!(client.calls.load(Ordering::SeqCst), 1);

        StyleAssetStore::remove(&store, reference).await.unwrap();
        assert!(store.list_all().await.unwrap().is_empty());
        StyleAssetStore::remove(&store, reference).await.unwrap();
    }

    #[tokio::test]
    async fn test_style_rejects_non_json_body() {
        let temp = TempDir::new().unwrap();
        let store = DiskStyleStore::new(temp.path(), CountingClient::new(b"<html>"));

        let err = store
            .fetch("https://styles.example.com/sat.json", StyleFetchOptions::default(), no_progress())
            .await
            .unwrap_err();
        assert!(matches!(err, AssetError::InvalidRequest(_)));
        assert!(store.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mapbox_reference_needs_token() {
        let temp = TempDir::new().unwrap();
        let client = CountingClient::new(br#"{"version": 8}"#);
        let store = DiskStyleStore::new(temp.path(), client.clone());
        let reference = "mapbox://styles/mapbox/standard-satellite";

        assert!(store
            .fetch(reference, StyleFetchOptions::default(), no_progress())
            .await
            .is_err());

        let store = store.with_access_token(Some("pk.test".to_string()));
        store
            .fetch(reference, StyleFetchOptions::default(), no_progress())
            .await
            .unwrap();
        assert_eq!(
            client.urls.lock()[0],
            "https://api.mapbox.com/styles/v1/mapbox/standard-satellite?access_token=pk.test"
        );
    }

    #[tokio::test]
    async fn test_tile_fetch_downloads_every_tile_once() {
        let temp = TempDir::new().unwrap();
        let client = CountingClient::new(b"tile");
        let store = DiskTileStore::new(temp.path(), client.clone())
            .with_url_template(Some("https://tiles.example.com/{z}/{x}/{y}.jpg".to_string()));

        let asset = store
            .fetch("farm1-north", tile_request(true), no_progress())
            .await
            .unwrap();
        let first_calls = client.calls.load(Ordering::SeqCst) as u64;
        assert_eq!(asset.required_resources, first_calls);
        assert_eq!(asset.completed_resources, asset.required_resources);
        assert!(client.urls.lock().iter().all(|u| u.ends_with(".jpg")));

        store
            .fetch("farm1-north", tile_request(true), no_progress())
            .await
            .unwrap();
        assert_eq!(client.calls.load(Ordering::SeqCst) as u64, first_calls);

        store
            .fetch("farm1-north", tile_request(false), no_progress())
            .await
            .unwrap();
        assert_eq!(client.calls.load(Ordering::SeqCst) as u64, first_calls * 2);

        assert_eq!(store.list_all().await.unwrap(), vec!["farm1-north".to_string()]);
    }

    #[tokio::test]
    async fn test_tile_fetch_respects_limit() {
        let temp = TempDir::new().unwrap();
        let store = DiskTileStore::new(temp.path(), CountingClient::new(b"tile"))
            .with_url_template(Some("https://tiles.example.com/{z}/{x}/{y}.png".to_string()))
            .with_max_tiles(1);

        let err = store
            .fetch("farm1-north", tile_request(true), no_progress())
            .await
            .unwrap_err();
        assert!(matches!(err, AssetError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_offline_fetch_fails_when_tiles_missing() {
        let temp = TempDir::new().unwrap();
        let store = DiskTileStore::new(temp.path(), CountingClient::new(b"tile"));
        let mut request = tile_request(true);
        request.options.network_restriction = NetworkRestriction::DisallowAll;

        let err = store
            .fetch("farm1-north", request, no_progress())
            .await
            .unwrap_err();
        assert!(matches!(err, AssetError::Network(_)));
    }

    #[test]
    fn test_tile_extension_from_template() {
        assert_eq!(tile_extension(Some("https://t.example.com/{z}/{x}/{y}.jpg?key=1")), "jpg");
        assert_eq!(tile_extension(Some("https://t.example.com/{z}/{x}/{y}")), "tile");
        assert_eq!(tile_extension(None), "tile");
    }
}
