//! Shared harness for integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use fieldpack::assets::MemoryAssetStore;
use fieldpack::controller::{ControllerConfig, PackageController, PrepareRequest};
use fieldpack::store::{BlobStorage, MemoryBlobStorage, RecordStore};
use fieldpack::{Bounds, PackageService};

pub const STYLE: &str = "mapbox://styles/fieldpack/satellite";
pub const FEATURES: &str = r#"{"type":"FeatureCollection","features":[]}"#;

/// Bounds used throughout the examples.
pub fn farm_bounds() -> Bounds {
    Bounds::new(-49.0, -22.0, -48.5, -21.5)
}

/// A request with both payloads present.
pub fn complete_request(package_id: &str) -> PrepareRequest {
    PrepareRequest::new(package_id, farm_bounds())
        .with_style(STYLE)
        .with_zoom(10, 14)
        .with_boundary(FEATURES)
        .with_traps(FEATURES)
}

/// Service over scripted in-memory stores.
pub struct Harness {
    pub storage: Arc<MemoryBlobStorage>,
    pub styles: Arc<MemoryAssetStore>,
    pub tiles: Arc<MemoryAssetStore>,
    pub service: PackageService,
}

impl Harness {
    pub fn new() -> Self {
        Self::over(Arc::new(MemoryBlobStorage::new()))
    }

    pub fn over(storage: Arc<MemoryBlobStorage>) -> Self {
        let styles = Arc::new(MemoryAssetStore::new());
        let tiles = Arc::new(MemoryAssetStore::new());
        Self::with_stores(storage, styles, tiles)
    }

    pub fn with_stores(
        storage: Arc<MemoryBlobStorage>,
        styles: Arc<MemoryAssetStore>,
        tiles: Arc<MemoryAssetStore>,
    ) -> Self {
        let blob: Arc<dyn BlobStorage> = storage.clone();
        let controller = PackageController::new(
            Arc::new(RecordStore::new(blob)),
            styles.clone(),
            tiles.clone(),
            short_timeouts(),
        );
        Self {
            storage,
            styles,
            tiles,
            service: PackageService::new(controller),
        }
    }
}

pub fn short_timeouts() -> ControllerConfig {
    ControllerConfig::new()
        .with_removal_timeout(Duration::from_millis(100))
        .with_inspector_timeout(Duration::from_millis(100))
}
