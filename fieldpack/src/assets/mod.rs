//! External asset store contracts.
//!
//! A package's style and tile region live in two asset stores that this
//! crate does not own. The lifecycle controller reaches them only through the
//! [`StyleAssetStore`] and [`TileAssetStore`] traits:
//!
//! ```text
//! Controller ──► StyleAssetStore ──► DiskStyleStore | MemoryAssetStore
//!            └─► TileAssetStore  ──► DiskTileStore  | MemoryAssetStore
//! ```
//!
//! Both traits are dyn-compatible: async methods return a [`BoxFuture`], and
//! progress is reported through a shared callback instead of a stream.

mod disk;
mod http;
mod memory;

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use thiserror::Error;

use crate::package::Polygon;

pub use disk::{asset_key, AssetManifest, DiskStyleStore, DiskTileStore, DEFAULT_MAX_TILES};
pub use http::{HttpClient, ReqwestClient};
pub use memory::MemoryAssetStore;

/// Boxed future type for dyn-compatible async methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Resource counters reported while an asset loads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoadProgress {
    pub completed: u64,
    pub required: u64,
}

impl LoadProgress {
    pub const fn new(completed: u64, required: u64) -> Self {
        Self {
            completed,
            required,
        }
    }
}

/// Callback receiving [`LoadProgress`] updates.
pub type ProgressFn = Arc<dyn Fn(LoadProgress) + Send + Sync>;

/// A progress callback that ignores every update.
pub fn no_progress() -> ProgressFn {
    Arc::new(|_: LoadProgress| {})
}

/// Which networks an asset load may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NetworkRestriction {
    /// Any available network.
    #[default]
    None,
    /// Avoid metered connections.
    DisallowExpensive,
    /// Offline only: use what is already stored.
    DisallowAll,
}

/// Options for a style fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StyleFetchOptions {
    /// Treat stored but stale resources as good enough.
    pub accept_expired: bool,
}

/// Options for a tile region fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TileFetchOptions {
    pub accept_expired: bool,
    pub network_restriction: NetworkRestriction,
}

/// The tile resources a style needs over a zoom range.
#[derive(Debug, Clone, PartialEq)]
pub struct TilesetDescriptor {
    pub style_reference: String,
    pub min_zoom: u8,
    pub max_zoom: u8,
    pub pixel_ratio: f32,
}

/// Everything a tile store needs to load one region.
#[derive(Debug, Clone, PartialEq)]
pub struct TileRegionRequest {
    pub polygon: Polygon,
    pub descriptor: TilesetDescriptor,
    pub options: TileFetchOptions,
}

/// A style that finished loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleAsset {
    pub id: String,
    pub completed_resources: u64,
    pub required_resources: u64,
}

/// A tile region that finished loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileAsset {
    pub id: String,
    pub completed_resources: u64,
    pub required_resources: u64,
}

/// Errors reported by an asset store.
///
/// Payloads are plain strings so errors can be cloned into events and
/// persisted as a record's error message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssetError {
    /// The request itself cannot be served.
    #[error("invalid asset request: {0}")]
    InvalidRequest(String),

    /// A network transfer failed.
    #[error("network error: {0}")]
    Network(String),

    /// The store's local storage failed.
    #[error("storage error: {0}")]
    Storage(String),

    /// No asset with this id exists.
    #[error("asset not found: {0}")]
    NotFound(String),
}

/// Which of the two stores an operation targets. Used in messages and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Style,
    Tile,
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetKind::Style => write!(f, "style"),
            AssetKind::Tile => write!(f, "tile"),
        }
    }
}

/// Store of rendering styles.
pub trait StyleAssetStore: Send + Sync {
    /// Load the style for `style_reference`, reporting progress as it goes.
    fn fetch(
        &self,
        style_reference: &str,
        options: StyleFetchOptions,
        progress: ProgressFn,
    ) -> BoxFuture<'_, Result<StyleAsset, AssetError>>;

    /// Delete a stored style.
    fn remove(&self, id: &str) -> BoxFuture<'_, Result<(), AssetError>>;

    /// Ids of every stored style.
    fn list_all(&self) -> BoxFuture<'_, Result<Vec<String>, AssetError>>;
}

/// Store of geographic tile regions.
pub trait TileAssetStore: Send + Sync {
    /// Load the region described by `request` under `tile_asset_id`.
    fn fetch(
        &self,
        tile_asset_id: &str,
        request: TileRegionRequest,
        progress: ProgressFn,
    ) -> BoxFuture<'_, Result<TileAsset, AssetError>>;

    /// Delete a stored tile region.
    fn remove(&self, id: &str) -> BoxFuture<'_, Result<(), AssetError>>;

    /// Ids of every stored tile region.
    fn list_all(&self) -> BoxFuture<'_, Result<Vec<String>, AssetError>>;
}
