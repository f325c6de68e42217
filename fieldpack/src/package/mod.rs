//! Offline map package data model.
//!
//! A package bundles everything a field crew needs to work without a network:
//! a rendering style, a tile region covering the farm, and two inline GeoJSON
//! payloads (field boundaries and trap markers).
//!
//! # Type Overview
//!
//! ```text
//! PackageRecord (persisted)
//! ├── package_id: String          primary key
//! ├── bounds: Bounds              west/south/east/north
//! ├── status: PackageStatus       lifecycle state
//! ├── style_asset_id / tile_asset_id
//! ├── readiness: ReadinessFlags   four presence flags
//! └── boundary_geojson / trap_geojson
//! ```
//!
//! Records are serialized as camelCase JSON so that blobs written by older
//! builds stay readable; missing fields fall back to defaults and are filled
//! in by [`PackageRecord::normalize`].

mod bounds;
mod record;
mod status;

pub use bounds::{Bounds, LngLat, Polygon};
pub use record::{now_millis, PackageRecord, ReadinessFlags};
pub use status::PackageStatus;

/// Style used when a request does not name one.
pub const DEFAULT_STYLE_REFERENCE: &str = "mapbox://styles/mapbox/standard-satellite";

/// Default minimum zoom for new packages.
pub const DEFAULT_MIN_ZOOM: u8 = 12;

/// Default maximum zoom for new packages.
pub const DEFAULT_MAX_ZOOM: u8 = 16;

/// Highest zoom level accepted for a tile region.
pub const MAX_ZOOM: u8 = 22;
