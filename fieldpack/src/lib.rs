//! Fieldpack - offline map packages for field crews.
//!
//! A package is a rendering style, a tile region around a farm, and the
//! farm's boundary and trap GeoJSON, downloaded ahead of time so the map
//! works without coverage.
//!
//! # Architecture
//!
//! ```text
//! PackageService ──► SessionCache ──► RecordStore ──► BlobStorage
//!       │
//!       ▼
//! PackageController ──► StyleAssetStore / TileAssetStore
//!       │
//!       ├──► AssetInspector (what is actually on disk)
//!       └──► validator      (readiness flags + first missing item)
//! ```
//!
//! Downloads and removals run as background tasks and report through
//! [`controller::PackageEvents`] streams.

pub mod assets;
pub mod config;
pub mod controller;
pub mod coord;
pub mod inspector;
pub mod logging;
pub mod package;
pub mod service;
pub mod session;
pub mod store;
pub mod validator;

pub use controller::{PackageController, PackageError, PackageEvent, PrepareRequest};
pub use package::{Bounds, PackageRecord, PackageStatus};
pub use service::PackageService;
