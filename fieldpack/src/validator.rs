//! Package completeness validation.
//!
//! [`validate`] is a pure function: it reads a record and an
//! [`AssetSnapshot`] and never touches any store, so it can run as often
//! and as concurrently as callers like.

use tracing::debug;

use crate::inspector::AssetSnapshot;
use crate::package::{PackageRecord, ReadinessFlags};

pub const STYLE_MISSING: &str = "style asset missing";
pub const TILE_MISSING: &str = "tile asset missing";
pub const BOUNDARY_MISSING: &str = "boundary data missing";
pub const TRAP_MISSING: &str = "trap data missing";

/// Readiness verdict for one package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    pub flags: ReadinessFlags,
    /// First failing check, in priority order. `None` when ready.
    pub error_message: Option<String>,
}

impl ValidationResult {
    pub fn is_ready(&self) -> bool {
        self.error_message.is_none()
    }
}

fn non_blank(value: Option<&str>) -> bool {
    value.is_some_and(|v| !v.trim().is_empty())
}

/// Check a package's four components.
///
/// Only the first failing check is reported, in this order: style asset,
/// tile asset, boundary data, trap data.
pub fn validate(record: &PackageRecord, snapshot: &AssetSnapshot) -> ValidationResult {
    let flags = ReadinessFlags {
        has_style_asset: has_style(record, snapshot),
        has_tile_asset: has_tile(record, snapshot),
        has_boundary_data: non_blank(record.boundary_geojson.as_deref()),
        has_trap_data: non_blank(record.trap_geojson.as_deref()),
    };
    classify(record, flags)
}

/// Like [`validate`], but an inconclusive half of the snapshot keeps the
/// asset flag already on the record instead of reading as absent.
///
/// Used right after a fetch, when the record's flag reflects a store call
/// that just succeeded.
pub fn validate_after_fetch(record: &PackageRecord, snapshot: &AssetSnapshot) -> ValidationResult {
    let flags = ReadinessFlags {
        has_style_asset: if snapshot.style_conclusive {
            has_style(record, snapshot)
        } else {
            record.readiness.has_style_asset
        },
        has_tile_asset: if snapshot.tile_conclusive {
            has_tile(record, snapshot)
        } else {
            record.readiness.has_tile_asset
        },
        has_boundary_data: non_blank(record.boundary_geojson.as_deref()),
        has_trap_data: non_blank(record.trap_geojson.as_deref()),
    };
    classify(record, flags)
}

fn has_style(record: &PackageRecord, snapshot: &AssetSnapshot) -> bool {
    non_blank(Some(record.style_asset_id.as_str())) && snapshot.has_style(&record.style_asset_id)
}

fn has_tile(record: &PackageRecord, snapshot: &AssetSnapshot) -> bool {
    non_blank(Some(record.tile_asset_id.as_str())) && snapshot.has_tile(&record.tile_asset_id)
}

fn classify(record: &PackageRecord, flags: ReadinessFlags) -> ValidationResult {
    let error_message = if !flags.has_style_asset {
        Some(STYLE_MISSING)
    } else if !flags.has_tile_asset {
        Some(TILE_MISSING)
    } else if !flags.has_boundary_data {
        Some(BOUNDARY_MISSING)
    } else if !flags.has_trap_data {
        Some(TRAP_MISSING)
    } else {
        None
    };

    debug!(
        package_id = %record.package_id,
        style = flags.has_style_asset,
        tile = flags.has_tile_asset,
        boundary = flags.has_boundary_data,
        trap = flags.has_trap_data,
        error = error_message.unwrap_or("none"),
        "Validated package"
    );

    ValidationResult {
        flags,
        error_message: error_message.map(str::to_string),
    }
}
