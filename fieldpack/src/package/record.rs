//! The persisted package record.

use serde::{Deserialize, Serialize};

use super::bounds::Bounds;
use super::status::PackageStatus;
use super::{DEFAULT_MAX_ZOOM, DEFAULT_MIN_ZOOM, DEFAULT_STYLE_REFERENCE};

/// Current wall-clock time in epoch milliseconds.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Presence flags for the four components of a package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReadinessFlags {
    pub has_style_asset: bool,
    pub has_tile_asset: bool,
    pub has_boundary_data: bool,
    pub has_trap_data: bool,
}

impl ReadinessFlags {
    /// True when all four components are confirmed present.
    pub fn all(&self) -> bool {
        self.has_style_asset && self.has_tile_asset && self.has_boundary_data && self.has_trap_data
    }
}

/// Durable metadata for one offline package.
///
/// Timestamps are epoch milliseconds and only ever move forward; use
/// [`touch`](Self::touch) and [`mark_validated`](Self::mark_validated) rather
/// than assigning them directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageRecord {
    pub package_id: String,

    #[serde(default)]
    pub region_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub farm_id: Option<String>,

    #[serde(default)]
    pub style_reference: String,

    #[serde(default)]
    pub bounds: Bounds,

    #[serde(default = "default_min_zoom")]
    pub min_zoom: u8,

    #[serde(default = "default_max_zoom")]
    pub max_zoom: u8,

    #[serde(default)]
    pub created_at: i64,

    #[serde(default)]
    pub updated_at: i64,

    #[serde(default)]
    pub last_validated_at: i64,

    #[serde(default)]
    pub status: PackageStatus,

    /// Identifier in the style store. Defaults to `style_reference`.
    #[serde(default)]
    pub style_asset_id: String,

    /// Identifier in the tile store. Defaults to `package_id`.
    #[serde(default)]
    pub tile_asset_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    #[serde(flatten)]
    pub readiness: ReadinessFlags,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boundary_geojson: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trap_geojson: Option<String>,
}

fn default_min_zoom() -> u8 {
    DEFAULT_MIN_ZOOM
}

fn default_max_zoom() -> u8 {
    DEFAULT_MAX_ZOOM
}

impl PackageRecord {
    /// Create a queued record with default asset ids and fresh timestamps.
    pub fn new(
        package_id: impl Into<String>,
        region_name: impl Into<String>,
        style_reference: impl Into<String>,
        bounds: Bounds,
        min_zoom: u8,
        max_zoom: u8,
    ) -> Self {
        let package_id = package_id.into();
        let style_reference = style_reference.into();
        let now = now_millis();
        Self {
            tile_asset_id: package_id.clone(),
            style_asset_id: style_reference.clone(),
            package_id,
            region_name: region_name.into(),
            company_id: None,
            farm_id: None,
            style_reference,
            bounds,
            min_zoom,
            max_zoom,
            created_at: now,
            updated_at: now,
            last_validated_at: 0,
            status: PackageStatus::Queued,
            error_message: None,
            readiness: ReadinessFlags::default(),
            boundary_geojson: None,
            trap_geojson: None,
        }
    }

    /// Set tenant scoping (builder pattern).
    pub fn with_tenant(mut self, company_id: Option<String>, farm_id: Option<String>) -> Self {
        self.company_id = company_id;
        self.farm_id = farm_id;
        self
    }

    /// Attach the inline GeoJSON payloads (builder pattern).
    pub fn with_payloads(
        mut self,
        boundary_geojson: Option<String>,
        trap_geojson: Option<String>,
    ) -> Self {
        self.boundary_geojson = boundary_geojson;
        self.trap_geojson = trap_geojson;
        self
    }

    /// Fill fields that older blobs may have left empty.
    pub fn normalize(mut self) -> Self {
        if self.region_name.trim().is_empty() {
            self.region_name = self.package_id.clone();
        }
        if self.style_reference.trim().is_empty() {
            self.style_reference = DEFAULT_STYLE_REFERENCE.to_string();
        }
        if self.style_asset_id.trim().is_empty() {
            self.style_asset_id = self.style_reference.clone();
        }
        if self.tile_asset_id.trim().is_empty() {
            self.tile_asset_id = self.package_id.clone();
        }
        self
    }

    /// Advance `updated_at` to now, never backwards.
    pub fn touch(&mut self) {
        self.updated_at = self.updated_at.max(now_millis());
    }

    /// Advance `last_validated_at` to now, never backwards.
    pub fn mark_validated(&mut self) {
        self.last_validated_at = self.last_validated_at.max(now_millis());
        self.touch();
    }

    /// Move to a non-failure status and clear any stale error.
    pub fn set_status(&mut self, status: PackageStatus) {
        self.status = status;
        if !status.is_failure() {
            self.error_message = None;
        }
        self.touch();
    }

    /// Move to `Error` with the given message.
    pub fn fail(&mut self, message: impl Into<String>) {
        self.status = PackageStatus::Error;
        self.error_message = Some(message.into());
        self.touch();
    }

    pub fn is_ready(&self) -> bool {
        self.status == PackageStatus::Ready
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PackageRecord {
        PackageRecord::new(
            "farm1-north",
            "Farm 1 North",
            "mapbox://styles/test/sat",
            Bounds::new(-49.0, -22.0, -48.5, -21.5),
            10,
            14,
        )
    }

    #[test]
    fn test_new_defaults_asset_ids() {
        let record = sample();
        assert_eq!(record.status, PackageStatus::Queued);
        assert_eq!(record.style_asset_id, "mapbox://styles/test/sat");
        assert_eq!(record.tile_asset_id, "farm1-north");
        assert!(record.created_at > 0);
        assert_eq!(record.created_at, record.updated_at);
        assert_eq!(record.last_validated_at, 0);
        assert!(!record.readiness.all());
    }

    #[test]
    fn test_touch_never_moves_backwards() {
        let mut record = sample();
        record.updated_at = i64::MAX - 1;
        record.touch();
        assert_eq!(record.updated_at, i64::MAX - 1);
    }

    #[test]
    fn test_set_status_clears_error_on_success_states() {
        let mut record = sample();
        record.fail("tile asset fetch failed: offline");
        assert_eq!(record.status, PackageStatus::Error);
        assert!(record.error_message.is_some());

        record.set_status(PackageStatus::Downloading);
        assert!(record.error_message.is_none());
    }

    #[test]
    fn test_serializes_camel_case_with_flattened_flags() {
        let mut record = sample();
        record.readiness.has_tile_asset = true;
        let value = serde_json::to_value(&record).unwrap();

        assert_eq!(value["packageId"], "farm1-north");
        assert_eq!(value["status"], "queued");
        assert_eq!(value["hasTileAsset"], true);
        assert_eq!(value["hasStyleAsset"], false);
        assert_eq!(value["bounds"][2], -48.5);
        assert!(value.get("errorMessage").is_none());
    }

    #[test]
    fn test_minimal_entry_normalizes_defaults() {
        let json = r#"{"packageId": "legacy", "status": "ready"}"#;
        let record: PackageRecord = serde_json::from_str(json).unwrap();
        let record = record.normalize();

        assert_eq!(record.region_name, "legacy");
        assert_eq!(record.style_reference, DEFAULT_STYLE_REFERENCE);
        assert_eq!(record.style_asset_id, DEFAULT_STYLE_REFERENCE);
        assert_eq!(record.tile_asset_id, "legacy");
        assert_eq!(record.min_zoom, DEFAULT_MIN_ZOOM);
        assert_eq!(record.max_zoom, DEFAULT_MAX_ZOOM);
        assert_eq!(record.status, PackageStatus::Ready);
    }
}
