//! Prepare requests and their validation.

use super::config::ControllerConfig;
use super::error::{PackageError, PackageResult};
use crate::package::{Bounds, PackageRecord, MAX_ZOOM};

/// Parameters for preparing a package.
///
/// Only the id and bounds are required; everything else falls back to the
/// controller's configured defaults.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PrepareRequest {
    pub package_id: String,
    /// Defaults to the package id.
    pub region_name: Option<String>,
    pub company_id: Option<String>,
    pub farm_id: Option<String>,
    /// Defaults to the configured style.
    pub style_reference: Option<String>,
    pub bounds: Bounds,
    pub min_zoom: Option<u8>,
    pub max_zoom: Option<u8>,
    pub boundary_geojson: Option<String>,
    pub trap_geojson: Option<String>,
}

impl PrepareRequest {
    pub fn new(package_id: impl Into<String>, bounds: Bounds) -> Self {
        Self {
            package_id: package_id.into(),
            bounds,
            ..Default::default()
        }
    }

    pub fn with_region_name(mut self, name: impl Into<String>) -> Self {
        self.region_name = Some(name.into());
        self
    }

    pub fn with_style(mut self, style_reference: impl Into<String>) -> Self {
        self.style_reference = Some(style_reference.into());
        self
    }

    pub fn with_zoom(mut self, min_zoom: u8, max_zoom: u8) -> Self {
        self.min_zoom = Some(min_zoom);
        self.max_zoom = Some(max_zoom);
        self
    }

    pub fn with_tenant(mut self, company_id: Option<String>, farm_id: Option<String>) -> Self {
        self.company_id = company_id;
        self.farm_id = farm_id;
        self
    }

    pub fn with_boundary(mut self, geojson: impl Into<String>) -> Self {
        self.boundary_geojson = Some(geojson.into());
        self
    }

    pub fn with_traps(mut self, geojson: impl Into<String>) -> Self {
        self.trap_geojson = Some(geojson.into());
        self
    }

    /// Check parameters and build the queued record they describe.
    pub(crate) fn into_record(self, config: &ControllerConfig) -> PackageResult<PackageRecord> {
        let package_id = self.package_id.trim().to_string();
        if package_id.is_empty() {
            return Err(PackageError::invalid("package_id", "must not be blank"));
        }

        let style_reference = non_blank(self.style_reference)
            .unwrap_or_else(|| config.default_style_reference.clone());
        if style_reference.trim().is_empty() {
            return Err(PackageError::invalid(
                "style_reference",
                "no style given and no default configured",
            ));
        }

        self.bounds
            .check()
            .map_err(|reason| PackageError::invalid("bounds", reason))?;

        let min_zoom = self.min_zoom.unwrap_or(config.default_min_zoom);
        let max_zoom = self.max_zoom.unwrap_or(config.default_max_zoom);
        if max_zoom > MAX_ZOOM {
            return Err(PackageError::invalid(
                "max_zoom",
                format!("{} is above the highest zoom level {}", max_zoom, MAX_ZOOM),
            ));
        }
        if min_zoom > max_zoom {
            return Err(PackageError::invalid(
                "min_zoom",
                format!("{} is above max zoom {}", min_zoom, max_zoom),
            ));
        }

        let region_name = non_blank(self.region_name).unwrap_or_else(|| package_id.clone());

        Ok(PackageRecord::new(
            package_id,
            region_name,
            style_reference,
            self.bounds,
            min_zoom,
            max_zoom,
        )
        .with_tenant(non_blank(self.company_id), non_blank(self.farm_id))
        .with_payloads(self.boundary_geojson, self.trap_geojson))
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::PackageStatus;

    fn bounds() -> Bounds {
        Bounds::new(-49.0, -22.0, -48.5, -21.5)
    }

    #[test]
    fn test_defaults_applied() {
        let record = PrepareRequest::new("farm1-north", bounds())
            .into_record(&ControllerConfig::default())
            .unwrap();

        assert_eq!(record.region_name, "farm1-north");
        assert_eq!(record.style_reference, "mapbox://styles/mapbox/standard-satellite");
        assert_eq!((record.min_zoom, record.max_zoom), (12, 16));
        assert_eq!(record.status, PackageStatus::Queued);
        assert_eq!(record.tile_asset_id, "farm1-north");
    }

    #[test]
    fn test_blank_id_rejected() {
        let err = PrepareRequest::new("   ", bounds())
            .into_record(&ControllerConfig::default())
            .unwrap_err();
        assert!(matches!(
            err,
            PackageError::InvalidParameter { field: "package_id", .. }
        ));
    }

    #[test]
    fn test_inverted_zoom_rejected() {
        let err = PrepareRequest::new("farm1", bounds())
            .with_zoom(14, 10)
            .into_record(&ControllerConfig::default())
            .unwrap_err();
        assert!(matches!(err, PackageError::InvalidParameter { field: "min_zoom", .. }));
    }

    #[test]
    fn test_bad_bounds_rejected() {
        let err = PrepareRequest::new("farm1", Bounds::new(-48.5, -22.0, -49.0, -21.5))
            .into_record(&ControllerConfig::default())
            .unwrap_err();
        assert!(matches!(err, PackageError::InvalidParameter { field: "bounds", .. }));
    }

    #[test]
    fn test_blank_style_falls_back_to_default() {
        let config = ControllerConfig::default().with_default_style("https://s.example.com/a.json");
        let record = PrepareRequest::new("farm1", bounds())
            .with_style("  ")
            .with_region_name("Farm 1")
            .into_record(&config)
            .unwrap();
        assert_eq!(record.style_reference, "https://s.example.com/a.json");
        assert_eq!(record.style_asset_id, "https://s.example.com/a.json");
        assert_eq!(record.region_name, "Farm 1");
    }
}
