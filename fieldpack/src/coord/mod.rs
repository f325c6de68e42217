//! Coordinate conversion module
//!
//! Converts geographic coordinates to Web Mercator XYZ tile coordinates and
//! enumerates the tiles covering a package's bounds.

use std::f64::consts::PI;

use thiserror::Error;

use crate::package::Bounds;

/// Highest latitude representable in Web Mercator.
pub const MAX_LAT: f64 = 85.05112878;
/// Lowest latitude representable in Web Mercator.
pub const MIN_LAT: f64 = -85.05112878;
/// Lowest valid longitude.
pub const MIN_LON: f64 = -180.0;
/// Highest zoom level accepted.
pub const MAX_ZOOM: u8 = crate::package::MAX_ZOOM;

/// Errors from coordinate conversion.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordError {
    #[error("invalid latitude: {0}")]
    InvalidLatitude(f64),
    #[error("invalid longitude: {0}")]
    InvalidLongitude(f64),
    #[error("invalid zoom level: {0}")]
    InvalidZoom(u8),
}

/// A single XYZ tile. `row` grows southward from the north pole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileCoord {
    pub row: u32,
    pub col: u32,
    pub zoom: u8,
}

/// Converts geographic coordinates to tile coordinates.
///
/// # Arguments
///
/// * `lat` - Latitude in degrees (-85.05112878 to 85.05112878)
/// * `lon` - Longitude in degrees (-180.0 to 180.0)
/// * `zoom` - Zoom level (0 to 22)
///
/// Points on the east or south edge of the world are clamped into the last
/// tile rather than spilling into a column or row that does not exist.
#[inline]
pub fn to_tile_coords(lat: f64, lon: f64, zoom: u8) -> Result<TileCoord, CoordError> {
    if !(MIN_LAT..=MAX_LAT).contains(&lat) {
        return Err(CoordError::InvalidLatitude(lat));
    }
    if !(MIN_LON..=180.0).contains(&lon) {
        return Err(CoordError::InvalidLongitude(lon));
    }
    if zoom > MAX_ZOOM {
        return Err(CoordError::InvalidZoom(zoom));
    }

    let n = 2.0_f64.powi(zoom as i32);
    let last = n as u32 - 1;

    let col = ((lon + 180.0) / 360.0 * n) as u32;

    // Web Mercator projection
    let lat_rad = lat * PI / 180.0;
    let row = ((1.0 - lat_rad.tan().asinh() / PI) / 2.0 * n) as u32;

    Ok(TileCoord {
        row: row.min(last),
        col: col.min(last),
        zoom,
    })
}

/// Inclusive rectangle of tiles at one zoom level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRange {
    pub zoom: u8,
    pub min_row: u32,
    pub max_row: u32,
    pub min_col: u32,
    pub max_col: u32,
}

impl TileRange {
    /// Number of tiles in the range.
    pub fn len(&self) -> u64 {
        let rows = (self.max_row - self.min_row) as u64 + 1;
        let cols = (self.max_col - self.min_col) as u64 + 1;
        rows * cols
    }

    /// Always false; a range covers at least one tile.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Iterate tiles row by row, west to east.
    pub fn tiles(&self) -> impl Iterator<Item = TileCoord> + '_ {
        (self.min_row..=self.max_row).flat_map(move |row| {
            (self.min_col..=self.max_col).map(move |col| TileCoord {
                row,
                col,
                zoom: self.zoom,
            })
        })
    }
}

/// Tiles covering `bounds` at `zoom`.
///
/// Latitudes beyond the Mercator limit are clamped to it.
pub fn tiles_in_bounds(bounds: &Bounds, zoom: u8) -> Result<TileRange, CoordError> {
    let north = bounds.north.clamp(MIN_LAT, MAX_LAT);
    let south = bounds.south.clamp(MIN_LAT, MAX_LAT);

    let nw = to_tile_coords(north, bounds.west, zoom)?;
    let se = to_tile_coords(south, bounds.east, zoom)?;

    Ok(TileRange {
        zoom,
        min_row: nw.row.min(se.row),
        max_row: nw.row.max(se.row),
        min_col: nw.col.min(se.col),
        max_col: nw.col.max(se.col),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_york_city_at_zoom_16() {
        // New York City: 40.7128°N, 74.0060°W
        let tile = to_tile_coords(40.7128, -74.0060, 16).unwrap();
        assert_eq!(tile.row, 24640);
        assert_eq!(tile.col, 19295);
        assert_eq!(tile.zoom, 16);
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(matches!(
            to_tile_coords(90.0, 0.0, 10),
            Err(CoordError::InvalidLatitude(_))
        ));
        assert!(matches!(
            to_tile_coords(0.0, 181.0, 10),
            Err(CoordError::InvalidLongitude(_))
        ));
        assert!(matches!(
            to_tile_coords(0.0, 0.0, 23),
            Err(CoordError::InvalidZoom(23))
        ));
    }

    #[test]
    fn test_east_edge_clamps_to_last_column() {
        let tile = to_tile_coords(0.0, 180.0, 2).unwrap();
        assert_eq!(tile.col, 3);
    }

    #[test]
    fn test_whole_world_at_zoom_zero_is_one_tile() {
        let range = tiles_in_bounds(&Bounds::new(-180.0, -90.0, 180.0, 90.0), 0).unwrap();
        assert_eq!(range.len(), 1);
        assert_eq!(range.tiles().next(), Some(TileCoord { row: 0, col: 0, zoom: 0 }));
    }

    #[test]
    fn test_range_count_matches_iteration() {
        let bounds = Bounds::new(-49.0, -22.0, -48.5, -21.5);
        for zoom in 8..=12 {
            let range = tiles_in_bounds(&bounds, zoom).unwrap();
            assert_eq!(range.tiles().count() as u64, range.len());
        }
    }

    #[test]
    fn test_range_grows_with_zoom() {
        let bounds = Bounds::new(-49.0, -22.0, -48.5, -21.5);
        let low = tiles_in_bounds(&bounds, 10).unwrap();
        let high = tiles_in_bounds(&bounds, 12).unwrap();
        assert!(high.len() > low.len());
    }
}
