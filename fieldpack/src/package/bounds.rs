//! Geographic bounds and the polygon sent to the tile store.

use serde::{Deserialize, Serialize};

/// A longitude/latitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LngLat {
    pub lng: f64,
    pub lat: f64,
}

impl LngLat {
    pub const fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }
}

/// Rectangular package extent.
///
/// Serialized as a four element array `[west, south, east, north]`, which is
/// the layout both the UI and the persisted blob use.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct Bounds {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl Bounds {
    /// Create bounds from west, south, east, north.
    pub const fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west,
            south,
            east,
            north,
        }
    }

    /// Check that the bounds describe a real, non-empty rectangle.
    ///
    /// Returns a human-readable reason on failure.
    pub fn check(&self) -> Result<(), String> {
        let values = [self.west, self.south, self.east, self.north];
        if values.iter().any(|v| !v.is_finite()) {
            return Err("all four bounds must be finite numbers".to_string());
        }
        if !(-180.0..=180.0).contains(&self.west) || !(-180.0..=180.0).contains(&self.east) {
            return Err("longitudes must be within [-180, 180]".to_string());
        }
        if !(-90.0..=90.0).contains(&self.south) || !(-90.0..=90.0).contains(&self.north) {
            return Err("latitudes must be within [-90, 90]".to_string());
        }
        if self.west >= self.east {
            return Err(format!(
                "west ({}) must be less than east ({})",
                self.west, self.east
            ));
        }
        if self.south >= self.north {
            return Err(format!(
                "south ({}) must be less than north ({})",
                self.south, self.north
            ));
        }
        Ok(())
    }

    /// Closed ring around the bounds, counter-clockwise from the south-west
    /// corner: (W,S), (E,S), (E,N), (W,N), (W,S).
    pub fn ring(&self) -> [LngLat; 5] {
        [
            LngLat::new(self.west, self.south),
            LngLat::new(self.east, self.south),
            LngLat::new(self.east, self.north),
            LngLat::new(self.west, self.north),
            LngLat::new(self.west, self.south),
        ]
    }

    /// Polygon with a single outer ring covering the bounds.
    pub fn to_polygon(&self) -> Polygon {
        Polygon {
            rings: vec![self.ring().to_vec()],
        }
    }

    /// Tuple view `[west, south, east, north]`.
    pub const fn to_array(&self) -> [f64; 4] {
        [self.west, self.south, self.east, self.north]
    }
}

impl From<[f64; 4]> for Bounds {
    fn from(v: [f64; 4]) -> Self {
        Self::new(v[0], v[1], v[2], v[3])
    }
}

impl From<Bounds> for [f64; 4] {
    fn from(b: Bounds) -> Self {
        b.to_array()
    }
}

/// Polygon geometry: the first ring is the outer boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    pub rings: Vec<Vec<LngLat>>,
}

impl Polygon {
    /// Smallest bounds containing every vertex, or `None` for an empty polygon.
    pub fn bounding_box(&self) -> Option<Bounds> {
        let mut points = self.rings.iter().flatten();
        let first = points.next()?;
        let mut b = Bounds::new(first.lng, first.lat, first.lng, first.lat);
        for p in points {
            b.west = b.west.min(p.lng);
            b.east = b.east.max(p.lng);
            b.south = b.south.min(p.lat);
            b.north = b.north.max(p.lat);
        }
        Some(b)
    }
}
