//! Great-circle geometry for routing.
//!
//! Haversine distance is the search heuristic and the path-length metric,
//! so it must stay pure and symmetric.

use serde::{Deserialize, Serialize};

/// Earth radius in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// A latitude/longitude pair in decimal degrees.
///
/// Equality is exact coordinate equality, without tolerance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    #[serde(alias = "lng")]
    pub lon: f64,
}

impl GeoPoint {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// True when both coordinates are finite and inside the WGS84 ranges.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }

    /// Haversine distance to `other` in kilometers.
    pub fn distance_to(&self, other: &GeoPoint) -> f64 {
        distance(*self, *other)
    }
}

impl From<(f64, f64)> for GeoPoint {
    fn from((lat, lon): (f64, f64)) -> Self {
        Self { lat, lon }
    }
}

/// Haversine distance between two points in kilometers.
pub fn distance(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat1_rad = a.lat.to_radians();
    let lat2_rad = b.lat.to_radians();
    let delta_lat = (b.lat - a.lat).to_radians();
    let delta_lon = (b.lon - a.lon).to_radians();

    let h = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    // Rounding can push h a hair past 1.0 for antipodal points.
    let c = 2.0 * h.min(1.0).sqrt().asin();

    EARTH_RADIUS_KM * c
}

/// Sum of consecutive haversine distances along a polyline.
pub fn path_length(points: &[GeoPoint]) -> f64 {
    points.windows(2).map(|pair| distance(pair[0], pair[1])).sum()
}

/// Axis-aligned service area in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl BoundingBox {
    /// Rajahmundry service area.
    pub const RAJAHMUNDRY: BoundingBox = BoundingBox {
        north: 17.0100,
        south: 16.9600,
        east: 81.8000,
        west: 81.7500,
    };

    pub const fn new(north: f64, south: f64, east: f64, west: f64) -> Self {
        Self {
            north,
            south,
            east,
            west,
        }
    }

    /// A box must have finite edges with north above south and east of west.
    pub fn is_valid(&self) -> bool {
        [self.north, self.south, self.east, self.west]
            .iter()
            .all(|v| v.is_finite())
            && self.north > self.south
            && self.east > self.west
    }

    pub fn contains(&self, point: GeoPoint) -> bool {
        point.lat >= self.south
            && point.lat <= self.north
            && point.lon >= self.west
            && point.lon <= self.east
    }

    /// Expands the box by a factor of its span on each side (0.1 = 10%).
    pub fn expand(&self, factor: f64) -> Self {
        let lat_pad = (self.north - self.south) * factor;
        let lon_pad = (self.east - self.west) * factor;
        Self {
            north: self.north + lat_pad,
            south: self.south - lat_pad,
            east: self.east + lon_pad,
            west: self.west - lon_pad,
        }
    }
}
