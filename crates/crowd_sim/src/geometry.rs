//! Coordinates and distance metrics.
//!
//! Positions are `(lat, lon)` pairs. How far apart two positions are depends on
//! the configured [`DistanceMetric`]:
//!
//! - **Euclidean**: planar distance in coordinate units. Used for abstract grids
//!   and tests where `(0, 0)` to `(1, 0)` is exactly one unit.
//! - **Haversine**: great-circle kilometres (via `h3o`).
//! - **Manhattan**: city-block kilometres with a flat-earth degree conversion,
//!   the estimate used for ride-hailing trip logs.

use serde::{Deserialize, Serialize};

/// Kilometres per degree of latitude used by the Manhattan estimate.
const KM_PER_DEGREE: f64 = 111.0;

/// Snapping tolerance for "remaining distance fits in one tick" checks.
pub const DISTANCE_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub lat: f64,
    pub lon: f64,
}

impl Point {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lon.is_finite()
    }

    /// Linear interpolation: `fraction` 0.0 is `self`, 1.0 is `target`.
    pub fn lerp(self, target: Point, fraction: f64) -> Point {
        Point {
            lat: self.lat + (target.lat - self.lat) * fraction,
            lon: self.lon + (target.lon - self.lon) * fraction,
        }
    }
}

impl std::fmt::Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.5}, {:.5})", self.lat, self.lon)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    #[default]
    Euclidean,
    Haversine,
    Manhattan,
}

impl DistanceMetric {
    /// Whether positions must be valid latitude/longitude pairs.
    pub fn is_geographic(self) -> bool {
        !matches!(self, DistanceMetric::Euclidean)
    }

    pub fn distance(self, a: Point, b: Point) -> f64 {
        match self {
            DistanceMetric::Euclidean => (a.lat - b.lat).hypot(a.lon - b.lon),
            DistanceMetric::Haversine => haversine_km(a, b),
            DistanceMetric::Manhattan => manhattan_km(a, b),
        }
    }

    /// Validates a coordinate for this metric. Geographic metrics additionally
    /// require `lat` within ±90 and `lon` within ±180.
    pub fn accepts(self, point: Point) -> bool {
        if !point.is_finite() {
            return false;
        }
        if !self.is_geographic() {
            return true;
        }
        (-90.0..=90.0).contains(&point.lat)
            && (-180.0..=180.0).contains(&point.lon)
            && h3o::LatLng::new(point.lat, point.lon).is_ok()
    }
}

fn haversine_km(a: Point, b: Point) -> f64 {
    match (h3o::LatLng::new(a.lat, a.lon), h3o::LatLng::new(b.lat, b.lon)) {
        (Ok(a), Ok(b)) => a.distance_km(b),
        _ => f64::INFINITY,
    }
}

fn manhattan_km(a: Point, b: Point) -> f64 {
    let d_lat = (a.lat - b.lat).abs() * KM_PER_DEGREE;
    let avg_lat = (a.lat + b.lat) / 2.0;
    let d_lon = (a.lon - b.lon).abs() * KM_PER_DEGREE * avg_lat.to_radians().cos();
    d_lat + d_lon
}

/// Number of whole ticks needed to cover `distance` at `speed` per tick.
pub fn ticks_to_cover(distance: f64, speed: f64) -> u64 {
    if distance <= DISTANCE_EPSILON {
        return 0;
    }
    let ticks = (distance / speed - DISTANCE_EPSILON).ceil();
    if ticks.is_finite() && ticks > 0.0 {
        ticks as u64
    } else if ticks.is_finite() {
        1
    } else {
        u64::MAX
    }
}
