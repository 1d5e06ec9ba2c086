//! Geographic points and haversine distance.
//!
//! Coordinates are decimal degrees with latitude first. Nothing here validates
//! ranges; a latitude of 95° is just a number to the formula. Callers that
//! accept positions from the outside world check finiteness before storing.

/// A position on the Earth's surface in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GeoPoint {
    /// Latitude in degrees (positive north)
    pub lat: f64,
    /// Longitude in degrees (positive east)
    pub lng: f64,
}

impl GeoPoint {
    /// Create a new point.
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Whether both components are finite numbers.
    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lng.is_finite()
    }

    /// Great-circle distance to `other` in meters.
    pub fn distance_to(&self, other: &Self) -> f64 {
        haversine_distance(*self, *other)
    }
}

impl std::fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.6}, {:.6})", self.lat, self.lng)
    }
}

/// Haversine great-circle distance between two points, in meters.
///
/// ```text
/// h = sin²(Δφ/2) + cos φ1 · cos φ2 · sin²(Δλ/2)
/// d = 2R · atan2(√h, √(1 − h))
/// ```
pub fn haversine_distance(a: GeoPoint, b: GeoPoint) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();

    let sin_lat = (d_lat / 2.0).sin();
    let sin_lng = (d_lng / 2.0).sin();
    let h = sin_lat * sin_lat + lat1.cos() * lat2.cos() * sin_lng * sin_lng;
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    crate::EARTH_RADIUS_METERS * c
}
