//! Peepin Geodesy
//!
//! Distance and placement math for the nearby-people feature.
//!
//! # Distance
//!
//! Positions are decimal-degree latitude/longitude pairs. Distances are
//! great-circle distances on a spherical Earth of radius
//! [`EARTH_RADIUS_METERS`], computed with the haversine formula. No rounding
//! is applied; formatting for display is left to callers.
//!
//! # Radar
//!
//! [`radar_position`] projects a `(user id, distance)` pair onto a 2D radar
//! disc. The angle is derived from a stable hash of the id so a given user's
//! dot stays put between renders; the radius scales with distance and is
//! clamped to the disc edge.

mod point;
mod radar;

pub use point::{haversine_distance, GeoPoint};
pub use radar::{radar_position, stable_hash, RadarOffset};

/// Mean Earth radius in meters used for all distance computations.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Number of discrete angular slots on the radar (one per degree).
pub const RADAR_ANGLE_SLOTS: u64 = 360;
