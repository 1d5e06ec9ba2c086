//! Radar placement for nearby results.
//!
//! The radar is a disc centred on the viewer. Each result becomes a dot whose
//! bearing comes from the user id and whose distance from the centre scales
//! with the real distance, capped at the disc edge. Bearings carry no
//! geographic meaning; they only need to be stable per user.

use crate::RADAR_ANGLE_SLOTS;

/// Offset of a radar dot from the radar centre, in display units.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RadarOffset {
    pub x: f64,
    pub y: f64,
}

/// Stable hash of an identifier: the sum of its UTF-16 code units.
///
/// Cheap and order-insensitive, which is fine for spreading dots around a
/// circle. The same string always hashes to the same value on every platform.
pub fn stable_hash(id: &str) -> u64 {
    id.encode_utf16().map(u64::from).sum()
}

/// Project `(id, distance)` onto a radar of `display_radius`.
///
/// `max_distance` is the distance that maps to the disc edge, normally the
/// query radius. A non-positive or non-finite `max_distance` puts every dot on
/// the edge; negative or NaN distances are treated as zero.
pub fn radar_position(
    id: &str,
    distance: f64,
    max_distance: f64,
    display_radius: f64,
) -> RadarOffset {
    let slot = stable_hash(id) % RADAR_ANGLE_SLOTS;
    let angle = (slot as f64).to_radians();

    let fraction = if max_distance.is_finite() && max_distance > 0.0 {
        let d = if distance.is_nan() { 0.0 } else { distance.max(0.0) };
        (d / max_distance).min(1.0)
    } else {
        1.0
    };
    let r = fraction * display_radius;

    RadarOffset {
        x: angle.cos() * r,
        y: angle.sin() * r,
    }
}
