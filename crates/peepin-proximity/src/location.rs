//! Stored location records.

use crate::Timestamp;
use peepin_geo::GeoPoint;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Last known position of one user.
///
/// There is at most one record per user; a newer update replaces the whole
/// record rather than merging into it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserLocation {
    /// Owning user
    pub user_id: String,

    /// Latitude in decimal degrees
    pub lat: f64,

    /// Longitude in decimal degrees
    pub lng: f64,

    /// Reported accuracy radius in meters, if the device gave one
    pub accuracy: Option<f64>,

    /// Whether the device asked for high-precision matching
    pub precision: bool,

    /// When this record was last written
    pub updated_at: Timestamp,
}

impl UserLocation {
    /// The stored position as a point.
    pub fn position(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lng)
    }

    /// Age of the record at `now`. Records stamped in the future are age zero.
    pub fn age_at(&self, now: Timestamp) -> Duration {
        Duration::from_millis(now.saturating_sub(self.updated_at))
    }
}
