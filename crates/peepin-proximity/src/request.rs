//! Raw caller input for submitting locations and querying nearby users.
//!
//! Fields arrive optional because they come straight off the wire; the
//! methods here decide what is missing, what is invalid and what falls back
//! to policy defaults.

use crate::error::{Error, Result};
use crate::location::UserLocation;
use peepin_geo::GeoPoint;
use serde::{Deserialize, Serialize};

/// A location-sharing update from a user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocationUpdate {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub accuracy: Option<f64>,
    pub precision: Option<bool>,
    /// `Some(false)` turns sharing off and discards the stored location
    pub share: Option<bool>,
}

impl LocationUpdate {
    /// An update carrying just a position.
    pub fn at(lat: f64, lng: f64) -> Self {
        Self {
            lat: Some(lat),
            lng: Some(lng),
            ..Default::default()
        }
    }

    /// An update that turns sharing off.
    pub fn disable() -> Self {
        Self {
            share: Some(false),
            ..Default::default()
        }
    }

    /// Whether this update explicitly disables sharing.
    pub fn disables_sharing(&self) -> bool {
        self.share == Some(false)
    }

    /// The position carried by the update.
    ///
    /// Both coordinates must be present and finite.
    pub fn position(&self) -> Result<GeoPoint> {
        match (self.lat, self.lng) {
            (Some(lat), Some(lng)) if lat.is_finite() && lng.is_finite() => {
                Ok(GeoPoint::new(lat, lng))
            }
            (Some(_), Some(_)) => Err(Error::InvalidInput(
                "lat and lng must be finite numbers".into(),
            )),
            _ => Err(Error::InvalidInput("lat and lng are required".into())),
        }
    }
}

/// Result of applying a [`LocationUpdate`].
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// Sharing was turned off and any stored location removed
    Disabled,

    /// The location was stored
    Updated {
        location: UserLocation,
        /// Value the owner's `shareLocation` flag should now hold
        share_location: bool,
    },
}

/// Parameters of a nearby query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NearbyQuery {
    /// Explicit base latitude; overrides the requester's stored position
    pub lat: Option<f64>,
    /// Explicit base longitude
    pub lng: Option<f64>,
    /// Search radius in meters
    pub radius: Option<f64>,
}

impl NearbyQuery {
    /// The explicit base position, if one was given.
    ///
    /// `Ok(None)` means "use the requester's stored location". Supplying only
    /// one coordinate, or a non-finite one, is an error.
    pub fn base_override(&self) -> Result<Option<GeoPoint>> {
        match (self.lat, self.lng) {
            (None, None) => Ok(None),
            (Some(lat), Some(lng)) if lat.is_finite() && lng.is_finite() => {
                Ok(Some(GeoPoint::new(lat, lng)))
            }
            (Some(_), Some(_)) => Err(Error::InvalidInput(
                "lat and lng must be finite numbers".into(),
            )),
            _ => Err(Error::InvalidInput(
                "lat and lng must be supplied together".into(),
            )),
        }
    }

    /// The requested radius, or `default` when absent or unusable.
    pub fn radius_or(&self, default: f64) -> f64 {
        match self.radius {
            Some(r) if r.is_finite() && r > 0.0 => r,
            _ => default,
        }
    }
}
