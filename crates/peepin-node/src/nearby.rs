//! Location sharing and nearby lookups on top of profile storage.
//!
//! Glue between the HTTP/admin surfaces and the proximity core: loads
//! profiles from storage, hands them to the resolver and keeps each profile's
//! `shareLocation` flag in step with what the user asked for.

use crate::error::{Error, Result};
use crate::models::UserProfile;
use crate::storage::Storage;
use peepin_geo::{radar_position, RadarOffset};
use peepin_proximity::{
    LocationStore, LocationUpdate, NearbyQuery, NearbyResult, ProximityPolicy, ProximityResolver,
    SubmitOutcome, Timestamp,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Acknowledgement for a location submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAck {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<Timestamp>,
}

/// Query-string parameters of `GET /api/nearby`.
///
/// Kept as raw strings so that a bad value can fall back to a default, or be
/// reported with the usual JSON error body, instead of failing extraction.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NearbyParams {
    pub lat: Option<String>,
    pub lng: Option<String>,
    pub radius: Option<String>,
    /// Display radius for radar offsets; omitted means no offsets
    pub radar_radius: Option<String>,
}

impl NearbyParams {
    /// Resolve into a core query. Empty coordinates count as absent; a
    /// coordinate that is not a number is an error. An unparseable radius is
    /// left for the default.
    fn query(&self) -> Result<NearbyQuery> {
        Ok(NearbyQuery {
            lat: coordinate("lat", self.lat.as_deref())?,
            lng: coordinate("lng", self.lng.as_deref())?,
            radius: lenient(self.radius.as_deref()),
        })
    }

    /// Radar display radius, if usable offsets were asked for.
    fn display_radius(&self) -> Result<Option<f64>> {
        match lenient(self.radar_radius.as_deref()) {
            Some(r) if r.is_finite() && r >= 0.0 => Ok(Some(r)),
            Some(r) => Err(Error::InvalidInput(format!(
                "radarRadius must be a non-negative number, got {r}"
            ))),
            None => Ok(None),
        }
    }
}

fn present(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|s| !s.is_empty())
}

fn coordinate(name: &str, raw: Option<&str>) -> Result<Option<f64>> {
    present(raw)
        .map(|s| {
            s.parse::<f64>()
                .map_err(|_| Error::InvalidInput(format!("{name} must be a number, got {s:?}")))
        })
        .transpose()
}

fn lenient(raw: Option<&str>) -> Option<f64> {
    present(raw).and_then(|s| s.parse().ok())
}

/// One entry of the nearby response.
#[derive(Debug, Clone, Serialize)]
pub struct NearbyEntry {
    #[serde(flatten)]
    pub result: NearbyResult<UserProfile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub radar: Option<RadarOffset>,
}

/// Location sharing service shared by the API and the admin socket.
pub struct NearbyService {
    storage: Arc<Storage>,
    resolver: ProximityResolver,
}

impl NearbyService {
    /// Create a service with an empty location store.
    pub fn new(storage: Arc<Storage>, policy: ProximityPolicy) -> Self {
        let resolver = ProximityResolver::new(Arc::new(LocationStore::new()), policy);
        Self { storage, resolver }
    }

    /// The underlying resolver.
    pub fn resolver(&self) -> &ProximityResolver {
        &self.resolver
    }

    /// Apply a location update from `user_id`.
    ///
    /// The profile's sharing flag is persisted before the location store is
    /// touched, so a storage failure leaves no location behind.
    pub fn submit_location(
        &self,
        user_id: &str,
        update: &LocationUpdate,
        now: Timestamp,
    ) -> Result<SubmitAck> {
        let share = if update.disables_sharing() {
            false
        } else {
            update.position()?;
            update.share.unwrap_or(true)
        };
        self.storage.set_share_location(user_id, share)?;

        match self.resolver.submit(user_id, update, &*self.storage, now)? {
            SubmitOutcome::Disabled => Ok(SubmitAck {
                ok: true,
                disabled: Some(true),
                updated_at: None,
            }),
            SubmitOutcome::Updated { location, .. } => Ok(SubmitAck {
                ok: true,
                disabled: None,
                updated_at: Some(location.updated_at),
            }),
        }
    }

    /// Ranked nearby users for `user_id`, optionally with radar offsets.
    pub fn nearby(
        &self,
        user_id: &str,
        params: &NearbyParams,
        now: Timestamp,
    ) -> Result<Vec<NearbyEntry>> {
        let display_radius = params.display_radius()?;
        let query = params.query()?;
        let radius = query.radius_or(self.resolver.policy().default_radius_m);
        let results = self.resolver.query(user_id, &query, &*self.storage, now)?;

        Ok(results
            .into_iter()
            .map(|result| {
                let radar = display_radius
                    .map(|r| radar_position(&result.user_id, result.distance, radius, r));
                NearbyEntry { result, radar }
            })
            .collect())
    }

    /// Turn a user's sharing on or off. Turning it off also drops their
    /// stored location.
    pub fn set_sharing(&self, user_id: &str, share: bool) -> Result<UserProfile> {
        let user = self.storage.set_share_location(user_id, share)?;
        if !share {
            self.resolver.store().remove(user_id);
        }
        Ok(user)
    }

    /// Drop a user's stored location. Returns whether one existed.
    pub fn forget_location(&self, user_id: &str) -> bool {
        self.resolver.store().remove(user_id).is_some()
    }

    /// Prune stale locations now. Returns how many were removed.
    pub fn prune_stale(&self, now: Timestamp) -> usize {
        self.resolver.prune_stale(now)
    }

    /// Number of locations currently held.
    pub fn location_count(&self) -> usize {
        self.resolver.store().len()
    }
}
