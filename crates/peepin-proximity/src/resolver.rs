//! Nearby-people resolution.
//!
//! A query runs in five steps:
//! 1. prune records older than the stale threshold
//! 2. pick the base position (explicit override, else the requester's record)
//! 3. drop candidates whose profile is missing or not sharing
//! 4. classify each remaining candidate as `nearby`, `recent` or excluded
//! 5. rank: every `nearby` before every `recent`, closest first within each

use crate::error::{Error, Result};
use crate::location::UserLocation;
use crate::policy::ProximityPolicy;
use crate::request::{LocationUpdate, NearbyQuery, SubmitOutcome};
use crate::store::LocationStore;
use crate::Timestamp;
use peepin_geo::{haversine_distance, GeoPoint};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// A user profile as far as proximity cares.
pub trait SharingProfile {
    /// Whether the owner allows their location to be shown to others.
    fn shares_location(&self) -> bool;
}

/// Resolves user ids to profiles.
pub trait ProfileLookup {
    type Profile: SharingProfile + Clone;

    /// The profile for `user_id`, or `None` if it does not exist.
    fn lookup(&self, user_id: &str) -> Option<Self::Profile>;
}

impl<P: SharingProfile + Clone> ProfileLookup for HashMap<String, P> {
    type Profile = P;

    fn lookup(&self, user_id: &str) -> Option<P> {
        self.get(user_id).cloned()
    }
}

/// How a candidate relates to the base position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NearbyStatus {
    /// Within the query radius right now
    Nearby,
    /// Outside the radius but seen within the recent window
    Recent,
}

impl NearbyStatus {
    /// Sort rank; lower sorts first.
    pub fn rank(self) -> u8 {
        match self {
            Self::Nearby => 0,
            Self::Recent => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Nearby => "nearby",
            Self::Recent => "recent",
        }
    }
}

impl std::fmt::Display for NearbyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of a nearby list. Computed per query, never stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NearbyResult<P> {
    #[serde(skip)]
    pub user_id: String,
    pub user: P,
    /// Great-circle distance from the base, in meters
    pub distance: f64,
    pub status: NearbyStatus,
    /// `updated_at` of the candidate's stored location
    pub last_seen: Timestamp,
}

/// Classify a candidate, or `None` to exclude it.
pub(crate) fn classify(
    distance: f64,
    radius_m: f64,
    age: Duration,
    recent_window: Duration,
) -> Option<NearbyStatus> {
    if distance <= radius_m {
        Some(NearbyStatus::Nearby)
    } else if age < recent_window {
        Some(NearbyStatus::Recent)
    } else {
        None
    }
}

/// The authoritative nearby-people resolver.
///
/// Owns the policy and shares the [`LocationStore`] with whoever else needs
/// it (admin tooling, background pruning).
#[derive(Debug, Clone)]
pub struct ProximityResolver {
    store: Arc<LocationStore>,
    policy: ProximityPolicy,
}

impl ProximityResolver {
    /// Create a resolver over `store`.
    pub fn new(store: Arc<LocationStore>, policy: ProximityPolicy) -> Self {
        Self { store, policy }
    }

    /// The shared location store.
    pub fn store(&self) -> &Arc<LocationStore> {
        &self.store
    }

    /// The active policy.
    pub fn policy(&self) -> &ProximityPolicy {
        &self.policy
    }

    /// Prune records past the stale threshold. Returns how many were removed.
    pub fn prune_stale(&self, now: Timestamp) -> usize {
        self.store.prune_older_than(self.policy.stale_threshold, now)
    }

    /// Apply a location update from `user_id`.
    ///
    /// Unknown users are rejected. An explicit `share: false` removes the
    /// stored location; anything else must carry a finite position.
    pub fn submit<L: ProfileLookup>(
        &self,
        user_id: &str,
        update: &LocationUpdate,
        profiles: &L,
        now: Timestamp,
    ) -> Result<SubmitOutcome> {
        if profiles.lookup(user_id).is_none() {
            return Err(Error::NotFound(format!("user {user_id}")));
        }

        if update.disables_sharing() {
            self.store.remove(user_id);
            tracing::info!(user_id, "Location sharing disabled");
            return Ok(SubmitOutcome::Disabled);
        }

        let position = update.position()?;
        let location = self.store.upsert(
            user_id,
            position.lat,
            position.lng,
            update.accuracy,
            update.precision.unwrap_or(false),
            now,
        )?;
        tracing::debug!(user_id, %position, "Location updated");

        Ok(SubmitOutcome::Updated {
            location,
            share_location: update.share.unwrap_or(true),
        })
    }

    /// Resolve a raw [`NearbyQuery`] for `requester_id`.
    pub fn query<L: ProfileLookup>(
        &self,
        requester_id: &str,
        query: &NearbyQuery,
        profiles: &L,
        now: Timestamp,
    ) -> Result<Vec<NearbyResult<L::Profile>>> {
        let base = query.base_override()?;
        let radius_m = query.radius_or(self.policy.default_radius_m);
        self.find_nearby(requester_id, base, radius_m, profiles, now)
    }

    /// Ranked nearby/recent users around `base`, or around the requester's
    /// own stored location when `base` is `None`.
    ///
    /// Fails with [`Error::InvalidInput`] if there is no base to search from.
    /// Finding nobody is an empty list, not an error.
    pub fn find_nearby<L: ProfileLookup>(
        &self,
        requester_id: &str,
        base: Option<GeoPoint>,
        radius_m: f64,
        profiles: &L,
        now: Timestamp,
    ) -> Result<Vec<NearbyResult<L::Profile>>> {
        if !(radius_m.is_finite() && radius_m >= 0.0) {
            return Err(Error::InvalidInput(format!(
                "radius must be a non-negative number, got {radius_m}"
            )));
        }

        self.prune_stale(now);

        let base = match base {
            Some(point) if point.is_finite() => point,
            Some(point) => {
                return Err(Error::InvalidInput(format!(
                    "base position must be finite, got {point}"
                )))
            }
            None => self
                .store
                .get(requester_id)
                .map(|loc| loc.position())
                .ok_or_else(|| Error::InvalidInput("base location unavailable".into()))?,
        };

        let mut results: Vec<_> = self
            .store
            .all_except(requester_id)
            .into_iter()
            .filter_map(|loc| self.evaluate(loc, base, radius_m, profiles, now))
            .collect();

        results.sort_by(|a, b| {
            a.status
                .rank()
                .cmp(&b.status.rank())
                .then(a.distance.total_cmp(&b.distance))
                .then_with(|| a.user_id.cmp(&b.user_id))
        });

        tracing::debug!(
            requester_id,
            radius_m,
            matched = results.len(),
            "Resolved nearby users"
        );
        Ok(results)
    }

    fn evaluate<L: ProfileLookup>(
        &self,
        loc: UserLocation,
        base: GeoPoint,
        radius_m: f64,
        profiles: &L,
        now: Timestamp,
    ) -> Option<NearbyResult<L::Profile>> {
        // A cleared sharing flag wins over a location record that still exists.
        let user = profiles.lookup(&loc.user_id)?;
        if !user.shares_location() {
            return None;
        }

        let distance = haversine_distance(base, loc.position());
        let status = classify(distance, radius_m, loc.age_at(now), self.policy.recent_window)?;

        Some(NearbyResult {
            user_id: loc.user_id,
            user,
            distance,
            status,
            last_seen: loc.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use peepin_geo::EARTH_RADIUS_METERS;

    const NOW: Timestamp = 1_700_000_000_000;
    const SECOND_MS: u64 = 1_000;
    const BASE: GeoPoint = GeoPoint::new(47.6062, -122.3321);

    #[derive(Debug, Clone, PartialEq)]
    struct Profile {
        share: bool,
    }

    impl SharingProfile for Profile {
        fn shares_location(&self) -> bool {
            self.share
        }
    }

    fn profiles(ids: &[&str]) -> HashMap<String, Profile> {
        ids.iter()
            .map(|id| (id.to_string(), Profile { share: true }))
            .collect()
    }

    fn resolver() -> ProximityResolver {
        ProximityResolver::new(Arc::new(LocationStore::new()), ProximityPolicy::default())
    }

    /// A point `meters` due north of `BASE`.
    fn north(meters: f64) -> GeoPoint {
        let degrees = (meters / EARTH_RADIUS_METERS).to_degrees();
        GeoPoint::new(BASE.lat + degrees, BASE.lng)
    }

    fn place(r: &ProximityResolver, id: &str, at: GeoPoint, updated_at: Timestamp) {
        r.store()
            .upsert(id, at.lat, at.lng, None, false, updated_at)
            .unwrap();
    }

    fn ids<P>(results: &[NearbyResult<P>]) -> Vec<&str> {
        results.iter().map(|r| r.user_id.as_str()).collect()
    }

    #[test]
    fn classify_boundaries() {
        let window = Duration::from_secs(60);
        assert_eq!(
            classify(100.0, 100.0, Duration::from_secs(500), window),
            Some(NearbyStatus::Nearby)
        );
        assert_eq!(
            classify(101.0, 100.0, Duration::from_secs(59), window),
            Some(NearbyStatus::Recent)
        );
        assert_eq!(classify(101.0, 100.0, Duration::from_secs(60), window), None);
        assert_eq!(classify(f64::NAN, 100.0, Duration::from_secs(60), window), None);
    }

    #[test]
    fn ranks_nearby_before_recent() {
        let r = resolver();
        let users = profiles(&["me", "a", "b", "c"]);
        place(&r, "me", BASE, NOW);
        place(&r, "a", north(100.0), NOW - 120 * SECOND_MS);
        place(&r, "b", north(50.0), NOW - 120 * SECOND_MS);
        place(&r, "c", north(3000.0), NOW - 10 * SECOND_MS);

        let results = r.find_nearby("me", None, 2000.0, &users, NOW).unwrap();

        assert_eq!(ids(&results), vec!["b", "a", "c"]);
        assert_eq!(results[0].status, NearbyStatus::Nearby);
        assert_eq!(results[1].status, NearbyStatus::Nearby);
        assert_eq!(results[2].status, NearbyStatus::Recent);
        assert!((results[0].distance - 50.0).abs() < 1e-6);
        assert!((results[2].distance - 3000.0).abs() < 1e-6);
    }

    #[test]
    fn recent_window_cutoff() {
        let r = resolver();
        let users = profiles(&["me", "fresh", "faded"]);
        place(&r, "me", BASE, NOW);
        place(&r, "fresh", north(5000.0), NOW - 30 * SECOND_MS);
        place(&r, "faded", north(5000.0), NOW - 90 * SECOND_MS);

        let results = r.find_nearby("me", None, 2000.0, &users, NOW).unwrap();

        assert_eq!(ids(&results), vec!["fresh"]);
        assert_eq!(results[0].status, NearbyStatus::Recent);
        assert_eq!(results[0].last_seen, NOW - 30 * SECOND_MS);
    }

    #[test]
    fn stale_records_are_pruned_before_resolving() {
        let r = resolver();
        let users = profiles(&["me", "ghost"]);
        place(&r, "me", BASE, NOW);
        place(&r, "ghost", north(10.0), NOW - 11 * 60 * SECOND_MS);

        let results = r.find_nearby("me", None, 2000.0, &users, NOW).unwrap();

        assert!(results.is_empty());
        assert!(r.store().get("ghost").is_none());
        assert!(r.find_nearby("me", None, 2000.0, &users, NOW).unwrap().is_empty());
    }

    #[test]
    fn opted_out_profiles_are_suppressed() {
        let r = resolver();
        let mut users = profiles(&["me", "shy"]);
        users.insert("shy".into(), Profile { share: false });
        place(&r, "me", BASE, NOW);
        place(&r, "shy", north(10.0), NOW);

        let results = r.find_nearby("me", None, 2000.0, &users, NOW).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn unknown_profiles_are_skipped() {
        let r = resolver();
        let users = profiles(&["me", "known"]);
        place(&r, "me", BASE, NOW);
        place(&r, "known", north(20.0), NOW);
        place(&r, "deleted", north(10.0), NOW);

        let results = r.find_nearby("me", None, 2000.0, &users, NOW).unwrap();
        assert_eq!(ids(&results), vec!["known"]);
    }

    #[test]
    fn requester_is_never_listed() {
        let r = resolver();
        let users = profiles(&["me"]);
        place(&r, "me", BASE, NOW);

        let results = r.find_nearby("me", None, 2000.0, &users, NOW).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn missing_base_is_an_error() {
        let r = resolver();
        let users = profiles(&["me", "other"]);
        place(&r, "other", north(10.0), NOW);

        let err = r.find_nearby("me", None, 2000.0, &users, NOW).unwrap_err();
        assert_eq!(err, Error::InvalidInput("base location unavailable".into()));
    }

    #[test]
    fn stale_own_location_is_no_base() {
        let r = resolver();
        let users = profiles(&["me"]);
        place(&r, "me", BASE, NOW - 11 * 60 * SECOND_MS);

        assert!(r.find_nearby("me", None, 2000.0, &users, NOW).is_err());
    }

    #[test]
    fn explicit_base_overrides_stored() {
        let r = resolver();
        let users = profiles(&["me", "far"]);
        place(&r, "me", BASE, NOW);
        place(&r, "far", north(10_000.0), NOW - 120 * SECOND_MS);

        assert!(r.find_nearby("me", None, 2000.0, &users, NOW).unwrap().is_empty());

        let results = r
            .find_nearby("me", Some(north(9_900.0)), 2000.0, &users, NOW)
            .unwrap();
        assert_eq!(ids(&results), vec!["far"]);
        assert!((results[0].distance - 100.0).abs() < 1e-6);
    }

    #[test]
    fn explicit_base_without_stored_location() {
        let r = resolver();
        let users = profiles(&["me", "other"]);
        place(&r, "other", north(10.0), NOW);

        let results = r.find_nearby("me", Some(BASE), 2000.0, &users, NOW).unwrap();
        assert_eq!(ids(&results), vec!["other"]);
    }

    #[test]
    fn rejects_bad_radius_and_base() {
        let r = resolver();
        let users = profiles(&["me"]);
        assert!(r.find_nearby("me", Some(BASE), f64::NAN, &users, NOW).is_err());
        assert!(r.find_nearby("me", Some(BASE), -1.0, &users, NOW).is_err());
        assert!(r
            .find_nearby("me", Some(GeoPoint::new(f64::NAN, 0.0)), 10.0, &users, NOW)
            .is_err());
    }

    #[test]
    fn equal_distances_break_ties_by_id() {
        let r = resolver();
        let users = profiles(&["me", "zed", "amy"]);
        place(&r, "me", BASE, NOW);
        place(&r, "zed", north(10.0), NOW);
        place(&r, "amy", north(10.0), NOW);

        let results = r.find_nearby("me", None, 2000.0, &users, NOW).unwrap();
        assert_eq!(ids(&results), vec!["amy", "zed"]);
    }

    #[test]
    fn removal_twice_still_excludes() {
        let r = resolver();
        let users = profiles(&["me", "gone"]);
        place(&r, "me", BASE, NOW);
        place(&r, "gone", north(10.0), NOW);

        r.store().remove("gone");
        r.store().remove("gone");

        assert!(r.find_nearby("me", None, 2000.0, &users, NOW).unwrap().is_empty());
        assert_eq!(r.store().len(), 1);
    }

    #[test]
    fn submit_stores_and_reports_share_flag() {
        let r = resolver();
        let users = profiles(&["me"]);

        let update = LocationUpdate {
            accuracy: Some(8.0),
            precision: Some(true),
            ..LocationUpdate::at(BASE.lat, BASE.lng)
        };
        let outcome = r.submit("me", &update, &users, NOW).unwrap();

        match outcome {
            SubmitOutcome::Updated {
                location,
                share_location,
            } => {
                assert!(share_location);
                assert_eq!(location.accuracy, Some(8.0));
                assert!(location.precision);
                assert_eq!(location.updated_at, NOW);
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        assert!(r.store().get("me").is_some());
    }

    #[test]
    fn submit_disable_removes_record() {
        let r = resolver();
        let users = profiles(&["me"]);
        place(&r, "me", BASE, NOW);

        let outcome = r.submit("me", &LocationUpdate::disable(), &users, NOW).unwrap();
        assert_eq!(outcome, SubmitOutcome::Disabled);
        assert!(r.store().get("me").is_none());

        // Disabling again is harmless.
        let outcome = r.submit("me", &LocationUpdate::disable(), &users, NOW).unwrap();
        assert_eq!(outcome, SubmitOutcome::Disabled);
    }

    #[test]
    fn submit_validates_input_and_user() {
        let r = resolver();
        let users = profiles(&["me"]);

        let err = r
            .submit("me", &LocationUpdate::default(), &users, NOW)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));

        let err = r
            .submit("stranger", &LocationUpdate::at(1.0, 2.0), &users, NOW)
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert!(r.store().is_empty());
    }

    #[test]
    fn query_uses_default_radius() {
        let r = resolver();
        let users = profiles(&["me", "inside", "outside"]);
        place(&r, "me", BASE, NOW);
        place(&r, "inside", north(1_900.0), NOW - 120 * SECOND_MS);
        place(&r, "outside", north(2_100.0), NOW - 120 * SECOND_MS);

        let results = r.query("me", &NearbyQuery::default(), &users, NOW).unwrap();
        assert_eq!(ids(&results), vec!["inside"]);

        let wide = NearbyQuery {
            radius: Some(2_500.0),
            ..Default::default()
        };
        let results = r.query("me", &wide, &users, NOW).unwrap();
        assert_eq!(ids(&results), vec!["inside", "outside"]);
    }

    #[test]
    fn result_serializes_wire_shape() {
        #[derive(Clone, Serialize)]
        struct Named {
            name: &'static str,
        }
        impl SharingProfile for Named {
            fn shares_location(&self) -> bool {
                true
            }
        }

        let result = NearbyResult {
            user_id: "ava".into(),
            user: Named { name: "Ava" },
            distance: 12.5,
            status: NearbyStatus::Recent,
            last_seen: 42,
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["user"]["name"], "Ava");
        assert_eq!(json["status"], "recent");
        assert_eq!(json["lastSeen"], 42);
        assert_eq!(json["distance"], 12.5);
        assert!(json.get("userId").is_none());
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn ranking_is_status_then_distance(
                candidates in prop::collection::vec((0.0f64..5_000.0, 0u64..300), 0..20)
            ) {
                let r = resolver();
                let mut users = profiles(&["me"]);
                place(&r, "me", BASE, NOW);
                for (i, (meters, age_s)) in candidates.iter().enumerate() {
                    let id = format!("u{i}");
                    users.insert(id.clone(), Profile { share: true });
                    place(&r, &id, north(*meters), NOW - age_s * SECOND_MS);
                }

                let results = r.find_nearby("me", None, 2_000.0, &users, NOW).unwrap();

                for pair in results.windows(2) {
                    let (a, b) = (&pair[0], &pair[1]);
                    prop_assert!(
                        (a.status.rank(), a.distance) <= (b.status.rank(), b.distance)
                    );
                }
                for result in &results {
                    let age = Duration::from_millis(NOW - result.last_seen);
                    prop_assert_eq!(
                        Some(result.status),
                        classify(result.distance, 2_000.0, age, r.policy().recent_window)
                    );
                }
                let expected = candidates
                    .iter()
                    .filter(|(meters, age_s)| {
                        let d = haversine_distance(BASE, north(*meters));
                        d <= 2_000.0 || *age_s < 60
                    })
                    .count();
                prop_assert_eq!(results.len(), expected);
            }
        }
    }
}
