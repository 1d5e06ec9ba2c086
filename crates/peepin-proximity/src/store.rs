//! In-memory location store.

use crate::error::{Error, Result};
use crate::location::UserLocation;
use crate::{duration_millis, Timestamp};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Last known location per user.
///
/// A single mutex guards the whole map. Every operation is a short O(n) or
/// O(1) critical section and leaves the map consistent, so a poisoned lock is
/// recovered rather than propagated.
#[derive(Debug, Default)]
pub struct LocationStore {
    locations: Mutex<HashMap<String, UserLocation>>,
}

impl LocationStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            locations: Mutex::new(HashMap::new()),
        }
    }

    fn locked(&self) -> MutexGuard<'_, HashMap<String, UserLocation>> {
        self.locations.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert or replace the record for `user_id`.
    ///
    /// `lat` and `lng` must be finite. The previous record is replaced
    /// wholesale; its `updated_at` only survives if `timestamp` is older, so
    /// a user's timestamp never moves backwards.
    pub fn upsert(
        &self,
        user_id: &str,
        lat: f64,
        lng: f64,
        accuracy: Option<f64>,
        precision: bool,
        timestamp: Timestamp,
    ) -> Result<UserLocation> {
        if !lat.is_finite() || !lng.is_finite() {
            return Err(Error::InvalidInput(format!(
                "lat and lng must be finite numbers, got ({lat}, {lng})"
            )));
        }

        let mut locations = self.locked();
        let updated_at = locations
            .get(user_id)
            .map_or(timestamp, |prev| timestamp.max(prev.updated_at));

        let record = UserLocation {
            user_id: user_id.to_string(),
            lat,
            lng,
            accuracy,
            precision,
            updated_at,
        };
        locations.insert(user_id.to_string(), record.clone());
        Ok(record)
    }

    /// Delete the record for `user_id`. Removing an absent record is a no-op.
    pub fn remove(&self, user_id: &str) -> Option<UserLocation> {
        self.locked().remove(user_id)
    }

    /// Remove every record whose age at `now` is at least `max_age`.
    /// Returns the number of records removed.
    pub fn prune_older_than(&self, max_age: Duration, now: Timestamp) -> usize {
        let max_age_ms = duration_millis(max_age);
        let mut locations = self.locked();
        let before = locations.len();
        locations.retain(|_, loc| now.saturating_sub(loc.updated_at) < max_age_ms);
        let removed = before - locations.len();
        if removed > 0 {
            tracing::debug!(removed, remaining = locations.len(), "Pruned stale locations");
        }
        removed
    }

    /// Get the record for `user_id`.
    pub fn get(&self, user_id: &str) -> Option<UserLocation> {
        self.locked().get(user_id).cloned()
    }

    /// Every record except the one owned by `user_id`.
    pub fn all_except(&self, user_id: &str) -> Vec<UserLocation> {
        self.locked()
            .values()
            .filter(|loc| loc.user_id != user_id)
            .cloned()
            .collect()
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.locked().len()
    }

    /// Whether the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.locked().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    const MINUTE_MS: u64 = 60_000;
    const NOW: Timestamp = 1_700_000_000_000;

    #[test]
    fn upsert_then_get() {
        let store = LocationStore::new();
        store
            .upsert("ava", 47.6062, -122.3321, Some(12.0), true, NOW)
            .unwrap();

        let loc = store.get("ava").unwrap();
        assert_eq!(loc.lat, 47.6062);
        assert_eq!(loc.accuracy, Some(12.0));
        assert!(loc.precision);
        assert_eq!(loc.updated_at, NOW);
    }

    #[test]
    fn upsert_replaces_not_merges() {
        let store = LocationStore::new();
        store.upsert("ava", 1.0, 2.0, Some(5.0), true, NOW).unwrap();
        store.upsert("ava", 3.0, 4.0, None, false, NOW + 1_000).unwrap();

        assert_eq!(store.len(), 1);
        let loc = store.get("ava").unwrap();
        assert_eq!((loc.lat, loc.lng), (3.0, 4.0));
        assert_eq!(loc.accuracy, None);
        assert!(!loc.precision);
        assert_eq!(loc.updated_at, NOW + 1_000);
    }

    #[test]
    fn timestamp_never_moves_backwards() {
        let store = LocationStore::new();
        store.upsert("ava", 1.0, 2.0, None, false, NOW).unwrap();
        let loc = store.upsert("ava", 5.0, 6.0, None, false, NOW - 10).unwrap();

        assert_eq!((loc.lat, loc.lng), (5.0, 6.0));
        assert_eq!(loc.updated_at, NOW);
    }

    #[test]
    fn rejects_non_finite_coordinates() {
        let store = LocationStore::new();
        assert!(matches!(
            store.upsert("ava", f64::NAN, 0.0, None, false, NOW),
            Err(Error::InvalidInput(_))
        ));
        assert!(store
            .upsert("ava", 0.0, f64::NEG_INFINITY, None, false, NOW)
            .is_err());
        assert!(store.is_empty());
    }

    #[test]
    fn remove_is_idempotent() {
        let store = LocationStore::new();
        store.upsert("ava", 1.0, 2.0, None, false, NOW).unwrap();
        store.upsert("kai", 1.0, 2.0, None, false, NOW).unwrap();

        assert!(store.remove("ava").is_some());
        assert!(store.remove("ava").is_none());
        assert!(store.get("ava").is_none());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn prune_drops_stale_records() {
        let store = LocationStore::new();
        store.upsert("old", 1.0, 2.0, None, false, NOW - 11 * MINUTE_MS).unwrap();
        store.upsert("edge", 1.0, 2.0, None, false, NOW - 10 * MINUTE_MS).unwrap();
        store.upsert("fresh", 1.0, 2.0, None, false, NOW - 9 * MINUTE_MS).unwrap();

        let removed = store.prune_older_than(Duration::from_secs(600), NOW);

        assert_eq!(removed, 2);
        assert!(store.get("old").is_none());
        assert!(store.get("edge").is_none());
        assert!(store.get("fresh").is_some());
    }

    #[test]
    fn prune_keeps_future_records() {
        let store = LocationStore::new();
        store.upsert("ava", 1.0, 2.0, None, false, NOW + MINUTE_MS).unwrap();
        assert_eq!(store.prune_older_than(Duration::from_secs(600), NOW), 0);
    }

    #[test]
    fn all_except_skips_caller() {
        let store = LocationStore::new();
        for id in ["ava", "kai", "noor"] {
            store.upsert(id, 1.0, 2.0, None, false, NOW).unwrap();
        }

        let mut others: Vec<_> = store
            .all_except("kai")
            .into_iter()
            .map(|l| l.user_id)
            .collect();
        others.sort();
        assert_eq!(others, vec!["ava", "noor"]);
    }

    #[test]
    fn concurrent_upserts_do_not_interfere() {
        let store = Arc::new(LocationStore::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    let id = format!("user_{i}");
                    for step in 0..100u64 {
                        store
                            .upsert(&id, i as f64, step as f64, None, false, NOW + step)
                            .unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(store.len(), 8);
        for i in 0..8 {
            let loc = store.get(&format!("user_{i}")).unwrap();
            assert_eq!(loc.lat, i as f64);
            assert_eq!(loc.lng, 99.0);
            assert_eq!(loc.updated_at, NOW + 99);
        }
    }
}
