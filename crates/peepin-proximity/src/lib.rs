//! Peepin Proximity
//!
//! Turns a stream of opt-in position updates into ranked "nearby people"
//! lists.
//!
//! # Architecture
//!
//! - **Store**: [`LocationStore`], the last known position per user behind a
//!   single mutex, with staleness pruning
//! - **Policy**: [`ProximityPolicy`], stale threshold, recent window and
//!   default radius
//! - **Requests**: [`LocationUpdate`] and [`NearbyQuery`], validation of raw
//!   caller input
//! - **Resolver**: [`ProximityResolver`], pruning, classification into
//!   `nearby`/`recent`, and ranking
//!
//! Profiles live outside this crate. The resolver only needs to look them up
//! by id ([`ProfileLookup`]) and ask whether they share their location
//! ([`SharingProfile`]).
//!
//! # Example
//!
//! ```
//! use std::collections::HashMap;
//! use std::sync::Arc;
//! use peepin_proximity::{
//!     LocationStore, LocationUpdate, ProximityPolicy, ProximityResolver, SharingProfile,
//! };
//!
//! #[derive(Clone)]
//! struct Profile { share: bool }
//! impl SharingProfile for Profile {
//!     fn shares_location(&self) -> bool { self.share }
//! }
//!
//! let resolver = ProximityResolver::new(Arc::new(LocationStore::new()), ProximityPolicy::default());
//! let profiles: HashMap<String, Profile> = [
//!     ("ava".to_string(), Profile { share: true }),
//!     ("kai".to_string(), Profile { share: true }),
//! ].into();
//!
//! let now = 1_700_000_000_000;
//! resolver.submit("ava", &LocationUpdate::at(47.6062, -122.3321), &profiles, now).unwrap();
//! resolver.submit("kai", &LocationUpdate::at(47.6070, -122.3330), &profiles, now).unwrap();
//!
//! let nearby = resolver.find_nearby("ava", None, 2000.0, &profiles, now).unwrap();
//! assert_eq!(nearby.len(), 1);
//! assert_eq!(nearby[0].user_id, "kai");
//! ```

pub mod error;
pub mod location;
pub mod policy;
pub mod request;
pub mod resolver;
pub mod store;

pub use error::{Error, Result};
pub use location::UserLocation;
pub use peepin_geo::GeoPoint;
pub use policy::ProximityPolicy;
pub use request::{LocationUpdate, NearbyQuery, SubmitOutcome};
pub use resolver::{NearbyResult, NearbyStatus, ProfileLookup, ProximityResolver, SharingProfile};
pub use store::LocationStore;

/// Milliseconds since the unix epoch.
pub type Timestamp = u64;

/// Current wall-clock time as a [`Timestamp`].
pub fn now_millis() -> Timestamp {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(duration_millis)
        .unwrap_or(0)
}

/// Whole milliseconds in `d`, saturating at `u64::MAX`.
pub(crate) fn duration_millis(d: std::time::Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
