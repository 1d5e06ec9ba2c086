//! Proximity policy values.

use crate::error::{Error, Result};
use std::time::Duration;

/// Records older than this are pruned before any nearby computation.
pub const DEFAULT_STALE_THRESHOLD: Duration = Duration::from_secs(10 * 60);

/// Outside the radius, a user still shows as `recent` if seen this recently.
pub const DEFAULT_RECENT_WINDOW: Duration = Duration::from_secs(60);

/// Query radius used when the caller gives none.
pub const DEFAULT_RADIUS_METERS: f64 = 2000.0;

/// Tunable thresholds for the resolver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProximityPolicy {
    /// Maximum age of a stored location before it is pruned
    pub stale_threshold: Duration,

    /// Maximum age for an out-of-radius candidate to count as `recent`
    pub recent_window: Duration,

    /// Radius applied when a query does not specify a usable one
    pub default_radius_m: f64,
}

impl Default for ProximityPolicy {
    fn default() -> Self {
        Self {
            stale_threshold: DEFAULT_STALE_THRESHOLD,
            recent_window: DEFAULT_RECENT_WINDOW,
            default_radius_m: DEFAULT_RADIUS_METERS,
        }
    }
}

impl ProximityPolicy {
    /// Check that every value is usable.
    ///
    /// The recent window may exceed the stale threshold, but then pruning
    /// wins: a pruned record can never show up as `recent`.
    pub fn validate(&self) -> Result<()> {
        if self.stale_threshold.is_zero() {
            return Err(Error::Policy("stale threshold must be non-zero".into()));
        }
        if self.recent_window.is_zero() {
            return Err(Error::Policy("recent window must be non-zero".into()));
        }
        if !(self.default_radius_m.is_finite() && self.default_radius_m > 0.0) {
            return Err(Error::Policy(format!(
                "default radius must be a positive number, got {}",
                self.default_radius_m
            )));
        }
        Ok(())
    }
}
