//! Freshness policy for cached entries
//!
//! A pure predicate over (entry timestamp, configured interval, now). The
//! interval is configured in minutes but the comparison happens in
//! milliseconds; keeping the unit conversion in one place is the point of
//! this module.

use chrono::{DateTime, Utc};

/// Milliseconds per configured minute of freshness interval
const MILLIS_PER_MINUTE: i64 = 60_000;

/// Returns true if an entry written at `last_updated` must be refetched.
///
/// An entry is stale once `interval_minutes` have elapsed; the boundary
/// itself counts as stale. A non-positive interval means nothing is ever
/// fresh.
pub fn is_stale(last_updated: DateTime<Utc>, interval_minutes: i64, now: DateTime<Utc>) -> bool {
    if interval_minutes <= 0 {
        return true;
    }

    (now - last_updated).num_milliseconds() >= interval_minutes * MILLIS_PER_MINUTE
}
