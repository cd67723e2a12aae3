//! Pure numeric decay and recency functions. No clocks in here: callers pass
//! the reference time so tests stay deterministic.

use chrono::{DateTime, Utc};

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Signal age in fractional days relative to the reference time. Negative for
/// future timestamps.
pub(crate) fn age_days(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    (now - timestamp).num_milliseconds() as f64 / (SECONDS_PER_DAY * 1_000.0)
}

/// Continuous exponential half-life decay. Non-positive ages clamp to 1.0 so
/// a future-dated signal never amplifies.
pub(crate) fn decay_factor(age_days: f64, half_life_days: f64) -> f64 {
    if age_days <= 0.0 {
        return 1.0;
    }
    0.5_f64.powf(age_days / half_life_days)
}

/// Boost multiplier for activity inside the recency window. A signal can be
/// simultaneously boosted and decayed when the window and half-life overlap.
pub(crate) fn recency_multiplier(age_days: f64, window_days: f64, multiplier: f64) -> f64 {
    if age_days <= window_days {
        multiplier
    } else {
        1.0
    }
}
