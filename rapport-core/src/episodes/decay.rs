//! Logarithmic forgetting curve for episodes.
//!
//! Retention is modelled as:
//!   D = 1 / (1 + k · ln(t + 1))
//!
//! Where:
//!   D = temporal decay factor (1.0 = fresh, → 0 as t → ∞ but never 0)
//!   t = days since the episode
//!   k = decay rate (default 0.1)
//!
//! Compared with an exponential curve this keeps old, important moments
//! rankable for a long time: after a year at k = 0.1 an episode still keeps
//! about 63% of its weight.

use super::Episode;
use crate::types::Timestamp;

/// Default coefficient `k`.
pub const DEFAULT_DECAY_RATE: f64 = 0.1;

/// Decay factor after `days_passed` days at `rate`.
///
/// Negative or non-finite inputs are treated as zero, so the result is
/// always in `(0, 1]`.
#[must_use]
pub fn temporal_decay(days_passed: f64, rate: f64) -> f64 {
    let days = if days_passed.is_finite() { days_passed.max(0.0) } else { 0.0 };
    let rate = if rate.is_finite() { rate.max(0.0) } else { 0.0 };
    let decay = 1.0 / (1.0 + rate * (days + 1.0).ln());
    // Keep the factor representable as non-zero for absurd ages.
    decay.max(f64::MIN_POSITIVE)
}

/// Refresh the decay factor of every episode against `now`.
pub fn decay_pass(episodes: &mut [Episode], now: Timestamp, rate: f64) {
    for episode in episodes {
        episode.decay_from(now, rate);
    }
}
