//! Tier tables: monotonic step functions from progress to rank.
//!
//! A table maps a continuous progress value (experience, reputation, ...) to a
//! discrete tier. Tiers start at 1. Reaching tier `n` takes
//! `threshold * n * (n - 1) / 2` progress, so each tier costs `threshold`
//! more than the previous one.

use serde::{Deserialize, Serialize};

/// A tier table.
///
/// # Example
///
/// ```
/// use tally::Table;
///
/// let table = Table::new(10, 100.0);
/// assert_eq!(table.tier(0.0), 1);
/// assert_eq!(table.tier(100.0), 2);
/// assert_eq!(table.tier(299.0), 2);
/// assert_eq!(table.tier(300.0), 3);
/// assert!((table.percent_next_tier(200.0) - 0.5).abs() < 1e-9);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Table {
    /// Highest reachable tier (at least 1).
    pub max_tier: u32,
    /// Progress cost of the step from tier 1 to tier 2.
    pub threshold: f64,
}

impl Table {
    /// Creates a table.
    #[must_use]
    pub fn new(max_tier: u32, threshold: f64) -> Self {
        Self {
            max_tier,
            threshold,
        }
    }

    /// Tier reached at `progress`.
    #[must_use]
    pub fn tier(&self, progress: f64) -> u32 {
        tier(progress, self.max_tier, self.threshold)
    }

    /// Progress at which `tier` starts.
    #[must_use]
    pub fn progress(&self, tier: u32) -> f64 {
        progress(tier, self.threshold)
    }

    /// How far `progress` is from the current tier to the next, in `[0, 1]`.
    ///
    /// Returns `1` once the maximum tier is reached.
    #[must_use]
    pub fn percent_next_tier(&self, progress: f64) -> f64 {
        let current = self.tier(progress);
        if current >= self.max_tier.max(1) {
            return 1.0;
        }
        let floor = self.progress(current);
        let ceil = self.progress(current + 1);
        if ceil <= floor {
            return 1.0;
        }
        ((progress - floor) / (ceil - floor)).clamp(0.0, 1.0)
    }
}

impl Default for Table {
    fn default() -> Self {
        Self::new(99, 100.0)
    }
}

/// Progress at which `tier` starts for a given threshold.
///
/// Tier 0 and tier 1 both start at zero progress.
#[must_use]
pub fn progress(tier: u32, threshold: f64) -> f64 {
    let n = f64::from(tier);
    if tier <= 1 {
        0.0
    } else {
        threshold * n * (n - 1.0) / 2.0
    }
}

/// Highest tier `n <= max_tier` with `progress(n, threshold) <= p`.
///
/// Non-positive progress, a non-positive threshold, or NaN progress all map
/// to tier 1. The closed-form estimate is corrected against [`progress`] so
/// that `progress(tier(p)) <= p` holds exactly.
#[must_use]
pub fn tier(p: f64, max_tier: u32, threshold: f64) -> u32 {
    let max_tier = max_tier.max(1);
    if p.is_nan() || p <= 0.0 || threshold <= 0.0 {
        return 1;
    }

    // Solve n(n-1)/2 = p/threshold for n.
    let estimate = (1.0 + (1.0 + 8.0 * p / threshold).sqrt()) / 2.0;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let mut n = if estimate >= f64::from(max_tier) {
        max_tier
    } else {
        (estimate.floor() as u32).max(1)
    };

    while n > 1 && progress(n, threshold) > p {
        n -= 1;
    }
    while n < max_tier && progress(n + 1, threshold) <= p {
        n += 1;
    }
    n
}
