//! Time sources.
//!
//! The resolver and the defense state only ever ask for "now" in seconds.
//! Hosts that advance time in fixed steps drive a [`ManualClock`]; hosts
//! that run in real time use [`SystemClock`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// A monotonic clock in seconds.
pub trait Clock: Send + Sync {
    /// Current time in seconds.
    fn now(&self) -> f64;
}

/// A clock that only moves when told to.
///
/// Shared behind an `Arc`, one handle can advance time while resolvers read
/// it through another.
///
/// ```
/// use riposte_core::clock::{Clock, ManualClock};
///
/// let clock = ManualClock::new(1.0);
/// clock.advance(0.25);
/// assert_eq!(clock.now(), 1.25);
/// ```
#[derive(Debug, Default)]
pub struct ManualClock {
    bits: AtomicU64,
}

impl ManualClock {
    /// Creates a clock reading `start`.
    #[must_use]
    pub fn new(start: f64) -> Self {
        Self {
            bits: AtomicU64::new(start.to_bits()),
        }
    }

    /// Jumps to `now`.
    pub fn set(&self, now: f64) {
        self.bits.store(now.to_bits(), Ordering::Release);
    }

    /// Moves forward by `delta` seconds and returns the new time.
    pub fn advance(&self, delta: f64) -> f64 {
        let mut current = self.bits.load(Ordering::Acquire);
        loop {
            let next = f64::from_bits(current) + delta;
            match self.bits.compare_exchange_weak(
                current,
                next.to_bits(),
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return next,
                Err(actual) => current = actual,
            }
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Acquire))
    }
}

/// Wall-clock time since the clock was created.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    /// Creates a clock reading zero now.
    #[must_use]
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}
