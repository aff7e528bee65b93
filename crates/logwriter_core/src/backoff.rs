//! Randomized sleep between lock attempts.

use rand::Rng;
use std::thread;
use std::time::Duration;

/// A uniformly random delay range.
///
/// Jitter keeps waiters from retrying in lockstep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    /// Shortest delay.
    pub min: Duration,
    /// Longest delay.
    pub max: Duration,
}

impl Backoff {
    /// Creates a backoff between `min` and `max` inclusive.
    #[must_use]
    pub const fn new(min: Duration, max: Duration) -> Self {
        Self { min, max }
    }

    /// Creates a backoff from millisecond bounds.
    #[must_use]
    pub const fn from_millis(min: u64, max: u64) -> Self {
        Self::new(Duration::from_millis(min), Duration::from_millis(max))
    }

    /// Picks the next delay.
    #[must_use]
    pub fn delay(&self) -> Duration {
        if self.max <= self.min {
            return self.min;
        }
        rand::thread_rng().gen_range(self.min..=self.max)
    }

    /// Sleeps for a freshly picked delay.
    pub fn sleep(&self) {
        thread::sleep(self.delay());
    }
}
