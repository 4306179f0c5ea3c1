//! Tick counting.

use super::Instant;
use portable_atomic::{AtomicU64, Ordering};

/// Global tick counter for system uptime.
///
/// Incremented once per timer period from the tick handler and readable
/// from anywhere without a critical section.
pub struct TickCounter {
    /// Number of ticks since system start
    ticks: AtomicU64,
}

impl Default for TickCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl TickCounter {
    /// Create a counter at zero.
    pub const fn new() -> Self {
        Self {
            ticks: AtomicU64::new(0),
        }
    }

    /// Increment the tick counter (called from the tick handler).
    pub fn increment(&self) -> u64 {
        self.ticks.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Get the current tick count.
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Acquire)
    }

    /// Get current time as an instant.
    pub fn now(&self) -> Instant {
        Instant::from_ticks(self.ticks())
    }
}
