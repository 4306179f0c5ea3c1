//! Tick-based time keeping and thread timeouts.
//!
//! The only clock the kernel has is the periodic tick, so every duration
//! is ultimately a tick count and one tick is the finest resolution.

pub mod tick;
pub mod timeout;

pub use crate::config::TICK_HZ;
pub use tick::TickCounter;

/// Nanoseconds per tick at [`TICK_HZ`].
pub const NANOS_PER_TICK: u64 = 1_000_000_000 / TICK_HZ as u64;

/// Ticks since the kernel started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Instant(u64);

impl Instant {
    /// Create an instant from a tick count.
    pub const fn from_ticks(ticks: u64) -> Self {
        Self(ticks)
    }

    /// Tick count of this instant.
    pub fn ticks(self) -> u64 {
        self.0
    }

    /// Nanoseconds since start, saturating at `u64::MAX`.
    pub fn as_nanos(self) -> u64 {
        self.0.saturating_mul(NANOS_PER_TICK)
    }

    /// Duration since another instant, saturating at zero.
    pub fn duration_since(self, earlier: Instant) -> Duration {
        Duration::from_nanos(self.0.saturating_sub(earlier.0).saturating_mul(NANOS_PER_TICK))
    }
}

impl core::ops::Add<Duration> for Instant {
    type Output = Self;

    fn add(self, duration: Duration) -> Self {
        Self(self.0.saturating_add(duration.as_ticks() as u64))
    }
}

/// A duration of time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Duration(u64);

impl Duration {
    /// Create a duration from nanoseconds.
    pub const fn from_nanos(nanos: u64) -> Self {
        Self(nanos)
    }

    /// Create a duration from microseconds, saturating at `u64::MAX` nanoseconds.
    pub const fn from_micros(micros: u64) -> Self {
        Self(micros.saturating_mul(1_000))
    }

    /// Create a duration from milliseconds, saturating at `u64::MAX` nanoseconds.
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis.saturating_mul(1_000_000))
    }

    /// Create a duration of whole ticks.
    pub const fn from_ticks(ticks: u32) -> Self {
        Self(ticks as u64 * NANOS_PER_TICK)
    }

    /// Get nanoseconds in this duration.
    pub fn as_nanos(self) -> u64 {
        self.0
    }

    /// Get milliseconds in this duration.
    pub fn as_millis(self) -> u64 {
        self.0 / 1_000_000
    }

    /// Ticks covering this duration, rounded up so a wait is never shorter
    /// than asked for. Saturates at `u32::MAX`.
    pub fn as_ticks(self) -> u32 {
        let ticks = self.0 / NANOS_PER_TICK + u64::from(self.0 % NANOS_PER_TICK != 0);
        u32::try_from(ticks).unwrap_or(u32::MAX)
    }
}
