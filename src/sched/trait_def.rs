//! Scheduler trait definition.

use crate::thread::Registry;

/// Scheduling policy.
///
/// Implementations choose which registry slot runs next. They must return
/// the idle slot when the ready mask is empty and a ready slot otherwise.
pub trait Scheduler: Send {
    /// Pick the slot to run next.
    ///
    /// Called with interrupts masked, from thread context (`block`) or from
    /// the tick handler.
    ///
    /// # Arguments
    ///
    /// * `registry` - Registered threads and their ready mask
    ///
    /// # Returns
    ///
    /// The selected registry slot.
    fn pick_next(&mut self, registry: &Registry) -> usize;

    /// Slot selected by the last decision.
    fn cursor(&self) -> usize;

    /// Short policy name for diagnostics.
    fn name(&self) -> &'static str;
}

/// Priority levels for threads.
///
/// These are convenience constants for common priority levels.
pub mod priority {
    /// Idle priority - only runs when nothing else is ready
    pub const IDLE: u8 = 0;

    /// Normal priority - default for most threads
    pub const NORMAL: u8 = 128;
}
