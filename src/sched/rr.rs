//! Positional round-robin scheduler.

use super::trait_def::Scheduler;
use crate::config::IDLE_SLOT;
use crate::thread::Registry;

/// Round-robin over registry slots.
///
/// Starting after the last selected slot, walk the non-idle slots with
/// wraparound and take the first ready one. Fairness is purely positional:
/// priorities are ignored.
pub struct RoundRobinScheduler {
    cursor: usize,
}

impl RoundRobinScheduler {
    pub const fn new() -> Self {
        Self { cursor: IDLE_SLOT }
    }
}

impl Default for RoundRobinScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for RoundRobinScheduler {
    fn pick_next(&mut self, registry: &Registry) -> usize {
        let ready = registry.ready_mask();
        if ready.is_empty() {
            self.cursor = IDLE_SLOT;
            return IDLE_SLOT;
        }

        // A non-empty mask guarantees a ready slot in 1..len, so this ends
        // within one lap.
        let count = registry.len();
        loop {
            self.cursor += 1;
            if self.cursor >= count {
                self.cursor = IDLE_SLOT + 1;
            }
            if ready.contains(self.cursor) {
                return self.cursor;
            }
        }
    }

    fn cursor(&self) -> usize {
        self.cursor
    }

    fn name(&self) -> &'static str {
        "round-robin"
    }
}
