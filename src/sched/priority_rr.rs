//! Priority scheduler with round-robin among equals.

use super::trait_def::Scheduler;
use crate::config::{IDLE_SLOT, MAX_THREADS};
use crate::thread::Registry;

/// Highest-priority-ready-first scheduler.
///
/// Among ready threads of the same (highest) priority, the one picked
/// least recently wins, so equals take turns no matter how often a
/// higher-priority thread cuts in between them. Slots never picked before
/// are taken in round-robin order after the last selected slot. The
/// empty-mask fallback to idle is unchanged.
pub struct PriorityScheduler {
    cursor: usize,
    /// Pick sequence number of each slot's most recent selection
    last_picked: [u64; MAX_THREADS],
    picks: u64,
}

impl PriorityScheduler {
    pub const fn new() -> Self {
        Self {
            cursor: IDLE_SLOT,
            last_picked: [0; MAX_THREADS],
            picks: 0,
        }
    }
}

impl Default for PriorityScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for PriorityScheduler {
    fn pick_next(&mut self, registry: &Registry) -> usize {
        let ready = registry.ready_mask();
        if ready.is_empty() {
            self.cursor = IDLE_SLOT;
            return IDLE_SLOT;
        }

        let count = registry.len();
        let users = count - 1;
        let mut best: Option<(usize, u8, u64)> = None;

        // Visit every user slot once, in round-robin order after the cursor.
        // Strict comparisons keep the first slot met among exact ties.
        let mut slot = self.cursor;
        for _ in 0..users {
            slot += 1;
            if slot >= count {
                slot = IDLE_SLOT + 1;
            }
            if !ready.contains(slot) {
                continue;
            }
            let priority = registry.priority(slot);
            let last = self.last_picked[slot];
            let better = match best {
                None => true,
                Some((_, best_priority, best_last)) => {
                    priority > best_priority || (priority == best_priority && last < best_last)
                }
            };
            if better {
                best = Some((slot, priority, last));
            }
        }

        // The mask was non-empty, so `best` is set; idle is the safe fallback.
        let Some((winner, _, _)) = best else {
            self.cursor = IDLE_SLOT;
            return IDLE_SLOT;
        };
        self.picks += 1;
        self.last_picked[winner] = self.picks;
        self.cursor = winner;
        winner
    }

    fn cursor(&self) -> usize {
        self.cursor
    }

    fn name(&self) -> &'static str {
        "priority"
    }
}
