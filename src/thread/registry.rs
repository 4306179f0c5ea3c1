//! Fixed-capacity thread registry and ready mask.
//!
//! Slot 0 always holds the idle thread. The ready mask has one bit per
//! non-idle slot: bit `i - 1` is set iff slot `i` may be scheduled, which
//! in turn holds iff its timeout is 0. The idle thread has no bit; it is
//! what the scheduler falls back to when the mask is empty.

use super::Tcb;
use crate::config::{IDLE_SLOT, MAX_THREADS};
use crate::errors::StartError;
use core::ops::Range;

/// Bitmask of ready, non-idle threads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReadyMask(u32);

impl ReadyMask {
    /// No thread ready.
    pub const EMPTY: ReadyMask = ReadyMask(0);

    #[inline]
    fn bit(slot: usize) -> u32 {
        debug_assert!(slot != IDLE_SLOT && slot < MAX_THREADS);
        1 << (slot - 1)
    }

    /// Mark `slot` ready.
    #[inline]
    pub fn insert(&mut self, slot: usize) {
        self.0 |= Self::bit(slot);
    }

    /// Mark `slot` not ready.
    #[inline]
    pub fn remove(&mut self, slot: usize) {
        self.0 &= !Self::bit(slot);
    }

    /// Whether `slot` is ready. The idle slot is never in the mask.
    #[inline]
    pub fn contains(&self, slot: usize) -> bool {
        slot != IDLE_SLOT && slot < MAX_THREADS && self.0 & Self::bit(slot) != 0
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Number of ready threads.
    #[inline]
    pub fn count(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Raw bits (bit `i - 1` for slot `i`).
    #[inline]
    pub fn bits(&self) -> u32 {
        self.0
    }
}

/// Arena of thread control blocks.
pub struct Registry {
    tcbs: [Tcb; MAX_THREADS],
    count: usize,
    ready: ReadyMask,
}

impl Registry {
    pub const fn new() -> Self {
        Self {
            tcbs: [Tcb::EMPTY; MAX_THREADS],
            count: 0,
            ready: ReadyMask::EMPTY,
        }
    }

    /// Add `tcb` at the next free slot and return the slot.
    ///
    /// The first registration is the idle thread and is never marked
    /// ready; every later one is ready immediately.
    pub fn register(&mut self, tcb: Tcb) -> Result<usize, StartError> {
        if self.is_full() {
            return Err(StartError::RegistryFull {
                capacity: MAX_THREADS,
            });
        }

        let slot = self.count;
        self.tcbs[slot] = tcb;
        self.count += 1;
        if slot != IDLE_SLOT {
            self.ready.insert(slot);
        }
        Ok(slot)
    }

    /// Number of registered threads, idle included.
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn is_full(&self) -> bool {
        self.count >= MAX_THREADS
    }

    /// Slots of registered non-idle threads.
    pub fn user_slots(&self) -> Range<usize> {
        (IDLE_SLOT + 1)..self.count.max(IDLE_SLOT + 1)
    }

    pub fn get(&self, slot: usize) -> Option<&Tcb> {
        self.tcbs[..self.count].get(slot)
    }

    pub fn get_mut(&mut self, slot: usize) -> Option<&mut Tcb> {
        self.tcbs[..self.count].get_mut(slot)
    }

    pub fn ready_mask(&self) -> ReadyMask {
        self.ready
    }

    pub fn is_ready(&self, slot: usize) -> bool {
        self.ready.contains(slot)
    }

    pub(crate) fn mark_ready(&mut self, slot: usize) {
        self.ready.insert(slot);
    }

    pub(crate) fn mark_blocked(&mut self, slot: usize) {
        self.ready.remove(slot);
    }

    /// Priority of `slot`, 0 for unregistered slots.
    pub fn priority(&self, slot: usize) -> u8 {
        self.get(slot).map_or(0, |tcb| tcb.priority)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
