//! Thread timeouts.
//!
//! A thread waits by having a non-zero timeout and no ready bit. Every
//! tick counts all waiting timeouts down by one; a timeout that reaches
//! zero sets its thread's ready bit again. These functions only maintain
//! the registry: the caller holds the critical section and runs the
//! scheduler afterwards.

use crate::thread::Registry;

/// Make `slot` wait for `ticks` ticks.
///
/// A zero-tick wait leaves the thread ready, so it amounts to a yield.
pub fn arm(registry: &mut Registry, slot: usize, ticks: u32) {
    let Some(tcb) = registry.get_mut(slot) else {
        return;
    };
    tcb.timeout = ticks;
    if ticks != 0 {
        registry.mark_blocked(slot);
    }
}

/// Advance every waiting timeout by one tick.
///
/// Returns how many threads became ready.
pub fn permit_tick(registry: &mut Registry) -> usize {
    let mut woken = 0;
    for slot in registry.user_slots() {
        let Some(tcb) = registry.get_mut(slot) else {
            continue;
        };
        if tcb.timeout == 0 {
            continue;
        }
        tcb.timeout -= 1;
        if tcb.timeout == 0 {
            registry.mark_ready(slot);
            woken += 1;
        }
    }
    woken
}
