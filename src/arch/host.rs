//! Simulated single-core port for non-ARM hosts.
//!
//! There is no real context switch here: the PendSV pending bit and the
//! PRIMASK state are plain flags that tests drive and inspect. Under
//! `cfg(test)` the flags are per test thread so parallel tests cannot
//! observe each other.

use super::Arch;


#[cfg(not(test))]
mod state {
    use portable_atomic::{AtomicBool, AtomicU64, Ordering};

    static MASKED: AtomicBool = AtomicBool::new(false);
    static PENDING: AtomicBool = AtomicBool::new(false);
    static PEND_REQUESTS: AtomicU64 = AtomicU64::new(0);

    pub(super) fn set_masked(masked: bool) {
        MASKED.store(masked, Ordering::Release);
    }

    pub(super) fn masked() -> bool {
        MASKED.load(Ordering::Acquire)
    }

    pub(super) fn pend() {
        PENDING.store(true, Ordering::Release);
        PEND_REQUESTS.fetch_add(1, Ordering::Relaxed);
    }

    pub(super) fn take_pending() -> bool {
        PENDING.swap(false, Ordering::AcqRel)
    }

    pub(super) fn pend_requests() -> u64 {
        PEND_REQUESTS.load(Ordering::Relaxed)
    }
}

/// Host architecture (simulation only).
pub struct HostArch;

impl HostArch {
    /// Consume the simulated PendSV pending bit.
    ///
    /// Returns `true` if a switch was armed since the last call. The caller
    /// is expected to play the part of the trampoline.
    pub fn take_pending_switch() -> bool {
        state::take_pending()
    }

    /// Total number of times a switch was armed.
    pub fn pend_requests() -> u64 {
        state::pend_requests()
    }
}

impl Arch for HostArch {
    fn disable_interrupts() {
        state::set_masked(true);
    }

    fn enable_interrupts() {
        state::set_masked(false);
    }

    fn interrupts_enabled() -> bool {
        !state::masked()
    }

    fn pend_context_switch() {
        state::pend();
    }

    fn configure_exception_priorities() {
        // Nothing to configure
    }

    fn wait_for_interrupt() {
        core::hint::spin_loop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_bit_is_consumed() {
        assert!(!HostArch::take_pending_switch());
        let before = HostArch::pend_requests();

        HostArch::pend_context_switch();
        HostArch::pend_context_switch();

        assert!(HostArch::take_pending_switch());
        assert!(!HostArch::take_pending_switch());
        assert_eq!(HostArch::pend_requests() - before, 2);
    }
}
