//! Architecture abstraction layer for interrupt masking and context switching.
//!
//! The kernel core is written against the [`Arch`] trait so the scheduling
//! and blocking logic can run unchanged on the target and on a simulated
//! host port. The only code that touches raw registers is the ARM port's
//! `PendSV` trampoline.

use core::marker::PhantomData;

pub mod frame;

/// Architecture abstraction trait.
///
/// All methods are associated functions: there is exactly one CPU and its
/// interrupt state is global.
pub trait Arch {
    /// Disable interrupts on the current CPU.
    fn disable_interrupts();

    /// Enable interrupts on the current CPU.
    fn enable_interrupts();

    /// Check if interrupts are currently enabled.
    fn interrupts_enabled() -> bool;

    /// Arm the deferred context-switch exception.
    ///
    /// The switch happens once every other pending handler has finished and
    /// interrupts are unmasked.
    fn pend_context_switch();

    /// Give the tick interrupt the highest and the switch exception the
    /// lowest priority.
    fn configure_exception_priorities();

    /// Sleep until the next interrupt.
    fn wait_for_interrupt();
}

/// Scoped critical section.
///
/// Masks interrupts for its lifetime and restores the previous mask state
/// on drop, so it nests correctly inside handlers that already run masked.
pub struct IrqGuard<A: Arch> {
    was_enabled: bool,
    _arch: PhantomData<A>,
}

impl<A: Arch> IrqGuard<A> {
    /// Enter a critical section.
    pub fn new() -> Self {
        let was_enabled = A::interrupts_enabled();
        A::disable_interrupts();
        Self {
            was_enabled,
            _arch: PhantomData,
        }
    }
}

impl<A: Arch> Default for IrqGuard<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: Arch> Drop for IrqGuard<A> {
    fn drop(&mut self) {
        if self.was_enabled {
            A::enable_interrupts();
        }
    }
}

/// Run `f` with interrupts masked.
#[inline]
pub fn critical_section<A: Arch, R>(f: impl FnOnce() -> R) -> R {
    let _guard = IrqGuard::<A>::new();
    f()
}

// Cortex-M4 port
#[cfg(target_arch = "arm")]
pub mod cortex_m4;

// Simulated port for host builds and tests
#[cfg(not(target_arch = "arm"))]
pub mod host;

#[cfg(target_arch = "arm")]
pub use cortex_m4::CortexM4 as DefaultArch;

#[cfg(not(target_arch = "arm"))]
pub use host::HostArch as DefaultArch;

// Compile error for unsupported configurations
#[cfg(all(not(target_arch = "arm"), not(test), not(feature = "std-shim")))]
compile_error!("This kernel targets Cortex-M4 (thumbv7em-none-eabi). Enable the std-shim feature to build the simulated host port.");

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::host::HostArch;

    #[test]
    fn test_guard_masks_and_restores() {
        assert!(HostArch::interrupts_enabled());
        {
            let _guard = IrqGuard::<HostArch>::new();
            assert!(!HostArch::interrupts_enabled());
        }
        assert!(HostArch::interrupts_enabled());
    }

    #[test]
    fn test_nested_guard_keeps_outer_mask() {
        let outer = IrqGuard::<HostArch>::new();
        {
            let _inner = IrqGuard::<HostArch>::new();
        }
        // Inner drop must not unmask while the outer section is live
        assert!(!HostArch::interrupts_enabled());
        drop(outer);
        assert!(HostArch::interrupts_enabled());
    }

    #[test]
    fn test_critical_section_returns_value() {
        let value = critical_section::<HostArch, _>(|| {
            assert!(!HostArch::interrupts_enabled());
            7
        });
        assert_eq!(value, 7);
        assert!(HostArch::interrupts_enabled());
    }
}
