//! Cortex-M4 (ARMv7E-M) port.
//!
//! Interrupt masking goes through PRIMASK, switches are requested by
//! setting PENDSVSET, and the switch itself is the `PendSV` handler below.
//! Threads run in thread mode on MSP; no FPU state is saved, so threads
//! must not use the FPU (build for `thumbv7em-none-eabi`).

use super::Arch;
use crate::config::{SWITCH_PRIORITY, TICK_PRIORITY};
use crate::kernel::ContextSwitch;
use core::arch::global_asm;
use cortex_m::peripheral::scb::SystemHandler;
use cortex_m::peripheral::SCB;

/// Cortex-M4 architecture implementation.
pub struct CortexM4;

impl Arch for CortexM4 {
    #[inline]
    fn disable_interrupts() {
        cortex_m::interrupt::disable();
    }

    #[inline]
    fn enable_interrupts() {
        unsafe {
            cortex_m::interrupt::enable();
        }
    }

    #[inline]
    fn interrupts_enabled() -> bool {
        cortex_m::register::primask::read().is_inactive()
    }

    #[inline]
    fn pend_context_switch() {
        // PendSV is a system exception; NVIC pending registers cannot reach it.
        SCB::set_pendsv();
    }

    fn configure_exception_priorities() {
        unsafe {
            let mut peripherals = cortex_m::Peripherals::steal();
            peripherals.SCB.set_priority(SystemHandler::SysTick, TICK_PRIORITY);
            peripherals.SCB.set_priority(SystemHandler::PendSV, SWITCH_PRIORITY);
        }
    }

    #[inline]
    fn wait_for_interrupt() {
        cortex_m::asm::wfi();
    }
}

/// Rust half of the trampoline.
///
/// Called from `PendSV` with interrupts masked and R4-R11 of the outgoing
/// thread already pushed at `saved_sp`. Returns the stack pointer to pop
/// the incoming thread's R4-R11 from.
#[no_mangle]
extern "C" fn pendsv_rtos_switch_context(saved_sp: usize) -> usize {
    match crate::kernel::switch_target() {
        Some(kernel) => unsafe { kernel.switch_context(saved_sp) },
        None => saved_sp,
    }
}

// The trampoline. EXC_RETURN is parked in r4 across the call: r4 is
// callee-saved and its thread value is already on the stack.
global_asm!(
    ".section .text.PendSV,\"ax\",%progbits",
    ".global PendSV",
    ".type PendSV,%function",
    ".thumb_func",
    "PendSV:",
    "    cpsid i",
    "    push {{r4-r11}}",
    "    mov r4, lr",
    "    mov r0, sp",
    "    bl pendsv_rtos_switch_context",
    "    mov sp, r0",
    "    mov lr, r4",
    "    pop {{r4-r11}}",
    "    cpsie i",
    "    bx lr",
    ".size PendSV, . - PendSV",
);
