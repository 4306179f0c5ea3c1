//! Compile-time kernel configuration.
//!
//! Everything here is a constant: the kernel never allocates, so table
//! sizes and timer settings are fixed when the firmware is built.

/// Maximum number of registry slots, idle thread included (1 idle + 32 user).
pub const MAX_THREADS: usize = 33;

/// Registry slot reserved for the idle thread.
pub const IDLE_SLOT: usize = 0;

/// Core clock feeding SysTick after reset (STM32F407 HSI).
pub const SYSTEM_CLOCK_HZ: u32 = 16_000_000;

/// Scheduler tick rate. One tick is the timeout resolution.
pub const TICK_HZ: u32 = 1_000;

/// SysTick reload value for one tick period.
pub const SYSTICK_RELOAD: u32 = SYSTEM_CLOCK_HZ / TICK_HZ - 1;

/// Words of stack the kernel-supplied idle thread needs.
///
/// Threads run on MSP, so the tick handler and the switch routine borrow
/// the stack of whichever thread they interrupt. For idle that is the
/// initial frame, the stacked exception frame, the unoptimized call chain
/// of `Kernel::tick` down to `pick_next`, and after tail-chaining another
/// exception frame plus the `switch_context` chain.
pub const IDLE_STACK_WORDS: usize = 256;

/// Exception priority for the tick interrupt (lower value = more urgent).
pub const TICK_PRIORITY: u8 = 0x00;

/// Exception priority for the context-switch exception. Must be the
/// lowest so that switches only ever tail-chain after all other handlers.
pub const SWITCH_PRIORITY: u8 = 0xFF;

// Every non-idle slot needs its own bit in the ready mask.
const _: () = assert!(MAX_THREADS - 1 <= u32::BITS as usize);
const _: () = assert!(MAX_THREADS >= 1);

// Idle must hold its initial frame plus the handler chains that run on it.
const _: () = assert!(IDLE_STACK_WORDS >= 128);
