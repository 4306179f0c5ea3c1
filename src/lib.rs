#![no_std]
#![deny(unsafe_op_in_unsafe_fn)]
#![forbid(unreachable_pub)]

//! Minimal preemptive kernel for single-core Cortex-M4 microcontrollers.
//!
//! Threads are registered statically at boot, each with its own stack, and
//! time-sliced by a periodic tick. A thread can block itself for a number
//! of ticks; the scheduler then hands the CPU to the next ready thread, or
//! to the idle thread when nothing is ready.
//!
//! # Target Platform
//!
//! - **Architecture**: ARMv7E-M (Cortex-M4), `thumbv7em-none-eabi`
//! - **Context switch**: `PendSV` at the lowest exception priority
//! - **Tick**: any periodic interrupt calling [`Kernel::tick`] (usually SysTick)
//! - **Environment**: bare-metal, single core, no heap
//!
//! # Features
//!
//! - `trace`: Emit kernel lifecycle traces through the console sink
//! - `std-shim`: Build the simulated host port outside of tests
//! - `demo`: Build the STM32F407 demo firmware
//!
//! # Quick Start
//!
//! ```ignore
//! use pendsv_rtos::{DefaultArch, Kernel, RoundRobinScheduler};
//!
//! static KERNEL: Kernel<DefaultArch, RoundRobinScheduler> =
//!     Kernel::new(RoundRobinScheduler::new());
//!
//! static mut IDLE_STACK: [u32; 40] = [0; 40];
//! static mut BLINK_STACK: [u32; 128] = [0; 128];
//!
//! fn blink() -> ! {
//!     loop {
//!         toggle_led();
//!         KERNEL.block(500);
//!     }
//! }
//!
//! #[entry]
//! fn main() -> ! {
//!     KERNEL.init(unsafe { &mut *addr_of_mut!(IDLE_STACK) }).unwrap();
//!     KERNEL.start_thread(blink, unsafe { &mut *addr_of_mut!(BLINK_STACK) }, 1).unwrap();
//!     start_systick();
//!     KERNEL.run()
//! }
//!
//! #[exception]
//! fn SysTick() {
//!     KERNEL.tick();
//! }
//! ```

pub mod arch;
pub mod config;
pub mod console;
pub mod errors;
pub mod kernel;
pub mod sched;
pub mod thread;
pub mod time;

#[cfg(test)]
extern crate std;

#[cfg(test)]
mod tests;

// Panic handler for bare-metal
#[cfg(all(target_arch = "arm", not(test), not(feature = "std-shim")))]
#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    cortex_m::interrupt::disable();
    if console::has_sink() {
        kprintln!("[panic] {}", info);
    }
    loop {
        cortex_m::asm::wfi();
    }
}

// ============================================================================
// Public API
// ============================================================================

// Architecture abstraction
pub use arch::{Arch, DefaultArch, IrqGuard};

// Kernel
pub use kernel::{ContextSwitch, Kernel, KernelStats};

// Scheduler
pub use sched::{priority, PriorityScheduler, RoundRobinScheduler, Scheduler};

// Threads
pub use thread::{ReadyMask, ThreadBuilder, ThreadEntry, ThreadId};

// Time
pub use time::{Duration, Instant};

// Errors
pub use errors::{KernelError, KernelResult, StartError};
