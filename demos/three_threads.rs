//! Three threads blocking for 20, 50 and 100 ticks on an STM32F407.
//!
//! Build with:
//!
//! ```text
//! cargo build --example three_threads --features demo,trace --target thumbv7em-none-eabi
//! ```
//!
//! Output goes to ITM stimulus port 0. After one second of uptime the
//! counters read roughly 50, 20 and 10.

#![no_std]
#![no_main]

use core::ptr::addr_of_mut;
use cortex_m::peripheral::syst::SystClkSource;
use cortex_m_rt::{entry, exception};
use pendsv_rtos::{
    config::{IDLE_STACK_WORDS, SYSTICK_RELOAD},
    console, kprintln, DefaultArch, Kernel, PriorityScheduler,
};
use portable_atomic::{AtomicU32, Ordering};

static KERNEL: Kernel<DefaultArch, PriorityScheduler> = Kernel::new(PriorityScheduler::new());

static mut IDLE_STACK: [u32; IDLE_STACK_WORDS] = [0; IDLE_STACK_WORDS];
static mut FAST_STACK: [u32; 256] = [0; 256];
static mut MEDIUM_STACK: [u32; 256] = [0; 256];
static mut SLOW_STACK: [u32; 256] = [0; 256];

static FAST_RUNS: AtomicU32 = AtomicU32::new(0);
static MEDIUM_RUNS: AtomicU32 = AtomicU32::new(0);
static SLOW_RUNS: AtomicU32 = AtomicU32::new(0);

fn itm_sink(s: &str) {
    // Output is best effort; the ITM is never handed out elsewhere.
    let mut peripherals = unsafe { cortex_m::Peripherals::steal() };
    cortex_m::itm::write_str(&mut peripherals.ITM.stim[0], s);
}

fn fast() -> ! {
    loop {
        FAST_RUNS.fetch_add(1, Ordering::Relaxed);
        KERNEL.block(20);
    }
}

fn medium() -> ! {
    loop {
        MEDIUM_RUNS.fetch_add(1, Ordering::Relaxed);
        KERNEL.block(50);
    }
}

fn slow() -> ! {
    loop {
        let runs = SLOW_RUNS.fetch_add(1, Ordering::Relaxed) + 1;
        kprintln!(
            "[{} ms] fast={} medium={} slow={}",
            KERNEL.uptime().ticks(),
            FAST_RUNS.load(Ordering::Relaxed),
            MEDIUM_RUNS.load(Ordering::Relaxed),
            runs
        );
        KERNEL.block(100);
    }
}

#[entry]
fn main() -> ! {
    console::set_sink(itm_sink);
    kprintln!("=== three_threads ===");

    let Some(mut core) = cortex_m::Peripherals::take() else {
        panic!("core peripherals already taken");
    };

    let started = KERNEL
        .init(unsafe { &mut *addr_of_mut!(IDLE_STACK) })
        .and_then(|()| KERNEL.start_thread(fast, unsafe { &mut *addr_of_mut!(FAST_STACK) }, 5))
        .and_then(|_| KERNEL.start_thread(medium, unsafe { &mut *addr_of_mut!(MEDIUM_STACK) }, 2))
        .and_then(|_| KERNEL.start_thread(slow, unsafe { &mut *addr_of_mut!(SLOW_STACK) }, 1));
    if let Err(e) = started {
        panic!("kernel setup failed: {}", e);
    }

    // Interrupts stay masked until `run`, so the first tick cannot race it.
    cortex_m::interrupt::disable();
    core.SYST.set_clock_source(SystClkSource::Core);
    core.SYST.set_reload(SYSTICK_RELOAD);
    core.SYST.clear_current();
    core.SYST.enable_counter();
    core.SYST.enable_interrupt();

    KERNEL.run()
}

#[exception]
fn SysTick() {
    KERNEL.tick();
}
