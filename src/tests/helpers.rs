//! Test helper utilities and common functionality.

use crate::arch::frame::WORD_BYTES;
use crate::arch::host::HostArch;
use crate::kernel::{ContextSwitch, Kernel};
use crate::sched::Scheduler;
use crate::thread::{Tcb, ThreadId};
use std::boxed::Box;
use std::vec;

/// Zeroed stack memory that lives for the rest of the test binary.
pub(crate) fn leak_stack(words: usize) -> &'static mut [u32] {
    Box::leak(vec![0u32; words].into_boxed_slice())
}

/// Thread body for threads that are never actually executed.
pub(crate) fn park() -> ! {
    loop {
        core::hint::spin_loop();
    }
}

fn current_saved_sp<S: Scheduler>(kernel: &Kernel<HostArch, S>) -> usize {
    kernel.with_state(|state| {
        state
            .current()
            .and_then(|slot| state.registry().get(slot))
            .map_or(0, Tcb::saved_sp)
    })
}

/// Take every pending switch, without touching any stack memory.
///
/// The outgoing thread's saved stack pointer is handed back unchanged.
/// Returns the number of switches taken.
pub(crate) fn service_switches<S: Scheduler>(kernel: &Kernel<HostArch, S>) -> usize {
    let mut taken = 0;
    while HostArch::take_pending_switch() {
        let sp = current_saved_sp(kernel);
        unsafe { kernel.switch_context(sp) };
        taken += 1;
    }
    taken
}

/// Service pending switches and let the current thread act until only the
/// idle thread is left running.
///
/// `body` stands in for a thread between being switched in and blocking
/// again; it must leave the thread blocked, or the drain never ends.
pub(crate) fn drain<S: Scheduler>(kernel: &Kernel<HostArch, S>, mut body: impl FnMut(ThreadId)) {
    loop {
        service_switches(kernel);
        match kernel.current_thread() {
            Some(id) if !id.is_idle() => body(id),
            _ => break,
        }
    }
}

/// A register-level model of the CPU side of a context switch.
///
/// `pendsv` does what the exception entry, the `PendSV` trampoline and the
/// exception return do together: stack R0-R3, R12, LR, PC and xPSR, push
/// R4-R11, let the kernel swap stack pointers, then unstack in reverse.
/// Stacks are real memory, so frames built by the kernel are read back
/// word for word.
pub(crate) struct SimCpu {
    /// R0-R12
    pub(crate) regs: [u32; 13],
    pub(crate) lr: u32,
    pub(crate) pc: u32,
    pub(crate) xpsr: u32,
    pub(crate) sp: usize,
}

impl SimCpu {
    /// A CPU running on `boot_stack`, the way reset leaves it.
    pub(crate) fn new(boot_stack: &'static mut [u32]) -> Self {
        let top = boot_stack.as_ptr() as usize + boot_stack.len() * WORD_BYTES;
        Self {
            regs: [0; 13],
            lr: 0,
            pc: 0,
            xpsr: 0,
            sp: top,
        }
    }

    /// Load a recognizable value into every general purpose register.
    pub(crate) fn fingerprint(&mut self, seed: u32) {
        for (i, reg) in self.regs.iter_mut().enumerate() {
            *reg = seed.wrapping_add(i as u32);
        }
        self.lr = seed ^ 0x00ff_00ff;
    }

    unsafe fn push(&mut self, word: u32) {
        self.sp -= WORD_BYTES;
        unsafe { (self.sp as *mut u32).write(word) };
    }

    unsafe fn pop(&mut self) -> u32 {
        let word = unsafe { (self.sp as *const u32).read() };
        self.sp += WORD_BYTES;
        word
    }

    /// Take the pending switch, if any. Returns whether one was taken.
    pub(crate) fn pendsv<S: Scheduler>(&mut self, kernel: &Kernel<HostArch, S>) -> bool {
        if !HostArch::take_pending_switch() {
            return false;
        }

        unsafe {
            // Exception entry
            self.push(self.xpsr);
            self.push(self.pc);
            self.push(self.lr);
            self.push(self.regs[12]);
            for r in (0..4).rev() {
                self.push(self.regs[r]);
            }
            // push {r4-r11}
            for r in (4..12).rev() {
                self.push(self.regs[r]);
            }

            self.sp = kernel.switch_context(self.sp);

            // pop {r4-r11}
            for r in 4..12 {
                self.regs[r] = self.pop();
            }
            // Exception return
            for r in 0..4 {
                self.regs[r] = self.pop();
            }
            self.regs[12] = self.pop();
            self.lr = self.pop();
            self.pc = self.pop();
            self.xpsr = self.pop();
        }
        true
    }

    /// Take switches until none is pending.
    pub(crate) fn service<S: Scheduler>(&mut self, kernel: &Kernel<HostArch, S>) -> usize {
        let mut taken = 0;
        while self.pendsv(kernel) {
            taken += 1;
        }
        taken
    }
}
