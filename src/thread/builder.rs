use super::{ThreadEntry, ThreadId};
use crate::arch::Arch;
use crate::errors::{KernelResult, StartError};
use crate::kernel::Kernel;
use crate::sched::{priority, Scheduler};

/// Collects the parameters of a static thread before starting it.
///
/// ```ignore
/// static mut STACK: [u32; 128] = [0; 128];
///
/// let id = ThreadBuilder::new(blinky)
///     .priority(5)
///     .stack(unsafe { &mut *core::ptr::addr_of_mut!(STACK) })
///     .start(&KERNEL)?;
/// ```
pub struct ThreadBuilder {
    entry: ThreadEntry,
    stack: Option<&'static mut [u32]>,
    priority: u8,
}

impl ThreadBuilder {
    pub fn new(entry: ThreadEntry) -> Self {
        Self {
            entry,
            stack: None,
            priority: priority::NORMAL,
        }
    }

    pub fn stack(mut self, stack: &'static mut [u32]) -> Self {
        self.stack = Some(stack);
        self
    }

    pub fn priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    /// Register the thread with `kernel`.
    pub fn start<A: Arch, S: Scheduler>(self, kernel: &Kernel<A, S>) -> KernelResult<ThreadId> {
        let stack = self.stack.ok_or(StartError::StackTooSmall {
            provided_words: 0,
            required_words: crate::arch::frame::INITIAL_FRAME_WORDS,
        })?;
        kernel.start_thread(self.entry, stack, self.priority)
    }
}
