//! Thread control blocks and the thread registry.

use crate::config::IDLE_SLOT;

pub mod builder;
pub mod registry;

pub use builder::ThreadBuilder;
pub use registry::{ReadyMask, Registry};

/// Thread entry point. Threads never return: there is no exit path.
pub type ThreadEntry = fn() -> !;

/// Identifies a registered thread by its registry slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ThreadId(usize);

impl core::fmt::Display for ThreadId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl ThreadId {
    /// The idle thread.
    pub const IDLE: ThreadId = ThreadId(IDLE_SLOT);

    pub(crate) const fn from_slot(slot: usize) -> Self {
        Self(slot)
    }

    /// Registry slot of this thread.
    pub fn slot(self) -> usize {
        self.0
    }

    /// Whether this is the idle thread.
    pub fn is_idle(self) -> bool {
        self.0 == IDLE_SLOT
    }
}

/// Thread control block.
///
/// `sp` is only written by the context switch while the thread is
/// switched out; while it runs, the live value is in the CPU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tcb {
    pub(crate) sp: usize,
    pub(crate) timeout: u32,
    pub(crate) priority: u8,
    pub(crate) stack_base: usize,
    pub(crate) stack_words: usize,
}

impl Tcb {
    /// An unused registry slot.
    pub const EMPTY: Tcb = Tcb {
        sp: 0,
        timeout: 0,
        priority: 0,
        stack_base: 0,
        stack_words: 0,
    };

    pub(crate) fn new(sp: usize, priority: u8, stack: &[u32]) -> Self {
        Self {
            sp,
            timeout: 0,
            priority,
            stack_base: stack.as_ptr() as usize,
            stack_words: stack.len(),
        }
    }

    /// Remaining ticks before this thread becomes ready; 0 when not waiting.
    pub fn timeout(&self) -> u32 {
        self.timeout
    }

    /// Static scheduling priority.
    pub fn priority(&self) -> u8 {
        self.priority
    }

    /// Saved stack pointer (meaningless while the thread is running).
    pub fn saved_sp(&self) -> usize {
        self.sp
    }

    /// Whether the thread is waiting on a timeout.
    pub fn is_waiting(&self) -> bool {
        self.timeout != 0
    }
}
