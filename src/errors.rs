//! Error types for kernel operations.
//!
//! The kernel has very few recoverable failures: most contract violations
//! (blocking the idle thread, overflowing a stack) are either fatal or
//! undetectable. What can be reported is reported here.

use core::fmt;

/// Result type for kernel operations.
pub type KernelResult<T> = Result<T, KernelError>;

/// Top-level kernel error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelError {
    /// Thread start errors
    Start(StartError),
    /// `init` was called a second time
    AlreadyInitialized,
    /// An operation that needs the idle thread ran before `init`
    NotInitialized,
}

/// Errors that can occur when registering a thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartError {
    /// The kernel has not installed its idle thread yet
    NotInitialized,
    /// Every registry slot is taken; the thread was not registered
    RegistryFull {
        /// Registry capacity, idle slot included
        capacity: usize,
    },
    /// The stack cannot hold the initial context frame after alignment
    StackTooSmall {
        /// Usable words left after rounding the top down to 8 bytes
        provided_words: usize,
        /// Words the initial frame needs
        required_words: usize,
    },
}

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KernelError::Start(e) => write!(f, "Thread start error: {}", e),
            KernelError::AlreadyInitialized => write!(f, "Kernel already initialized"),
            KernelError::NotInitialized => write!(f, "Kernel not initialized"),
        }
    }
}

impl fmt::Display for StartError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StartError::NotInitialized => write!(f, "Kernel not initialized, no idle thread"),
            StartError::RegistryFull { capacity } => {
                write!(f, "Thread registry full ({} slots)", capacity)
            }
            StartError::StackTooSmall {
                provided_words,
                required_words,
            } => write!(
                f,
                "Stack too small: {} usable words, initial frame needs {}",
                provided_words, required_words
            ),
        }
    }
}

impl From<StartError> for KernelError {
    fn from(error: StartError) -> Self {
        KernelError::Start(error)
    }
}
