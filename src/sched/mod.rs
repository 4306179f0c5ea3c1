//! Thread scheduler implementations.
//!
//! Both schedulers are pure decision logic over the registry and its ready
//! mask; arming the switch is left to the kernel.

pub mod priority_rr;
pub mod rr;
pub mod trait_def;

pub use priority_rr::PriorityScheduler;
pub use rr::RoundRobinScheduler;
pub use trait_def::{priority, Scheduler};
