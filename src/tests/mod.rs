//! Host-side kernel tests.
//!
//! These drive a [`Kernel`](crate::Kernel) on the simulated port: the test
//! plays the trampoline whenever a switch is pending, and thread bodies are
//! stood in for by the test acting on behalf of the current thread.

pub(crate) mod helpers;
