//! TriCore port layer for a preemptive multitasking kernel.
//!
//! On TriCore the call stack is not a contiguous region but a chain of
//! 16-word Context Save Areas (CSAs) drawn from a per-core free list whose
//! head lives in the `FCX` register. This crate implements the part of the
//! kernel that has to know about that:
//!
//! - building the initial two-CSA context of a new task ([`task::context`]),
//! - the switch protocol entered from a yield trap or an interrupt return
//!   ([`task::switch`]),
//! - the per-core tick interrupt ([`task::timers`]),
//! - deferred reclamation of a dead task's whole CSA chain
//!   ([`task::reclaim`]),
//! - interrupt-mask critical sections ([`hal::irq`]).
//!
//! Ready-queue policy and tick accounting belong to the generic kernel and
//! are consumed through [`task::TaskScheduler`].

#![cfg_attr(not(any(test, feature = "sim")), no_std)]

#[macro_use]
extern crate log;

extern crate alloc;

pub mod config;
pub mod console;
pub mod drivers;
pub mod error;
pub mod hal;
pub mod platform;
pub mod task;

#[cfg(test)]
mod tests;

pub use error::{PortError, PortResult};
pub use hal::percpu::{CoreId, CpuTable, PerCpu};
pub use task::{ChainHandle, TaskControlBlock, TaskRef, TaskScheduler, TaskState};
