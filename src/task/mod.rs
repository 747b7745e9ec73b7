//! Task management on TriCore.
//!
//! This module provides:
//! - Task control blocks and context-chain handles
//! - Building the initial context of a task
//! - The switch protocol behind yields and interrupt returns
//! - The per-core kernel tick
//! - Deferred reclamation of deleted tasks' CSA chains
//! - Static storage for kernel-created tasks

pub mod context;
pub mod reclaim;
pub mod scheduler;
pub mod static_mem;
pub mod switch;
mod task;
pub mod timers;

#[cfg(test)]
mod tests;

pub use scheduler::{FifoScheduler, TaskScheduler};
pub use static_mem::{StaticMemoryProvider, StaticStacks, TaskMemory};
pub use task::{ChainHandle, TaskControlBlock, TaskId, TaskRef, TaskState};

/// Parks the core for good.
pub fn loop_forever() -> ! {
    error!("core parked");
    loop {
        core::hint::spin_loop();
    }
}

/// Called by the kernel heap when an allocation fails. There is no way to
/// continue without the memory, so the core is parked.
pub fn malloc_failed_hook() -> ! {
    error!("heap allocation failed");
    loop_forever()
}
