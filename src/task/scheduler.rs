//! The seam between the port and the kernel's scheduling policy.

pub mod fifo_scheduler;

pub use fifo_scheduler::FifoScheduler;

use crate::hal::percpu::CoreId;

use super::TaskRef;

/// Scheduling policy as seen from the port.
///
/// Both methods are called with kernel interrupts masked on `core`.
pub trait TaskScheduler {
    /// Picks the task to run next on `core`. `current` has just been
    /// switched out: its state is already `Ready` unless it blocked or was
    /// deleted. Returning `current` keeps it running.
    fn select_next_task(&mut self, core: CoreId, current: &TaskRef) -> TaskRef;

    /// Advances the kernel tick of `core`. Returns whether a switch is due.
    fn increment_tick(&mut self, core: CoreId) -> bool;
}
