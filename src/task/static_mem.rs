//! Statically placed storage for the tasks the kernel creates itself.
//!
//! The idle task and the timer service task of every core get their stacks
//! from a fixed region instead of the heap. Each core id owns one slot of
//! the region, so two cores never share a stack.

use anyhow::ensure;

use crate::config::{MAX_CORE_ID, MINIMAL_STACK_SIZE, TIMER_TASK_STACK_DEPTH};
use crate::error::{PortError, PortResult};
use crate::hal::percpu::CoreId;

/// Stack TriCore tasks run on: grows down from `top`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskMemory {
    pub top: u32,
    /// Depth in words.
    pub depth: usize,
}

/// Supplies the storage of the kernel-created tasks of a core.
pub trait StaticMemoryProvider {
    fn idle_task_memory(&self, core: CoreId) -> PortResult<TaskMemory>;

    fn timer_task_memory(&self, core: CoreId) -> PortResult<TaskMemory>;
}

/// Per-core idle and timer stacks carved from one region starting at
/// `base`: `[core 0: idle | timer][core 1: idle | timer]...`.
#[derive(Debug, Clone, Copy)]
pub struct StaticStacks {
    base: u32,
}

impl StaticStacks {
    const IDLE_BYTES: u32 = (MINIMAL_STACK_SIZE * 4) as u32;
    const TIMER_BYTES: u32 = (TIMER_TASK_STACK_DEPTH * 4) as u32;
    const SLOT_BYTES: u32 = Self::IDLE_BYTES + Self::TIMER_BYTES;

    /// Bytes the region must provide.
    pub const REGION_SIZE: u32 = Self::SLOT_BYTES * (MAX_CORE_ID as u32 + 1);

    pub const fn new(base: u32) -> Self {
        Self { base }
    }

    fn slot(&self, core: CoreId) -> PortResult<u32> {
        ensure!(core <= MAX_CORE_ID, PortError::InvalidCore(core));
        Ok(self.base + Self::SLOT_BYTES * core as u32)
    }
}

impl StaticMemoryProvider for StaticStacks {
    fn idle_task_memory(&self, core: CoreId) -> PortResult<TaskMemory> {
        Ok(TaskMemory {
            top: self.slot(core)? + Self::IDLE_BYTES,
            depth: MINIMAL_STACK_SIZE,
        })
    }

    fn timer_task_memory(&self, core: CoreId) -> PortResult<TaskMemory> {
        Ok(TaskMemory {
            top: self.slot(core)? + Self::SLOT_BYTES,
            depth: TIMER_TASK_STACK_DEPTH,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cores_get_disjoint_stacks() {
        let stacks = StaticStacks::new(0x7000_0000);
        let idle0 = stacks.idle_task_memory(0).unwrap();
        let timer0 = stacks.timer_task_memory(0).unwrap();
        let idle6 = stacks.idle_task_memory(6).unwrap();

        assert_eq!(idle0.top, 0x7000_0400);
        assert_eq!(idle0.depth, MINIMAL_STACK_SIZE);
        assert_eq!(timer0.top, 0x7000_0C00);
        assert_eq!(idle6.top, 0x7000_0000 + 6 * 0xC00 + 0x400);
        assert!(timer0.top <= idle6.top - 0x400);
        assert!(stacks.timer_task_memory(7).is_err());
    }
}
