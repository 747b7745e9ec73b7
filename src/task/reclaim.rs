//! Returning a dead task's CSAs to the free list.
//!
//! A task cannot give back its own chain: the chain is what it is running
//! on. Deletion therefore only queues the task; the idle task of the same
//! core later splices each queued chain onto the front of `FCX` in one step.

use alloc::sync::Arc;

use intrusive_collections::{LinkedList, LinkedListAtomicLink, intrusive_adapter};

use crate::drivers::timer::CompareTimer;
use crate::hal::cpu::Cpu;
use crate::hal::csa::Link;
use crate::hal::irq::IrqSave;
use crate::hal::percpu::PerCpu;
use crate::hal::regs::CoreReg;

use super::{ChainHandle, TaskControlBlock, TaskRef, TaskScheduler, TaskState};

intrusive_adapter!(ReclaimAdapter = TaskRef: TaskControlBlock { reclaim_link: LinkedListAtomicLink });

/// Deleted tasks of one core, oldest first.
pub struct ReclaimQueue {
    list: LinkedList<ReclaimAdapter>,
}

impl ReclaimQueue {
    pub const fn new() -> Self {
        Self {
            list: LinkedList::new(ReclaimAdapter::NEW),
        }
    }

    pub fn push_back(&mut self, task: TaskRef) {
        self.list.push_back(task);
    }

    pub fn pop_front(&mut self) -> Option<TaskRef> {
        self.list.pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn len(&self) -> usize {
        self.list.iter().count()
    }
}

impl Default for ReclaimQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Cpu, T: CompareTimer> PerCpu<C, T> {
    /// Puts every CSA of the chain `handle` names back on the free list and
    /// returns how many there were. A null handle is a no-op.
    ///
    /// The chain must not be live: nothing may still be running on it.
    pub fn reclaim_chain(&mut self, handle: ChainHandle) -> usize {
        if handle.is_null() {
            return 0;
        }
        let head = handle.link().untagged();
        debug_assert_ne!(
            Link::from_raw(self.cpu.mfcr(CoreReg::Pcxi)).untagged(),
            head,
            "reclaiming the live chain"
        );

        let mut tail = head;
        let mut count = 1;
        loop {
            let next = self.cpu.csa(tail).link().untagged();
            if next.is_null() {
                break;
            }
            self.cpu.csa_mut(tail).set_link(next);
            tail = next;
            count += 1;
        }

        {
            let mut cpu = IrqSave::new(&mut self.cpu);
            cpu.dsync();
            let free = Link::from_raw(cpu.mfcr(CoreReg::Fcx));
            cpu.csa_mut(tail).set_link(free);
            cpu.dsync();
            cpu.mtcr(CoreReg::Fcx, head.raw());
            cpu.isync();
        }

        self.stats.reclaimed_records += count as u64;
        count
    }

    /// Queues a deleted task of this core for [`PerCpu::reclaim_deleted`].
    pub fn defer_reclaim(&self, task: TaskRef) {
        assert_eq!(
            task.core(),
            self.core_id(),
            "task {} belongs to core {}",
            task.id(),
            task.core()
        );
        debug_assert_eq!(task.state(), TaskState::Deleted);
        self.reclaim.lock().push_back(task);
    }

    /// Deletes a task that is not running. Its chain is reclaimed later from
    /// the idle path.
    pub fn delete_task(&self, task: TaskRef) {
        let is_current = self
            .current_task
            .as_ref()
            .is_some_and(|current| Arc::ptr_eq(current, &task));
        assert!(!is_current, "task {} is running; use exit_current", task.id());

        info!("core {}: task {} ({}) deleted", task.core(), task.id(), task.name());
        task.set_state(TaskState::Deleted);
        self.defer_reclaim(task);
    }

    /// Ends the running task: marks it deleted, queues its chain and yields.
    /// Does not return to the task on silicon.
    pub fn exit_current<S: TaskScheduler + ?Sized>(&mut self, scheduler: &mut S) {
        let core = self.core_id();
        let task = self
            .current_task
            .clone()
            .unwrap_or_else(|| panic!("core {core}: exit without a current task"));
        info!("core {core}: task {} ({}) exiting", task.id(), task.name());
        task.set_state(TaskState::Deleted);
        self.defer_reclaim(task);
        self.yield_now(scheduler);
    }

    /// Reclaims the chains of every queued task. Called from the idle task;
    /// returns the number of tasks reclaimed.
    pub fn reclaim_deleted(&mut self) -> usize {
        let mut tasks = 0;
        loop {
            let Some(task) = self.reclaim.lock().pop_front() else {
                break;
            };
            let is_current = self
                .current_task
                .as_ref()
                .is_some_and(|current| Arc::ptr_eq(current, &task));
            assert!(!is_current, "task {} is reclaiming itself", task.id());

            let handle = task.take_top_of_stack();
            assert!(
                !handle.is_null(),
                "deleted task {} has no saved context",
                task.id()
            );
            let records = self.reclaim_chain(handle);
            debug!(
                "core {}: reclaimed {records} CSAs of task {} ({})",
                task.core(),
                task.id(),
                task.name()
            );
            tasks += 1;
        }
        self.stats.reclaimed_tasks += tasks as u64;
        tasks
    }
}
