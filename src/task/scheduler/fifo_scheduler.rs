use alloc::sync::Arc;
use alloc::vec::Vec;

use intrusive_collections::{LinkedList, LinkedListAtomicLink, intrusive_adapter};

use crate::config::MAX_CORE_ID;
use crate::hal::percpu::CoreId;
use crate::task::{TaskControlBlock, TaskRef, TaskState};

use super::TaskScheduler;

intrusive_adapter!(ReadyAdapter = TaskRef: TaskControlBlock { ready_link: LinkedListAtomicLink });

struct CoreQueue {
    ready: LinkedList<ReadyAdapter>,
    idle: Option<TaskRef>,
    slice_left: u64,
    tick_count: u64,
}

impl CoreQueue {
    const fn new() -> Self {
        Self {
            ready: LinkedList::new(ReadyAdapter::NEW),
            idle: None,
            slice_left: 0,
            tick_count: 0,
        }
    }

    fn is_idle(&self, task: &TaskRef) -> bool {
        self.idle
            .as_ref()
            .is_some_and(|idle| Arc::ptr_eq(idle, task))
    }

    /// Front of the ready queue, dropping tasks that stopped being ready
    /// while queued.
    fn pop_ready(&mut self) -> Option<TaskRef> {
        while let Some(task) = self.ready.pop_front() {
            if task.state() == TaskState::Ready {
                return Some(task);
            }
        }
        None
    }
}

/// A round-robin scheduler with one FIFO ready queue per core.
///
/// A task runs until it yields, blocks, or has used `time_slice` ticks while
/// another task is ready. The idle task of a core runs only when its queue
/// is empty. There is no priority policy.
pub struct FifoScheduler {
    cores: Vec<CoreQueue>,
    time_slice: u64,
}

impl FifoScheduler {
    /// Creates a new empty [`FifoScheduler`].
    pub fn new(time_slice: u64) -> Self {
        Self {
            cores: (0..=MAX_CORE_ID).map(|_| CoreQueue::new()).collect(),
            time_slice: time_slice.max(1),
        }
    }

    /// get the name of scheduler
    pub fn scheduler_name() -> &'static str {
        "FIFO"
    }

    /// Appends a ready task to the queue of its core.
    pub fn add_task(&mut self, task: TaskRef) {
        self.cores[task.core()].ready.push_back(task);
    }

    /// Sets the task that runs on `task.core()` when nothing else is ready.
    pub fn set_idle_task(&mut self, task: TaskRef) {
        self.cores[task.core()].idle = Some(task);
    }

    /// Makes a blocked task ready again. A task that blocked while still
    /// queued keeps its place.
    pub fn unblock(&mut self, task: TaskRef) {
        if task.state() == TaskState::Blocked {
            task.set_state(TaskState::Ready);
            if !task.ready_link.is_linked() {
                self.add_task(task);
            }
        }
    }

    /// The task to start `core` with: the first ready task, else idle.
    pub fn pick_first(&mut self, core: CoreId) -> Option<TaskRef> {
        let time_slice = self.time_slice;
        let queue = &mut self.cores[core];
        queue.slice_left = time_slice;
        queue.pop_ready().or_else(|| queue.idle.clone())
    }

    /// Ticks counted on `core`.
    pub fn tick_count(&self, core: CoreId) -> u64 {
        self.cores[core].tick_count
    }

    /// Ready tasks queued on `core`, idle excluded.
    pub fn ready_len(&self, core: CoreId) -> usize {
        self.cores[core]
            .ready
            .iter()
            .filter(|task| task.state() == TaskState::Ready)
            .count()
    }
}

impl TaskScheduler for FifoScheduler {
    fn select_next_task(&mut self, core: CoreId, current: &TaskRef) -> TaskRef {
        let time_slice = self.time_slice;
        let queue = &mut self.cores[core];
        if current.state() == TaskState::Ready && !queue.is_idle(current) {
            queue.ready.push_back(current.clone());
        }
        queue.slice_left = time_slice;

        queue
            .pop_ready()
            .or_else(|| queue.idle.clone())
            .unwrap_or_else(|| panic!("core {core}: no ready task and no idle task"))
    }

    fn increment_tick(&mut self, core: CoreId) -> bool {
        let queue = &mut self.cores[core];
        queue.tick_count += 1;
        queue.slice_left = queue.slice_left.saturating_sub(1);
        queue.slice_left == 0 && !queue.ready.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::ChainHandle;

    fn task(name: &'static str, core: CoreId) -> TaskRef {
        Arc::new(TaskControlBlock::new(name, core, ChainHandle::NULL))
    }

    #[test]
    fn round_robin_with_idle_fallback() {
        let mut sched = FifoScheduler::new(2);
        let idle = task("idle", 0);
        let (a, b) = (task("a", 0), task("b", 0));
        sched.set_idle_task(idle.clone());
        sched.add_task(a.clone());
        sched.add_task(b.clone());

        let first = sched.pick_first(0).unwrap();
        assert!(Arc::ptr_eq(&first, &a));
        a.set_state(TaskState::Ready);
        let next = sched.select_next_task(0, &a);
        assert!(Arc::ptr_eq(&next, &b));

        b.set_state(TaskState::Blocked);
        a.set_state(TaskState::Deleted);
        let next = sched.select_next_task(0, &b);
        assert!(Arc::ptr_eq(&next, &idle));

        sched.unblock(b.clone());
        idle.set_state(TaskState::Ready);
        let next = sched.select_next_task(0, &idle);
        assert!(Arc::ptr_eq(&next, &b));
        assert_eq!(sched.ready_len(0), 0);
    }

    #[test]
    fn unblocking_a_still_queued_task_keeps_one_entry() {
        let mut sched = FifoScheduler::new(2);
        let idle = task("idle", 2);
        let (a, b) = (task("a", 2), task("b", 2));
        sched.set_idle_task(idle.clone());
        sched.add_task(a.clone());
        sched.add_task(b.clone());

        b.set_state(TaskState::Blocked);
        assert_eq!(sched.ready_len(2), 1);
        sched.unblock(b.clone());
        assert_eq!(b.state(), TaskState::Ready);
        assert_eq!(sched.ready_len(2), 2);

        let first = sched.pick_first(2).unwrap();
        assert!(Arc::ptr_eq(&first, &a));
        a.set_state(TaskState::Blocked);
        let next = sched.select_next_task(2, &a);
        assert!(Arc::ptr_eq(&next, &b));
        b.set_state(TaskState::Blocked);
        let next = sched.select_next_task(2, &b);
        assert!(Arc::ptr_eq(&next, &idle), "b was queued once");
    }

    #[test]
    fn slice_expires_only_with_a_ready_task() {
        let mut sched = FifoScheduler::new(3);
        let (a, b) = (task("a", 1), task("b", 1));
        sched.add_task(a.clone());
        let first = sched.pick_first(1).unwrap();
        assert!(Arc::ptr_eq(&first, &a));

        assert!(!sched.increment_tick(1));
        assert!(!sched.increment_tick(1));
        assert!(!sched.increment_tick(1), "nobody else is ready");

        sched.add_task(b);
        assert!(sched.increment_tick(1));
        assert_eq!(sched.tick_count(1), 4);
    }
}
