//! Task control block and the context-chain handle it carries.

use alloc::sync::Arc;
use core::fmt;
use core::sync::atomic::{AtomicU8, AtomicU32, AtomicUsize, Ordering};

use intrusive_collections::LinkedListAtomicLink;

use crate::hal::csa::Link;
use crate::hal::percpu::CoreId;

/// Task identifier type.
pub type TaskId = usize;

/// Shared reference to a task.
pub type TaskRef = Arc<TaskControlBlock>;

/// PID of the tasks
static TASK_PID: AtomicUsize = AtomicUsize::new(1);

/// Task state enumeration.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Waiting to be picked by the scheduler.
    Ready = 0,
    /// Owns the core; its chain is lent to `PCXI`.
    Running = 1,
    /// Switched out and not runnable.
    Blocked = 2,
    /// Terminated; its chain waits for the idle path to reclaim it.
    Deleted = 3,
}

impl From<u8> for TaskState {
    fn from(val: u8) -> Self {
        match val {
            0 => TaskState::Ready,
            1 => TaskState::Running,
            2 => TaskState::Blocked,
            3 => TaskState::Deleted,
            _ => unreachable!("invalid task state {val}"),
        }
    }
}

/// The tagged link of a suspended task's head (lower) CSA.
///
/// It is the whole saved execution state of the task: loading it into
/// `PCXI` and running `rslcx; rfe` resumes the task.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct ChainHandle(Link);

impl ChainHandle {
    pub const NULL: ChainHandle = ChainHandle(Link::NULL);

    #[inline]
    pub const fn from_link(link: Link) -> Self {
        Self(link)
    }

    #[inline]
    pub const fn link(self) -> Link {
        self.0
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0.raw()
    }

    #[inline]
    pub const fn is_null(self) -> bool {
        self.0.is_null()
    }
}

impl fmt::Debug for ChainHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChainHandle({:#010x})", self.raw())
    }
}

/// Task control block.
///
/// `top_of_stack` is kept as the first field: it holds the task's
/// [`ChainHandle`] while the task is switched out, and is null while the task
/// runs.
#[repr(C)]
pub struct TaskControlBlock {
    top_of_stack: AtomicU32,
    id: TaskId,
    name: &'static str,
    core: CoreId,
    state: AtomicU8,
    pub(crate) ready_link: LinkedListAtomicLink,
    pub(crate) reclaim_link: LinkedListAtomicLink,
}

impl TaskControlBlock {
    /// Creates a ready task pinned to `core` whose saved context is `handle`.
    pub fn new(name: &'static str, core: CoreId, handle: ChainHandle) -> Self {
        Self {
            top_of_stack: AtomicU32::new(handle.raw()),
            id: TASK_PID.fetch_add(1, Ordering::Relaxed),
            name,
            core,
            state: AtomicU8::new(TaskState::Ready as u8),
            ready_link: LinkedListAtomicLink::new(),
            reclaim_link: LinkedListAtomicLink::new(),
        }
    }

    #[inline]
    pub fn id(&self) -> TaskId {
        self.id
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The core the task runs on.
    #[inline]
    pub fn core(&self) -> CoreId {
        self.core
    }

    #[inline]
    pub fn state(&self) -> TaskState {
        TaskState::from(self.state.load(Ordering::Acquire))
    }

    #[inline]
    pub fn set_state(&self, state: TaskState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// The saved chain handle, null while the task runs.
    #[inline]
    pub fn top_of_stack(&self) -> ChainHandle {
        ChainHandle::from_link(Link::from_raw(self.top_of_stack.load(Ordering::Acquire)))
    }

    #[inline]
    pub fn set_top_of_stack(&self, handle: ChainHandle) {
        self.top_of_stack.store(handle.raw(), Ordering::Release);
    }

    /// Takes the saved handle, leaving null behind.
    #[inline]
    pub fn take_top_of_stack(&self) -> ChainHandle {
        ChainHandle::from_link(Link::from_raw(self.top_of_stack.swap(0, Ordering::AcqRel)))
    }
}

impl fmt::Debug for TaskControlBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskControlBlock")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("core", &self.core)
            .field("state", &self.state())
            .field("top_of_stack", &self.top_of_stack())
            .finish()
    }
}
