//! Per-CPU data structure and operations.
//!
//! Each core owns one [`PerCpu`]: its [`Cpu`], its tick timer, the task it is
//! running and the queue of deleted tasks waiting for their CSAs to be
//! reclaimed. Everything in it is touched only by the owning core, with
//! interrupts masked where the hardware state is shared with handlers. The
//! reclaim queue is the exception and sits behind a spin lock.
//!
//! [`CpuTable`] indexes the per-core structures by `CORE_ID`. TC39x numbers
//! its cores 0-4 and 6, so the table has holes.

use alloc::vec::Vec;

use anyhow::ensure;

use super::cpu::Cpu;
use super::spin::Mutex;
use crate::config::MAX_CORE_ID;
use crate::drivers::timer::{CompareTimer, TypeOfService};
use crate::error::{PortError, PortResult};
use crate::task::reclaim::ReclaimQueue;
use crate::task::timers::TickDriver;
use crate::task::TaskRef;

/// Value of the `CORE_ID` register.
pub type CoreId = usize;

/// Counters a core keeps about its own scheduling activity.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CoreStats {
    pub switches: u64,
    pub ticks: u64,
    /// Ticks whose next deadline had already passed when it was programmed.
    pub late_ticks: u64,
    pub reclaimed_tasks: u64,
    pub reclaimed_records: u64,
}

/// Per-CPU data structure.
pub struct PerCpu<C: Cpu, T: CompareTimer> {
    pub(crate) cpu: C,
    pub(crate) tick: TickDriver<T>,
    /// Written only by the switch protocol and by scheduler start.
    pub(crate) current_task: Option<TaskRef>,
    pub(crate) reclaim: Mutex<ReclaimQueue>,
    pub(crate) started: bool,
    pub(crate) stats: CoreStats,
}

impl<C: Cpu, T: CompareTimer> PerCpu<C, T> {
    /// Creates the state of the core `cpu` belongs to, ticking from `timer`
    /// with its service request routed to `type_of_service`.
    pub fn new(cpu: C, timer: T, type_of_service: TypeOfService) -> Self {
        Self {
            cpu,
            tick: TickDriver::new(timer, type_of_service),
            current_task: None,
            reclaim: Mutex::new(ReclaimQueue::new()),
            started: false,
            stats: CoreStats::default(),
        }
    }

    #[inline]
    pub fn core_id(&self) -> CoreId {
        self.cpu.core_id()
    }

    #[inline]
    pub fn cpu(&self) -> &C {
        &self.cpu
    }

    #[inline]
    pub fn cpu_mut(&mut self) -> &mut C {
        &mut self.cpu
    }

    #[inline]
    pub fn tick_driver(&self) -> &TickDriver<T> {
        &self.tick
    }

    #[inline]
    pub fn timer_mut(&mut self) -> &mut T {
        self.tick.timer_mut()
    }

    /// The task this core is running.
    #[inline]
    pub fn current_task(&self) -> Option<&TaskRef> {
        self.current_task.as_ref()
    }

    #[inline]
    pub fn is_started(&self) -> bool {
        self.started
    }

    #[inline]
    pub fn stats(&self) -> CoreStats {
        self.stats
    }
}

/// Per-core structures indexed by core id.
pub struct CpuTable<C: Cpu, T: CompareTimer> {
    slots: Vec<Option<PerCpu<C, T>>>,
}

impl<C: Cpu, T: CompareTimer> CpuTable<C, T> {
    pub fn new() -> Self {
        Self {
            slots: (0..=MAX_CORE_ID).map(|_| None).collect(),
        }
    }

    /// Installs a core under its own `CORE_ID`.
    pub fn insert(&mut self, percpu: PerCpu<C, T>) -> PortResult<()> {
        let core = percpu.core_id();
        ensure!(
            core <= MAX_CORE_ID && self.slots[core].is_none(),
            PortError::InvalidCore(core)
        );
        self.slots[core] = Some(percpu);
        Ok(())
    }

    pub fn get(&self, core: CoreId) -> PortResult<&PerCpu<C, T>> {
        self.slots
            .get(core)
            .and_then(Option::as_ref)
            .ok_or_else(|| PortError::InvalidCore(core).into())
    }

    pub fn get_mut(&mut self, core: CoreId) -> PortResult<&mut PerCpu<C, T>> {
        self.slots
            .get_mut(core)
            .and_then(Option::as_mut)
            .ok_or_else(|| PortError::InvalidCore(core).into())
    }

    /// Installed cores in id order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut PerCpu<C, T>> {
        self.slots.iter_mut().flatten()
    }

    pub fn len(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<C: Cpu, T: CompareTimer> Default for CpuTable<C, T> {
    fn default() -> Self {
        Self::new()
    }
}
