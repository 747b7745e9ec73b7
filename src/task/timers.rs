//! Per-core kernel tick.
//!
//! Each core ticks from its own STM. The compare value is moved forward by
//! exactly one period on every tick. The comparator matches on equality, so
//! a deadline that is already behind the counter when it is programmed only
//! fires after the compared counter bits wrap back round to it. That one
//! long period is counted and traced, never reported as an error.

use anyhow::ensure;

use crate::config::{ISR_PRIORITY_STM, TIMER_INT_TIME_MS};
use crate::drivers::timer::{CompareConfig, CompareTimer, TypeOfService};
use crate::error::{PortError, PortResult};
use crate::hal::cpu::Cpu;
use crate::hal::irq::{clear_interrupt_mask_from_isr, set_interrupt_mask_from_isr};
use crate::hal::percpu::{CoreId, PerCpu};

use super::TaskScheduler;

/// Tick state of one core: its timer and the period in timer ticks.
pub struct TickDriver<T: CompareTimer> {
    timer: T,
    type_of_service: TypeOfService,
    period: u32,
}

impl<T: CompareTimer> TickDriver<T> {
    pub fn new(timer: T, type_of_service: TypeOfService) -> Self {
        Self {
            timer,
            type_of_service,
            period: 0,
        }
    }

    /// Programs the first deadline one tick period from now.
    pub fn init(&mut self, core: CoreId) -> PortResult<()> {
        let ticks = self.timer.ticks_from_millis(TIMER_INT_TIME_MS);
        ensure!(
            ticks != 0 && ticks <= i32::MAX as u64,
            PortError::InvalidTickPeriod
        );
        self.period = ticks as u32;

        self.timer.enable_ocds_suspend();
        self.timer.init_compare(&CompareConfig::new(
            self.period,
            ISR_PRIORITY_STM,
            self.type_of_service,
        ));
        info!(
            "core {core}: tick every {} STM ticks at {} Hz, SRC priority {}",
            self.period,
            self.timer.frequency(),
            ISR_PRIORITY_STM
        );
        Ok(())
    }

    /// Timer ticks per kernel tick; zero before [`TickDriver::init`].
    #[inline]
    pub fn period(&self) -> u32 {
        self.period
    }

    #[inline]
    pub fn timer(&self) -> &T {
        &self.timer
    }

    #[inline]
    pub fn timer_mut(&mut self) -> &mut T {
        &mut self.timer
    }

    /// Clears the match and moves the deadline one period on. Returns
    /// whether the counter is already past the new deadline.
    fn rearm(&mut self) -> bool {
        self.timer.clear_match();
        self.timer.increase_compare(self.period);
        self.timer.compare().wrapping_sub(self.timer.now()) as i32 <= 0
    }
}

impl<C: Cpu, T: CompareTimer> PerCpu<C, T> {
    /// Body of the tick interrupt: re-arms the timer, advances the kernel
    /// tick and switches tasks if the scheduler asks for it.
    pub fn tick_isr<S: TaskScheduler + ?Sized>(&mut self, scheduler: &mut S) {
        let core = self.core_id();
        if self.tick.rearm() {
            self.stats.late_ticks += 1;
            trace!(
                "core {core}: tick deadline {:#x} already passed at {:#x}",
                self.tick.timer.compare(),
                self.tick.timer.now()
            );
        }
        self.stats.ticks += 1;

        let saved = set_interrupt_mask_from_isr(&mut self.cpu);
        let switch_due = scheduler.increment_tick(core);
        clear_interrupt_mask_from_isr(&mut self.cpu, saved);

        if switch_due {
            self.switch_context(scheduler);
        }
    }

    /// The STM compare interrupt of this core.
    pub fn tick_interrupt<S: TaskScheduler + ?Sized>(&mut self, scheduler: &mut S) {
        self.interrupt_frame(ISR_PRIORITY_STM, |this| this.tick_isr(scheduler));
    }
}
