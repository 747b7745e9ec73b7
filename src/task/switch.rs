//! Task context switching.
//!
//! A suspended task is nothing but the head of its CSA chain. Switching
//! stores the live chain head from `PCXI` into the outgoing task and loads
//! the incoming task's head into `PCXI`; the `rslcx; rfe` that ends the trap
//! or interrupt frame then resumes whichever task `PCXI` names.

use anyhow::ensure;

use crate::config::{INITIAL_SYSCON, RESTORE_PSW_MASK, SYSCALL_TASK_YIELD};
use crate::drivers::timer::CompareTimer;
use crate::error::{PortError, PortResult};
use crate::hal::cpu::Cpu;
use crate::hal::csa::Link;
use crate::hal::irq::IrqSave;
use crate::hal::percpu::PerCpu;
use crate::hal::regs::CoreReg;

use super::{ChainHandle, TaskRef, TaskScheduler, TaskState};

impl<C: Cpu, T: CompareTimer> PerCpu<C, T> {
    /// Saves the running task's chain head, asks `scheduler` for the next
    /// task and makes its chain the live one.
    ///
    /// Must be called from inside a trap or interrupt frame, after `svlcx`:
    /// the frame's closing `rslcx; rfe` resumes the selected task.
    pub fn switch_context<S: TaskScheduler + ?Sized>(&mut self, scheduler: &mut S) {
        let core = self.core_id();
        let current = self
            .current_task
            .take()
            .unwrap_or_else(|| panic!("core {core}: context switch without a current task"));

        let mut cpu = IrqSave::new(&mut self.cpu);
        cpu.dsync();
        let head = ChainHandle::from_link(Link::from_raw(cpu.mfcr(CoreReg::Pcxi)));
        current.set_top_of_stack(head);
        if current.state() == TaskState::Running {
            current.set_state(TaskState::Ready);
        }

        let next = scheduler.select_next_task(core, &current);
        assert!(
            next.core() == core && next.state() != TaskState::Deleted,
            "core {core}: scheduler selected {next:?}"
        );
        next.set_state(TaskState::Running);
        let handle = next.take_top_of_stack();
        assert!(
            !handle.is_null(),
            "core {core}: task {} has no saved context",
            next.id()
        );
        self.current_task = Some(next.clone());
        cpu.mtcr(CoreReg::Pcxi, handle.raw());
        cpu.isync();
        drop(cpu);

        self.stats.switches += 1;
        trace!(
            "core {core}: switch {} ({}) -> {} ({})",
            current.id(),
            current.name(),
            next.id(),
            next.name()
        );
    }

    /// System call dispatch for the trap class the port owns.
    ///
    /// # Panics
    ///
    /// Panics on any identifier other than [`SYSCALL_TASK_YIELD`].
    pub fn trap_yield<S: TaskScheduler + ?Sized>(&mut self, scheduler: &mut S, id: u32) {
        match id {
            SYSCALL_TASK_YIELD => self.switch_context(scheduler),
            _ => panic!("core {}: unimplemented system call {id}", self.core_id()),
        }
    }

    /// Voluntary yield of the running task: the yield system call with its
    /// trap frame.
    pub fn yield_now<S: TaskScheduler + ?Sized>(&mut self, scheduler: &mut S) {
        self.cpu.enter_trap();
        self.cpu.svlcx();
        self.trap_yield(scheduler, SYSCALL_TASK_YIELD);
        self.cpu.rslcx();
        self.cpu.rfe();
    }

    /// Runs `handler` in an interrupt frame at `priority`. A switch made by
    /// the handler takes effect when the frame returns.
    pub fn interrupt_frame<F: FnOnce(&mut Self)>(&mut self, priority: u8, handler: F) {
        self.cpu.enter_interrupt(priority);
        self.cpu.svlcx();
        handler(self);
        self.cpu.rslcx();
        self.cpu.rfe();
    }

    /// Starts the tick and restores the context of `first`. On silicon this
    /// does not return: the closing `ret` lands on the task's entry.
    pub fn start_scheduler(&mut self, first: TaskRef) -> PortResult<()> {
        let core = self.core_id();
        ensure!(!self.started, PortError::AlreadyStarted(core));
        ensure!(
            !first.top_of_stack().is_null(),
            PortError::NoInitialContext(first.id())
        );
        assert_eq!(first.core(), core, "task {} belongs to another core", first.id());

        self.tick.init(core)?;

        self.cpu.disable();
        self.cpu.mtcr(CoreReg::Syscon, INITIAL_SYSCON);
        self.cpu.isync();

        // Call depth counting off, so the restore below needs no real frame.
        let psw = self.cpu.mfcr(CoreReg::Psw) & RESTORE_PSW_MASK;
        self.cpu.dsync();
        self.cpu.mtcr(CoreReg::Psw, psw);
        self.cpu.isync();

        first.set_state(TaskState::Running);
        let handle = first.take_top_of_stack();
        info!(
            "core {core}: scheduler started with task {} ({})",
            first.id(),
            first.name()
        );
        self.current_task = Some(first);
        self.started = true;

        self.cpu.dsync();
        self.cpu.mtcr(CoreReg::Pcxi, handle.raw());
        self.cpu.isync();
        self.cpu.nop();
        self.cpu.rslcx();
        self.cpu.nop();
        self.cpu.enable();
        self.cpu.ret();
        Ok(())
    }

    /// Nothing to undo: the port never hands the core back.
    pub fn end_scheduler(&mut self) {}
}
