//! Initial context of a new task.
//!
//! A task that has never run is given the chain a yield would have left
//! behind: a lower CSA whose link names an upper CSA.
//!
//! ```text
//!   handle ──> lower CSA                upper CSA
//!              [0] PCXI = UL|PIE|upper ──> [0] PCXI = 0
//!              [1] A11  = entry            [1] PSW  = 0x8FF
//!              [8] A4   = parameter        [2] A10  = top of stack
//! ```
//!
//! Restoring it with `rslcx; rfe` lands on `entry` with the parameter in
//! `A4`, the stack in `A10` and interrupts enabled.

use alloc::sync::Arc;

use crate::config::{INITIAL_PCXI_UPPER_CONTEXT_WORD, SYSTEM_PROGRAM_STATUS_WORD};
use crate::drivers::timer::CompareTimer;
use crate::hal::cpu::Cpu;
use crate::hal::csa::{Link, lower, upper};
use crate::hal::irq::{InterruptMask, IrqSave};
use crate::hal::percpu::PerCpu;
use crate::hal::regs::CoreReg;

use super::{ChainHandle, TaskControlBlock, TaskRef};

impl<C: Cpu, T: CompareTimer> PerCpu<C, T> {
    /// Builds the initial two-CSA chain of a task and returns its handle.
    ///
    /// Both CSAs come off the head of this core's free list. If fewer than
    /// two are free, nothing is taken and the context depletion trap is
    /// raised.
    pub fn initialise_stack(&mut self, top_of_stack: u32, entry: u32, parameter: u32) -> ChainHandle {
        let (lower_link, upper_link) = {
            let mut cpu = InterruptMask::new(&mut self.cpu);
            cpu.dsync();
            let lower_link = Link::from_raw(cpu.mfcr(CoreReg::Fcx)).untagged();
            let upper_link = if lower_link.is_null() {
                Link::NULL
            } else {
                cpu.csa(lower_link).link().untagged()
            };
            if upper_link.is_null() {
                error!(
                    "core {}: free CSA list cannot hold a new task context",
                    cpu.core_id()
                );
                cpu.context_depletion_trap();
            }

            let mut cpu = IrqSave::new(&mut *cpu);
            cpu.dsync();
            let next_free = cpu.csa(upper_link).link();
            cpu.mtcr(CoreReg::Fcx, next_free.raw());
            cpu.isync();
            (lower_link, upper_link)
        };

        let upper_csa = self.cpu.csa_mut(upper_link);
        upper_csa.clear();
        upper_csa[upper::A10] = top_of_stack;
        upper_csa[upper::PSW] = SYSTEM_PROGRAM_STATUS_WORD;

        let lower_csa = self.cpu.csa_mut(lower_link);
        lower_csa.clear();
        lower_csa[lower::A4] = parameter;
        lower_csa[lower::A11] = entry;
        lower_csa[lower::PCXI] = INITIAL_PCXI_UPPER_CONTEXT_WORD | upper_link.raw();

        self.cpu.dsync();
        ChainHandle::from_link(lower_link)
    }

    /// Creates a ready task on this core running `entry(parameter)` on the
    /// stack ending at `top_of_stack`.
    pub fn create_task(
        &mut self,
        name: &'static str,
        entry: u32,
        parameter: u32,
        top_of_stack: u32,
    ) -> TaskRef {
        let handle = self.initialise_stack(top_of_stack, entry, parameter);
        let task = Arc::new(TaskControlBlock::new(name, self.core_id(), handle));
        info!(
            "core {}: task {} ({}) created, context {:?}",
            task.core(),
            task.id(),
            name,
            handle
        );
        task
    }
}
