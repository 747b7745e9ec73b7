//! The instruction-level interface the port needs from one TriCore core.
//!
//! A board implements [`Cpu`] on top of `mfcr`/`mtcr`, `dsync`/`isync`,
//! `enable`/`disable`, `svlcx`/`rslcx` and `rfe`; [`crate::hal::sim::SimCpu`]
//! implements it in software for host builds.
//!
//! `SimCpu` is the only implementation in this crate. A silicon one needs
//! the core instructions above as inline assembly, which in turn needs a
//! Rust target for TriCore; until then [`crate::platform::tc39x`] supplies
//! the board data only.

use super::csa::{Csa, Link};
use super::percpu::CoreId;
use super::regs::CoreReg;

/// One TriCore core as seen by the port layer.
pub trait Cpu {
    /// Value of the `CORE_ID` register.
    fn core_id(&self) -> CoreId;

    /// Reads a core special function register.
    fn mfcr(&self, reg: CoreReg) -> u32;

    /// Writes a core special function register. Writes to context pointers
    /// must be followed by [`Cpu::isync`] before they are relied upon.
    fn mtcr(&mut self, reg: CoreReg, value: u32);

    /// Data synchronisation barrier: drains buffered CSA writes.
    fn dsync(&mut self);

    /// Instruction synchronisation barrier: makes `mtcr` effects visible.
    fn isync(&mut self);

    fn nop(&mut self) {}

    /// Clears `ICR.IE` and returns whether interrupts were enabled.
    fn disable(&mut self) -> bool;

    /// Sets `ICR.IE`.
    fn enable(&mut self);

    /// Re-enables interrupts only if `was_enabled`.
    #[inline]
    fn restore(&mut self, was_enabled: bool) {
        if was_enabled {
            self.enable();
        }
    }

    /// The CSA `link` names.
    fn csa(&self, link: Link) -> &Csa;

    fn csa_mut(&mut self, link: Link) -> &mut Csa;

    /// Saves the lower context into the CSA at the head of the free list and
    /// makes it the head of the live chain. Traps on depletion.
    fn svlcx(&mut self);

    /// Restores the lower context at the head of the live chain and returns
    /// that CSA to the free list.
    fn rslcx(&mut self);

    /// Return from call: jumps to `A11` and restores the upper context. On
    /// silicon this is the `ret` ending the function that called it.
    fn ret(&mut self);

    /// Trap entry as performed by hardware: saves the upper context and
    /// disables interrupts. A no-op on silicon, where the trap vector has
    /// already done it.
    fn enter_trap(&mut self);

    /// Interrupt entry as performed by hardware: saves the upper context,
    /// disables interrupts and raises `ICR.CCPN` to `priority`.
    fn enter_interrupt(&mut self, priority: u8);

    /// Return from exception: jumps to `A11`, restores the upper context
    /// and the interrupt state recorded in `PCXI`.
    fn rfe(&mut self);

    /// Raises the free context list depletion trap (FCD). Never returns.
    fn context_depletion_trap(&mut self) -> !;
}
