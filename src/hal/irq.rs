//! Interrupt masking for critical sections.
//!
//! Two levels are used:
//!
//! - [`InterruptMask`] raises `ICR.CCPN` to
//!   [`MAX_SYSCALL_INTERRUPT_PRIORITY`], masking every interrupt that may call
//!   into the kernel. This is the critical section around kernel calls.
//! - [`IrqSave`] clears `ICR.IE` around the few instructions that rewrite
//!   `FCX` or `PCXI`.
//!
//! Both remember the state they found and put exactly that back, so they
//! nest.
//!
//! Code that has no [`Cpu`] at hand, such as the spin locks behind the
//! console and the reclaim queues, masks the calling core through the
//! [`LocalIrqOps`] installed at bring-up.

use core::ops::{Deref, DerefMut};

use lazyinit::LazyInit;

use super::cpu::Cpu;
use super::regs::{CoreReg, ICR, IcrValue};
use crate::config::MAX_SYSCALL_INTERRUPT_PRIORITY;

/// `ICR.IE` control of whichever core calls it.
#[derive(Clone, Copy)]
pub struct LocalIrqOps {
    /// Clears `ICR.IE` and returns whether it was set.
    pub disable: fn() -> bool,
    /// Sets `ICR.IE`.
    pub enable: fn(),
}

static LOCAL_IRQ: LazyInit<LocalIrqOps> = LazyInit::new();

/// Installs the local interrupt control. The first call wins; returns
/// whether this one did.
pub fn install_local_irq_ops(ops: LocalIrqOps) -> bool {
    LOCAL_IRQ.call_once(|| ops).is_some()
}

/// Disables interrupts on the calling core, returning whether they were
/// enabled. Before bring-up there is nothing to mask and it returns false.
#[inline]
pub fn local_irq_save() -> bool {
    LOCAL_IRQ.get().is_some_and(|ops| (ops.disable)())
}

/// Re-enables interrupts on the calling core if `was_enabled`.
#[inline]
pub fn local_irq_restore(was_enabled: bool) {
    if !was_enabled {
        return;
    }
    if let Some(ops) = LOCAL_IRQ.get() {
        (ops.enable)();
    }
}

/// Raises the priority ceiling and returns the previous `CCPN`.
pub fn set_interrupt_mask_from_isr<C: Cpu + ?Sized>(cpu: &mut C) -> u32 {
    let was_enabled = cpu.disable();
    let mut icr = IcrValue::new(cpu.mfcr(CoreReg::Icr));
    let saved = icr.read(ICR::CCPN);
    icr.modify(ICR::CCPN.val(MAX_SYSCALL_INTERRUPT_PRIORITY));
    cpu.mtcr(CoreReg::Icr, icr.get());
    cpu.isync();
    cpu.restore(was_enabled);
    saved
}

/// Puts back a ceiling returned by [`set_interrupt_mask_from_isr`].
pub fn clear_interrupt_mask_from_isr<C: Cpu + ?Sized>(cpu: &mut C, saved: u32) {
    let was_enabled = cpu.disable();
    let mut icr = IcrValue::new(cpu.mfcr(CoreReg::Icr));
    icr.modify(ICR::CCPN.val(saved));
    cpu.mtcr(CoreReg::Icr, icr.get());
    cpu.isync();
    cpu.restore(was_enabled);
}

/// Whether kernel-level interrupts are currently masked on `cpu`.
pub fn is_masked<C: Cpu + ?Sized>(cpu: &C) -> bool {
    let icr = IcrValue::new(cpu.mfcr(CoreReg::Icr));
    !icr.is_set(ICR::IE) || icr.read(ICR::CCPN) >= MAX_SYSCALL_INTERRUPT_PRIORITY
}

/// Critical section: kernel interrupts masked until dropped.
pub struct InterruptMask<'a, C: Cpu + ?Sized> {
    cpu: &'a mut C,
    saved: u32,
}

impl<'a, C: Cpu + ?Sized> InterruptMask<'a, C> {
    pub fn new(cpu: &'a mut C) -> Self {
        let saved = set_interrupt_mask_from_isr(cpu);
        Self { cpu, saved }
    }

    /// The ceiling that will be restored.
    pub fn saved(&self) -> u32 {
        self.saved
    }
}

impl<C: Cpu + ?Sized> Deref for InterruptMask<'_, C> {
    type Target = C;

    fn deref(&self) -> &C {
        &*self.cpu
    }
}

impl<C: Cpu + ?Sized> DerefMut for InterruptMask<'_, C> {
    fn deref_mut(&mut self) -> &mut C {
        &mut *self.cpu
    }
}

impl<C: Cpu + ?Sized> Drop for InterruptMask<'_, C> {
    fn drop(&mut self) {
        clear_interrupt_mask_from_isr(&mut *self.cpu, self.saved);
    }
}

/// Interrupts disabled until dropped.
pub struct IrqSave<'a, C: Cpu + ?Sized> {
    cpu: &'a mut C,
    was_enabled: bool,
}

impl<'a, C: Cpu + ?Sized> IrqSave<'a, C> {
    pub fn new(cpu: &'a mut C) -> Self {
        let was_enabled = cpu.disable();
        Self { cpu, was_enabled }
    }
}

impl<C: Cpu + ?Sized> Deref for IrqSave<'_, C> {
    type Target = C;

    fn deref(&self) -> &C {
        &*self.cpu
    }
}

impl<C: Cpu + ?Sized> DerefMut for IrqSave<'_, C> {
    fn deref_mut(&mut self) -> &mut C {
        &mut *self.cpu
    }
}

impl<C: Cpu + ?Sized> Drop for IrqSave<'_, C> {
    fn drop(&mut self) {
        self.cpu.restore(self.was_enabled);
    }
}

/// Runs `f` inside an [`InterruptMask`] critical section.
pub fn critical_section<C: Cpu + ?Sized, R>(cpu: &mut C, f: impl FnOnce(&mut C) -> R) -> R {
    let mut guard = InterruptMask::new(cpu);
    f(&mut *guard)
}
