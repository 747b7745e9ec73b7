//! HAL (Hardware Abstraction Layer) module.
//!
//! This module provides the TriCore pieces the port is written against:
//! core special function registers, Context Save Areas, interrupt masking,
//! per-core state and, for host builds, a simulated core.

pub mod cpu;
pub mod csa;
pub mod irq;
pub mod percpu;
pub mod regs;
pub mod spin;

#[cfg(any(test, feature = "sim"))]
pub mod sim;

pub use cpu::Cpu;
pub use csa::{Csa, CsaArea, Link};
pub use irq::{InterruptMask, IrqSave, critical_section};
