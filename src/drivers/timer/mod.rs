//! System Timer (STM) drivers.
//!
//! Every TriCore core has a free-running 64-bit STM. The kernel tick uses
//! compare register 0 against the low 32 bits of the counter: the compare
//! value is advanced by one period from the tick interrupt itself. The
//! comparator matches on equality only, so a deadline a late handler has
//! already missed fires once the compared bits wrap back round to it.

pub mod stm;

#[cfg(any(test, feature = "sim"))]
pub mod sim;

use int_ratio::Ratio;

/// Number of milliseconds in a second.
pub const MILLIS_PER_SEC: u64 = 1_000;

/// Interrupt router destination of a service request.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeOfService {
    Cpu0 = 0,
    Dma = 1,
    Cpu1 = 2,
    Cpu2 = 3,
    Cpu3 = 4,
    Cpu4 = 5,
    Cpu5 = 6,
}

/// Compare-match configuration of one STM comparator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompareConfig {
    /// Comparator register used (0 or 1).
    pub comparator: u8,
    /// Service request priority of the compare interrupt.
    pub trigger_priority: u8,
    pub type_of_service: TypeOfService,
    /// Ticks from now until the first match.
    pub ticks: u32,
}

impl CompareConfig {
    pub const fn new(ticks: u32, trigger_priority: u8, type_of_service: TypeOfService) -> Self {
        Self {
            comparator: 0,
            trigger_priority,
            type_of_service,
            ticks,
        }
    }
}

/// A compare-match timer owned by one core.
pub trait CompareTimer {
    /// Counter frequency in Hz.
    fn frequency(&self) -> u32;

    /// Low 32 bits of the counter.
    fn now(&self) -> u32;

    /// Programs the comparator to fire `config.ticks` from now and routes
    /// its service request.
    fn init_compare(&mut self, config: &CompareConfig);

    /// Current compare value.
    fn compare(&self) -> u32;

    /// Moves the compare value `ticks` further, wrapping at 32 bits.
    fn increase_compare(&mut self, ticks: u32);

    /// Clears the latched compare match.
    fn clear_match(&mut self);

    /// Freezes the counter while a debugger halts the core.
    fn enable_ocds_suspend(&mut self) {}

    /// Converts milliseconds to counter ticks.
    fn ticks_from_millis(&self, millis: u64) -> u64 {
        Ratio::new(self.frequency(), MILLIS_PER_SEC as u32).mul_trunc(millis)
    }
}
