//! A software STM driven by the test or demo that owns it.
//!
//! Like the hardware comparator it matches on equality only: a compare value
//! the counter has already passed fires again once the low 32 bits come
//! back round to it.

use super::{CompareConfig, CompareTimer};

/// Simulated system timer: the counter only moves when [`SimStm::advance`]
/// is called.
#[derive(Debug, Clone)]
pub struct SimStm {
    frequency: u32,
    counter: u64,
    compare: u32,
    config: Option<CompareConfig>,
    pending: bool,
    ocds_suspend: bool,
}

impl SimStm {
    pub fn new(frequency: u32) -> Self {
        Self {
            frequency,
            counter: 0,
            compare: 0,
            config: None,
            pending: false,
            ocds_suspend: false,
        }
    }

    /// Moves the counter forward by `ticks`, latching a match if the low 32
    /// bits pass through the compare value on the way.
    pub fn advance(&mut self, ticks: u64) {
        let start = self.now();
        self.counter = self.counter.wrapping_add(ticks);
        if self.config.is_none() {
            return;
        }
        let distance = match self.compare.wrapping_sub(start) {
            0 => 1 << 32,
            d => d as u64,
        };
        if ticks >= distance {
            self.pending = true;
        }
    }

    pub fn counter(&self) -> u64 {
        self.counter
    }

    /// Whether compare 0 has matched and its request is not yet cleared.
    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn config(&self) -> Option<&CompareConfig> {
        self.config.as_ref()
    }

    pub fn is_ocds_suspended(&self) -> bool {
        self.ocds_suspend
    }
}

impl CompareTimer for SimStm {
    fn frequency(&self) -> u32 {
        self.frequency
    }

    fn now(&self) -> u32 {
        self.counter as u32
    }

    fn init_compare(&mut self, config: &CompareConfig) {
        self.compare = self.now().wrapping_add(config.ticks);
        self.config = Some(*config);
        self.pending = false;
    }

    fn compare(&self) -> u32 {
        self.compare
    }

    fn increase_compare(&mut self, ticks: u32) {
        self.compare = self.compare.wrapping_add(ticks);
    }

    fn clear_match(&mut self) {
        self.pending = false;
    }

    fn enable_ocds_suspend(&mut self) {
        self.ocds_suspend = true;
    }
}
