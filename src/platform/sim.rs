//! Host simulation of a TC39x: same core ids, STM mapping and pool
//! placement, with simulated cores and timers.

use super::board::Board;
use super::tc39x::{Tc39x, config};
use crate::config::MAX_CORE_ID;
use crate::drivers::timer::sim::SimStm;
use crate::error::PortResult;
use crate::hal::percpu::{CoreId, PerCpu};
use crate::hal::sim::SimCpu;

pub struct SimBoard;

/// A simulated core with its timer.
pub type SimCore = PerCpu<SimCpu, SimStm>;

impl Board for SimBoard {
    const NAME: &'static str = "TC39x simulator";
    const CORE_IDS: &'static [CoreId] = Tc39x::CORE_IDS;
    const STM_MAP: [Option<usize>; MAX_CORE_ID + 1] = Tc39x::STM_MAP;
    const STM_FREQUENCY: u32 = config::STM_FREQUENCY;
    const CSA_COUNT: usize = 64;
    const STATIC_STACK_BASE: u32 = config::STATIC_STACK_BASE;

    fn csa_base(core: CoreId) -> PortResult<u32> {
        Tc39x::csa_base(core)
    }
}

impl SimBoard {
    /// Brings up `core` with a pool of `csa_count` CSAs.
    pub fn bring_up(core: CoreId, csa_count: usize) -> PortResult<SimCore> {
        let cpu = SimCpu::new(core, Self::csa_base(core)?, csa_count)?;
        let timer = SimStm::new(Self::STM_FREQUENCY);
        Ok(PerCpu::new(cpu, timer, Self::type_of_service(core)?))
    }
}
