//! Infineon AURIX TC39x support.

pub mod config;

use anyhow::ensure;

use super::board::Board;
use crate::config::MAX_CORE_ID;
use crate::drivers::timer::stm::Stm;
use crate::error::{PortError, PortResult};
use crate::hal::percpu::CoreId;

pub struct Tc39x;

impl Board for Tc39x {
    const NAME: &'static str = "AURIX TC39x";
    const CORE_IDS: &'static [CoreId] = &[0, 1, 2, 3, 4, 6];
    const STM_MAP: [Option<usize>; MAX_CORE_ID + 1] =
        [Some(0), Some(1), Some(2), Some(3), Some(4), None, Some(5)];
    const STM_FREQUENCY: u32 = config::STM_FREQUENCY;
    const CSA_COUNT: usize = config::CSA_COUNT;
    const STATIC_STACK_BASE: u32 = config::STATIC_STACK_BASE;

    fn csa_base(core: CoreId) -> PortResult<u32> {
        let dspr = config::DSPR_BASE.get(core).copied().unwrap_or(0);
        ensure!(dspr != 0, PortError::InvalidCore(core));
        Ok(dspr + config::CSA_DSPR_OFFSET)
    }
}

impl Tc39x {
    /// The STM serving `core`.
    pub fn stm(core: CoreId) -> PortResult<Stm> {
        let index = Self::stm_index(core)?;
        // SAFETY: the addresses are the TC39x STM block and its SR0 node,
        // which only the owning core programs.
        Ok(unsafe {
            Stm::new(
                config::STM0_BASE + index * config::STM_STRIDE,
                config::SRC_STM0_SR0 + index * config::SRC_STM_STRIDE,
                Self::STM_FREQUENCY,
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::timer::TypeOfService;

    #[test]
    fn core_six_is_served_by_stm5() {
        assert_eq!(Tc39x::stm_index(6).unwrap(), 5);
        assert_eq!(Tc39x::type_of_service(6).unwrap(), TypeOfService::Cpu5);
        assert_eq!(Tc39x::type_of_service(1).unwrap(), TypeOfService::Cpu1);
        assert!(Tc39x::stm_index(5).is_err());
        assert!(Tc39x::csa_base(5).is_err());
        assert!(Tc39x::stm_index(7).is_err());
    }

    #[test]
    fn every_core_has_a_pool_in_its_own_segment() {
        for &core in Tc39x::CORE_IDS {
            let base = Tc39x::csa_base(core).unwrap();
            assert_eq!(base >> 28, config::DSPR_BASE[core] >> 28);
            assert!(crate::hal::csa::CsaArea::new(base, Tc39x::CSA_COUNT).is_ok());
        }
    }
}
