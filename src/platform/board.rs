//! Board abstraction trait.
//!
//! This trait defines what the port needs to know about a device: which
//! core ids exist, where each core's CSA pool lives, and which STM module
//! and interrupt destination serve each core.

use crate::config::MAX_CORE_ID;
use crate::drivers::timer::TypeOfService;
use crate::error::{PortError, PortResult};
use crate::hal::percpu::CoreId;

/// Board-specific configuration trait.
pub trait Board {
    /// Board name.
    const NAME: &'static str;

    /// `CORE_ID` values of the cores present.
    const CORE_IDS: &'static [CoreId];

    /// STM module serving each core id, `None` where no core exists.
    const STM_MAP: [Option<usize>; MAX_CORE_ID + 1];

    /// STM counter frequency in Hz.
    const STM_FREQUENCY: u32;

    /// CSAs in each core's pool.
    const CSA_COUNT: usize;

    /// Base of the region the kernel-created task stacks are carved from.
    const STATIC_STACK_BASE: u32;

    /// First CSA of `core`'s pool.
    fn csa_base(core: CoreId) -> PortResult<u32>;

    /// STM module of `core`.
    fn stm_index(core: CoreId) -> PortResult<usize> {
        Self::STM_MAP
            .get(core)
            .copied()
            .flatten()
            .ok_or_else(|| PortError::InvalidCore(core).into())
    }

    /// Interrupt router destination for `core`'s tick. Follows the STM
    /// numbering, so core id 6 is served as CPU5.
    fn type_of_service(core: CoreId) -> PortResult<TypeOfService> {
        Ok(match Self::stm_index(core)? {
            0 => TypeOfService::Cpu0,
            1 => TypeOfService::Cpu1,
            2 => TypeOfService::Cpu2,
            3 => TypeOfService::Cpu3,
            4 => TypeOfService::Cpu4,
            5 => TypeOfService::Cpu5,
            _ => anyhow::bail!(PortError::InvalidCore(core)),
        })
    }
}
