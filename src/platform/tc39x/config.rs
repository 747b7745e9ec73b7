//! TC39x memory map used by the port.

/// STM0 register block; STMn follows at `n * STM_STRIDE`.
pub const STM0_BASE: usize = 0xF000_1000;
pub const STM_STRIDE: usize = 0x100;

/// `SRC_STM0SR0`; each STM has two service request nodes.
pub const SRC_STM0_SR0: usize = 0xF003_8300;
pub const SRC_STM_STRIDE: usize = 0x8;

/// fSTM after the default clock set-up.
pub const STM_FREQUENCY: u32 = 100_000_000;

/// Local data scratchpad RAM of each core id.
pub const DSPR_BASE: [u32; 7] = [
    0x7000_0000,
    0x6000_0000,
    0x5000_0000,
    0x4000_0000,
    0x3000_0000,
    0,
    0x1000_0000,
];

/// Offset of the CSA pool inside a core's DSPR.
pub const CSA_DSPR_OFFSET: u32 = 0x0001_0000;
pub const CSA_COUNT: usize = 256;

/// LMU RAM.
pub const STATIC_STACK_BASE: u32 = 0x9000_0000;
