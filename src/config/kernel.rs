//! Kernel configuration constants.

/// Highest TriCore `CORE_ID` value (TC39x numbers its sixth core 6).
pub const MAX_CORE_ID: usize = 6;

/// Tick period.
pub const TIMER_INT_TIME_MS: u64 = 1;

/// Interrupts at or below this priority may call kernel APIs.
pub const MAX_SYSCALL_INTERRUPT_PRIORITY: u32 = 64;
/// Priority of the per-core STM tick interrupt.
pub const ISR_PRIORITY_STM: u8 = 40;

/// Time slice of the reference scheduler, in ticks.
pub const DEFAULT_TIME_SLICE_TICKS: u64 = 10;

/// Stack depths in words.
pub const MINIMAL_STACK_SIZE: usize = 256;
pub const TIMER_TASK_STACK_DEPTH: usize = 512;

/// Trap identifier of the yield system call.
pub const SYSCALL_TASK_YIELD: u32 = 0;

/// Supervisor mode, MPU register set 0, call depth counting disabled.
pub const SYSTEM_PROGRAM_STATUS_WORD: u32 = 0x0000_08FF;
/// Link word of a fresh lower context: UL and PIE set, the low 20 bits carry
/// the upper CSA.
pub const INITIAL_PCXI_UPPER_CONTEXT_WORD: u32 = 0x0030_0000;
/// MPU disabled.
pub const INITIAL_SYSCON: u32 = 0x0000_0000;
/// Clearing these PSW bits lets `rfe` run outside a genuine exception.
pub const RESTORE_PSW_MASK: u32 = !0x0000_00FF;
