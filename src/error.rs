//! Unified error types for the port layer.
//!
//! Bring-up and configuration paths return [`PortResult<T>`], an alias for
//! `anyhow::Result<T>`. The context-switch paths never return errors: CSA
//! depletion raises the hardware trap and protocol misuse is a fatal
//! assertion, because nothing above this layer can repair a broken call
//! chain.
//!
//! ## Usage Examples
//!
//! ```ignore
//! anyhow::bail!(PortError::InvalidCore(5));
//! anyhow::ensure!(period != 0, PortError::InvalidTickPeriod);
//! ```

use core::fmt;

/// Result type alias using anyhow::Error.
pub type PortResult<T> = anyhow::Result<T>;

/// Recoverable errors raised while bringing a core up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortError {
    /// The logger was already installed.
    LoggerInitFailed,
    /// The console output was already set.
    ConsoleAlreadySet,
    /// The core id does not name a CPU on this device.
    InvalidCore(usize),
    /// The CSA area is misaligned, empty, or does not fit one segment.
    InvalidCsaArea { base: u32, count: usize },
    /// The scheduler was already started on this core.
    AlreadyStarted(usize),
    /// The first task handed to the scheduler has no saved context.
    NoInitialContext(usize),
    /// The STM frequency and tick rate give a zero-tick period.
    InvalidTickPeriod,
}

impl fmt::Display for PortError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LoggerInitFailed => write!(f, "logger already initialized"),
            Self::ConsoleAlreadySet => write!(f, "console output already set"),
            Self::InvalidCore(id) => write!(f, "core id {id} does not exist"),
            Self::InvalidCsaArea { base, count } => {
                write!(f, "invalid CSA area: base={base:#010x}, count={count}")
            }
            Self::AlreadyStarted(id) => write!(f, "scheduler already running on core {id}"),
            Self::NoInitialContext(id) => write!(f, "task {id} has no saved context"),
            Self::InvalidTickPeriod => write!(f, "tick period rounds to zero timer ticks"),
        }
    }
}

impl core::error::Error for PortError {}
