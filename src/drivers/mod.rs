//! Device drivers module.
//!
//! Only the System Timer (STM) is driven by the port: it generates the
//! per-core kernel tick.

pub mod timer;
