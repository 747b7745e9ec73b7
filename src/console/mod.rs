//! Console module - Print and logging facilities.
//!
//! Output goes to a sink installed once at start-up: a UART writer on
//! silicon, stdout in the host simulator.

#[macro_use]
pub mod print;

pub mod logger;

pub use logger::init as init_logger;
pub use print::set_output;
