//! Port configuration.

pub mod kernel;

pub use kernel::*;
