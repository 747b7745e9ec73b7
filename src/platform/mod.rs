//! Platform module - Board-specific configuration and support.
//!
//! This module provides abstractions for different hardware platforms,
//! allowing the port to run on silicon or in the host simulator.

pub mod board;
#[cfg(any(test, feature = "sim"))]
pub mod sim;
pub mod tc39x;

pub use board::Board;

