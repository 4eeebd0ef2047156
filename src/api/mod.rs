//! API Module
//!
//! Command surface used by the dashboard shell and the binary.

pub mod commands;

pub use commands::*;
