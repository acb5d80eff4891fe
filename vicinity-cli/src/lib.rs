//! Support library for the `vicinity` binary.
//!
//! Exposes the command pipeline so tests and doctests can drive it without
//! spawning a process.

pub mod cli;
pub mod logging;
