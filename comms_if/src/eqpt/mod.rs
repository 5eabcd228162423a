//! # Equipment Interface
//!
//! This module defines the raw signal structures produced by wheelchair controller hardware (or
//! by a bridge emulating it) and injected into the executable.

// -----------------------------------------------------------------------------------------------
// MODULES
// -----------------------------------------------------------------------------------------------

pub mod signal;

pub use signal::*;
