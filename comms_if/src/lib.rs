//! # Communications interface crate.
//!
//! Provides the interface types shared between the wheelchair executable and
//! its external collaborators: the teleoperation daemon, the state broadcast
//! service and hardware/test signal bridges. Transport is the collaborators'
//! concern, this crate only defines what goes over it.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Telecommands sent by the teleoperation daemon
pub mod tc;

/// Raw controller signal definitions for equipment (joystick hardware)
pub mod eqpt;

/// Telemetry broadcast each cycle
pub mod tm;
