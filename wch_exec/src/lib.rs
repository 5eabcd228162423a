//! # Wheelchair Simulation Library
//!
//! Simulation core of a powered wheelchair converted for teleoperation. Each module provides one
//! of the components ticked by the [`sim_loop::SimLoop`]:
//!
//! - `ctrl_family` - emulation of the commercial controller families' signal processing
//! - `controller` - sources of drive commands (scripted or interactive)
//! - `drive` - differential drive kinematics
//! - `sensors` - noisy IMU and proximity readings
//! - `power` - battery discharge
//! - `safety` - the deadman/obstacle/e-stop interlock
//! - `scenario` - environment presets and the wear of an aged chair
//!
//! Every component sits behind a trait so that a hardware backed implementation can be swapped in
//! without changing the loop.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod controller;
pub mod ctrl_family;
pub mod data_store;
pub mod drive;
pub mod params;
pub mod power;
pub mod safety;
pub mod scenario;
pub mod sensors;
pub mod sim_loop;

mod tc_processor;
