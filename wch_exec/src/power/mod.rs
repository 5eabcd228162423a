//! # Power module
//!
//! Models the depletion of the battery as the motors draw power.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod discharge;
mod sim_power;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
pub use discharge::*;
pub use sim_power::*;

use crate::drive::MotorSpeeds;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A battery powering the drive.
pub trait PowerSystem {
    /// Draw power for `dt_s` seconds with the motors at the given speeds, and return the
    /// resulting condition.
    fn update(&mut self, dt_s: f64, motor_speeds: MotorSpeeds) -> PowerCondition;

    fn state(&self) -> BatteryState;

    fn condition(&self) -> PowerCondition;
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Snapshot of the battery.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatteryState {
    /// Units: volts
    pub voltage: f64,

    /// State of charge in [0, 100].
    pub percent: f64,

    /// Units: watt-hours
    pub capacity_remaining_wh: f64,

    /// Power drawn during the last update.
    ///
    /// Units: watts
    pub power_w: f64,

    /// Current drawn during the last update.
    ///
    /// Units: amps
    pub current_a: f64,

    pub low: bool,
    pub critical: bool,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Condition of the battery, from best to worst.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub enum PowerCondition {
    Nominal,
    Low,
    Critical,
    Depleted,
}
