//! # Drive module
//!
//! Kinematic model of the wheelchair's drive. The simulation uses [`DiffDrive`], a hardware
//! backed drive implements the same [`Drive`] trait.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod diff_drive;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
pub use diff_drive::*;

use crate::ctrl_family::NormalizedCommand;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A drive accepting normalised commands.
pub trait Drive {
    /// Set the commanded motion. The command is reached at the rate allowed by the acceleration
    /// limit over the following updates.
    fn set_command(&mut self, cmd: NormalizedCommand);

    /// Advance the drive by `dt_s` seconds.
    fn update(&mut self, dt_s: f64);

    /// Stop both wheels immediately, ignoring the acceleration limit.
    fn emergency_stop(&mut self);

    fn pose(&self) -> Pose;

    /// Body velocity of the chair.
    fn velocity(&self) -> BodyVelocity;

    /// Wheel speeds normalised to [-1, 1] by the maximum velocity.
    fn motor_speeds(&self) -> MotorSpeeds;

    /// Wheel speeds in meters/second.
    fn wheel_speeds(&self) -> WheelSpeeds;

    /// Move the chair to the given pose, at rest.
    fn reset_pose(&mut self, pose: Pose);
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Pose of the chair in the world frame.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// Units: meters
    pub x: f64,

    /// Units: meters
    pub y: f64,

    /// Heading in (-pi, pi], zero along the X axis.
    ///
    /// Units: radians
    pub theta: f64,
}

/// Velocity of the chair's body.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BodyVelocity {
    /// Units: meters/second
    pub linear: f64,

    /// Units: radians/second
    pub angular: f64,
}

/// Per-wheel speed in meters/second.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WheelSpeeds {
    pub left: f64,
    pub right: f64,
}

/// Per-wheel speed normalised to [-1, 1].
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MotorSpeeds {
    pub left: f64,
    pub right: f64,
}

impl Pose {
    pub fn new(x: f64, y: f64, theta: f64) -> Self {
        Self {
            x,
            y,
            theta: util::maths::wrap_pi(theta),
        }
    }
}
