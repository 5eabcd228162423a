//! # Safety module
//!
//! The safety monitor enforces the deadman timeout, the obstacle stop distance, explicit
//! emergency stop requests and battery depletion by holding the drive stopped.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod alert;
mod monitor;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
pub use alert::*;
pub use monitor::*;

use crate::ctrl_family::NormalizedCommand;
use crate::drive::Drive;
use crate::power::PowerCondition;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A monitor able to override commands and stop the drive.
pub trait SafetyMonitor {
    /// Evaluate the safety conditions and return the command the drive may execute.
    ///
    /// On entering the stopped state the drive is stopped immediately. While stopped the
    /// returned command is always zero.
    fn evaluate(
        &mut self,
        inputs: &SafetyInputs,
        cmd: NormalizedCommand,
        drive: &mut dyn Drive,
    ) -> NormalizedCommand;

    /// Request an emergency stop, applied at the next evaluation.
    fn request_estop(&mut self);

    /// Request the stop to be cleared. Rejected while any stop condition is still active.
    fn request_reset(&mut self, now_s: f64) -> ResetOutcome;

    fn state(&self) -> SafetyState;

    /// True while the deadman timeout is exceeded.
    fn deadman_active(&self) -> bool;

    /// Causes of the current stop, empty in the normal state.
    fn trip_causes(&self) -> &[TripCause];

    fn alerts(&self) -> &AlertLog;
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Everything the monitor needs for one evaluation.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SafetyInputs {
    /// Units: seconds
    pub now_s: f64,

    /// Time of the last command, `None` if no command was received since the start.
    ///
    /// Units: seconds
    pub last_command_time_s: Option<f64>,

    /// Shortest proximity reading.
    ///
    /// Units: meters
    pub min_proximity_m: f64,

    pub power: PowerCondition,

    /// The hardware emergency stop is pressed.
    pub hardware_estop: bool,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub enum SafetyState {
    Normal,
    Estopped,
}

/// Reasons for the monitor to stop the drive.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum TripCause {
    Deadman,
    Obstacle,
    EStopRequest,
    Depleted,
}

/// Result of a reset request.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum ResetOutcome {
    /// The monitor returned to the normal state.
    Reset,

    /// The monitor was not stopped.
    AlreadyNormal,

    /// The listed conditions are still active.
    Rejected(Vec<TripCause>),
}

impl TripCause {
    /// Alert level raised when this cause trips the monitor.
    pub fn level(&self) -> AlertLevel {
        match self {
            TripCause::Deadman | TripCause::Obstacle => AlertLevel::Warning,
            TripCause::EStopRequest | TripCause::Depleted => AlertLevel::Critical,
        }
    }
}
