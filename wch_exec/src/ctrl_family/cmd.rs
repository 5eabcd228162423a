//! Commands produced by the controller families

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use util::maths::clamp;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A normalised drive command, the only form of command accepted by the drive.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedCommand {
    /// Forward/backward demand in [-1, 1].
    pub linear: f64,

    /// Turn demand in [-1, 1]. Positive turns left.
    pub angular: f64,
}

/// Everything decoded from one read of a controller.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct ControllerInput {
    /// The normalised command.
    pub command: NormalizedCommand,

    /// The hardware emergency stop was pressed.
    pub emergency_stop: bool,

    /// The enable (deadman) line was held.
    pub enable: bool,

    /// The mode button was pressed.
    pub mode_switch: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl NormalizedCommand {
    /// Create a new command, clamping both axes into [-1, 1].
    ///
    /// Non-finite values are treated as zero.
    pub fn new(linear: f64, angular: f64) -> Self {
        let sanitise = |v: f64| if v.is_finite() { clamp(v, -1.0, 1.0) } else { 0.0 };

        Self {
            linear: sanitise(linear),
            angular: sanitise(angular),
        }
    }

    /// The stop command.
    pub fn zero() -> Self {
        Self::default()
    }

    /// True if both axes are zero.
    pub fn is_zero(&self) -> bool {
        self.linear == 0.0 && self.angular == 0.0
    }
}

impl ControllerInput {
    /// Input carrying a direct command, with the enable line held.
    pub fn from_command(command: NormalizedCommand) -> Self {
        Self {
            command,
            emergency_stop: false,
            enable: true,
            mode_switch: false,
        }
    }
}
