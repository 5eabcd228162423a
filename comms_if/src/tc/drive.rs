//! # Drive telecommands

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Serialize, Deserialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A normalised drive command from the remote operator.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq)]
pub struct DriveCmd {
    /// Forward/backward demand in the range [-1, 1].
    ///
    /// Positive is "forwards", negative is "backwards".
    pub linear: f64,

    /// Turn demand in the range [-1, 1].
    ///
    /// Follows the right hand rule about the chair's Z+ (upwards) axis, so that positive values
    /// turn to the left.
    pub angular: f64,

    /// Time the command was issued, on the simulation clock. Used by the deadman check.
    ///
    /// Units: seconds
    pub timestamp_s: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl DriveCmd {
    /// Check the command is within range.
    pub fn validate(&self) -> Result<(), String> {
        for (name, v) in [("linear", self.linear), ("angular", self.angular)].iter() {
            if !v.is_finite() || v.abs() > 1.0 {
                return Err(format!("{} demand {} is outside [-1, 1]", name, v));
            }
        }

        if !self.timestamp_s.is_finite() {
            return Err(format!("timestamp {} is not finite", self.timestamp_s));
        }

        Ok(())
    }
}
