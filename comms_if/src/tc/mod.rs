//! # Telecommand module
//!
//! This module provides telecommand functionality to the communications
//! interface. Telecommands are the instructions the teleoperation daemon
//! relays from the remote operator.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod drive;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Serialize, Deserialize};
use thiserror::Error;

// Internal
pub use drive::DriveCmd;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// A telecommand, i.e. an instruction sent to the wheelchair by the remote
/// operator.
///
/// Serialised as `{"type": "DRIVE", "payload": {...}}`, commands without a
/// payload omit the `payload` field.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload")]
pub enum Tc {
    /// Keep-alive from the operator. Carries no command.
    #[serde(rename = "HEARTBEAT")]
    Heartbeat,

    /// A normalised drive command with the time it was issued.
    #[serde(rename = "DRIVE")]
    Drive(DriveCmd),

    /// Request an emergency stop.
    #[serde(rename = "ESTOP")]
    EStop,

    /// Request the emergency stop to be cleared.
    #[serde(rename = "RESET")]
    Reset,
}

/// Response to a telecommand.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub enum TcResponse {
    /// The TC was accepted and executed.
    Ok,

    /// The TC was valid but cannot be executed in the current state (for
    /// example a reset while a stop condition is still present).
    CannotExecute,

    /// The TC was invalid.
    Invalid,
}

/// Possible parsing errors.
#[derive(Debug, Error)]
pub enum TcParseError {
    #[error("TC contains invalid JSON: {0}")]
    InvalidJson(serde_json::Error),

    #[error("TC contains an invalid drive command: {0}")]
    InvalidDriveCmd(String),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Tc {

    /// Parse a new TC from a JSON packet
    pub fn from_json(json_str: &str) -> Result<Self, TcParseError> {
        let tc: Tc = serde_json::from_str(json_str)
            .map_err(TcParseError::InvalidJson)?;

        if let Tc::Drive(ref d) = tc {
            d.validate().map_err(TcParseError::InvalidDriveCmd)?;
        }

        Ok(tc)
    }

    /// Serialise the TC into a JSON packet
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
