//! # Controller module
//!
//! Controllers are the sources of drive commands. Every controller implements the [`Controller`]
//! trait so that the simulation loop does not care whether commands come from a script, an
//! interactive bridge or real hardware.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod interactive;
mod scripted;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use thiserror::Error;

// Internal
use crate::ctrl_family::{ControllerInput, SignalError};
use util::script_interpreter::ScriptError;
pub use interactive::*;
pub use scripted::*;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A source of drive commands.
pub trait Controller {
    /// Connect to the controller. Connecting an already connected controller does nothing.
    fn connect(&mut self) -> Result<(), ControllerError>;

    /// True if the controller is connected.
    fn is_connected(&self) -> bool;

    /// Read the current input from the controller.
    ///
    /// `now_s` is the simulation time of the read. Fails with [`ControllerError::NotConnected`]
    /// if [`Controller::connect`] has not been called.
    fn read_input(&mut self, now_s: f64) -> Result<ControllerInput, ControllerError>;

    /// Disconnect from the controller.
    fn disconnect(&mut self);

    /// Simulation time at which the last command was received, or `None` if no command has been
    /// received yet.
    fn last_command_time_s(&self) -> Option<f64>;
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors raised by a controller.
#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("The controller was read before it was connected")]
    NotConnected,

    #[error("Signal error: {0}")]
    Signal(#[from] SignalError),

    #[error("A raw signal was provided but no controller family is configured")]
    NoFamily,

    #[error("Could not load the controller script: {0}")]
    Script(#[from] ScriptError),

    #[error("The controller state lock was poisoned")]
    Poisoned,
}
