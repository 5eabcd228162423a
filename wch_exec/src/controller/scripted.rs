//! Scripted controller

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::path::Path;

// Internal
use comms_if::eqpt::RawSignal;
use util::script_interpreter::{ScriptInterpreter, TimedEntry};
use crate::ctrl_family::{ControllerFamily, ControllerInput, NormalizedCommand, SignalProcessor};
use super::{Controller, ControllerError};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Tolerance on entry times, absorbs the rounding of an accumulated tick clock.
const ENTRY_TIME_TOLERANCE_S: f64 = 1e-9;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// One scripted input, either a direct command or a raw signal for the configured family.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptItem {
    Cmd(NormalizedCommand),
    Signal(RawSignal),
}

/// Controller replaying a timed script.
///
/// Entries are never consumed, so a script can be rewound and replayed. Each read returns the
/// latest entry at or before the controller's virtual clock, which starts at the first read after
/// connecting or rewinding. An entry counts as a command when it becomes active, so the deadman
/// trips once the last entry has been held for the timeout.
#[derive(Debug, Clone)]
pub struct ScriptedController {
    processor: Option<SignalProcessor>,
    entries: Vec<TimedEntry<ScriptItem>>,
    connected: bool,
    clock_start_s: Option<f64>,
    clock_s: f64,
    active_entry: Option<usize>,
    last_command_time_s: Option<f64>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ScriptedController {
    /// Load a scripted controller from a script file.
    pub fn new<P: AsRef<Path>>(
        script_path: P,
        family: Option<ControllerFamily>,
    ) -> Result<Self, ControllerError> {
        let si: ScriptInterpreter<ScriptItem> = ScriptInterpreter::new(script_path)?;
        Self::from_entries(si.into_entries(), family)
    }

    /// Load a scripted controller from the text of a script.
    pub fn from_script_str(
        script: &str,
        family: Option<ControllerFamily>,
    ) -> Result<Self, ControllerError> {
        let si: ScriptInterpreter<ScriptItem> = ScriptInterpreter::from_script_str(script)?;
        Self::from_entries(si.into_entries(), family)
    }

    /// Build a scripted controller from entries.
    ///
    /// Raw signal entries are checked against the family, so a script written for the wrong
    /// family is rejected here rather than at run time.
    pub fn from_entries(
        mut entries: Vec<TimedEntry<ScriptItem>>,
        family: Option<ControllerFamily>,
    ) -> Result<Self, ControllerError> {
        let processor = family.map(SignalProcessor::new);

        for entry in entries.iter() {
            if let ScriptItem::Signal(ref s) = entry.payload {
                match processor {
                    Some(ref p) => p.check(s)?,
                    None => return Err(ControllerError::NoFamily),
                }
            }
        }

        entries.sort_by(|a, b| a.exec_time_s
            .partial_cmp(&b.exec_time_s)
            .unwrap_or(std::cmp::Ordering::Equal));

        Ok(Self {
            processor,
            entries,
            connected: false,
            clock_start_s: None,
            clock_s: 0.0,
            active_entry: None,
            last_command_time_s: None,
        })
    }

    /// Rewind the virtual clock to the start of the script.
    pub fn reset_script(&mut self) {
        debug!("Script rewound");
        self.clock_start_s = None;
        self.clock_s = 0.0;
        self.active_entry = None;
        self.last_command_time_s = None;
    }

    /// Remove every entry from the script.
    pub fn clear_script(&mut self) {
        self.entries.clear();
        self.reset_script();
    }

    /// Time of the last entry in the script.
    pub fn get_duration(&self) -> f64 {
        self.entries.last().map_or(0.0, |e| e.exec_time_s)
    }

    pub fn get_num_entries(&self) -> usize {
        self.entries.len()
    }

    /// Current value of the virtual clock.
    pub fn virtual_time_s(&self) -> f64 {
        self.clock_s
    }

    /// Index of the latest entry at or before the virtual clock.
    fn current_entry(&self) -> Option<usize> {
        let clock = self.clock_s + ENTRY_TIME_TOLERANCE_S;
        match self.entries.partition_point(|e| e.exec_time_s <= clock) {
            0 => None,
            n => Some(n - 1),
        }
    }
}

impl Controller for ScriptedController {
    fn connect(&mut self) -> Result<(), ControllerError> {
        if !self.connected {
            info!(
                "Scripted controller connected, {} entries lasting {:.02} s",
                self.get_num_entries(),
                self.get_duration()
            );
            self.connected = true;
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn read_input(&mut self, now_s: f64) -> Result<ControllerInput, ControllerError> {
        if !self.connected {
            return Err(ControllerError::NotConnected);
        }

        let start = *self.clock_start_s.get_or_insert(now_s);
        self.clock_s = now_s - start;

        let idx = match self.current_entry() {
            Some(i) => i,
            None => return Ok(ControllerInput::default()),
        };
        let item = self.entries[idx].payload;

        if self.active_entry != Some(idx) {
            self.active_entry = Some(idx);
            self.last_command_time_s = Some(now_s);
        }

        match item {
            ScriptItem::Cmd(c) => Ok(ControllerInput::from_command(NormalizedCommand::new(
                c.linear, c.angular,
            ))),
            ScriptItem::Signal(s) => match self.processor {
                Some(ref p) => Ok(p.process(&s)?),
                None => Err(ControllerError::NoFamily),
            },
        }
    }

    fn disconnect(&mut self) {
        if self.connected {
            info!("Scripted controller disconnected");
        }
        self.connected = false;
        self.reset_script();
    }

    fn last_command_time_s(&self) -> Option<f64> {
        self.last_command_time_s
    }
}
