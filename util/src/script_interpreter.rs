//! # Timed script interpreter module
//!
//! This module provides an interpreter for timed scripts. A script is a text
//! file in which each entry has the form
//!
//! ```text
//! <time_s>: <json payload>;
//! ```
//!
//! Anything not matching that pattern (comments, blank lines) is ignored. The
//! payload type is chosen by the caller, so the same format carries direct
//! drive commands, raw controller signals or telecommands.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use std::fs;
use std::path::{Path, PathBuf};
use regex::RegexBuilder;
use serde::de::DeserializeOwned;
use thiserror::Error;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A payload which is scripted to occur at a specific time.
#[derive(Debug, Clone, PartialEq)]
pub struct TimedEntry<T> {
    /// The time the entry becomes active at
    pub exec_time_s: f64,

    /// The scripted payload
    pub payload: T
}

/// A script interpreter.
///
/// Entries are held sorted by execution time. Entries with equal times keep
/// their order in the script.
#[derive(Debug, Clone)]
pub struct ScriptInterpreter<T> {
    script_path: Option<PathBuf>,
    entries: Vec<TimedEntry<T>>
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("Could not find the script at {0}")]
    ScriptNotFound(String),

    #[error("Could not load the script: {0}")]
    ScriptLoadError(std::io::Error),

    #[error("The script is empty (or is so bad it can't be read)")]
    ScriptEmpty,

    #[error(
        "Script contains an invalid timestamp: {0}. \
        Should be a float (like 1.0)")]
    InvalidTimestamp(String),

    #[error("Script contains an invalid payload at {0} s: {1}")]
    InvalidPayload(f64, serde_json::Error)
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<T> ScriptInterpreter<T>
where
    T: DeserializeOwned
{
    /// Create a new interpreter from the given script path.
    pub fn new<P: AsRef<Path>>(script_path: P) -> Result<Self, ScriptError> {

        let path = PathBuf::from(script_path.as_ref());

        if !path.exists() {
            return Err(
                ScriptError::ScriptNotFound(path.display().to_string()));
        }

        let script = fs::read_to_string(&path)
            .map_err(ScriptError::ScriptLoadError)?;

        let mut si = Self::from_script_str(&script)?;
        si.script_path = Some(path);

        Ok(si)
    }

    /// Create a new interpreter from the text of a script.
    pub fn from_script_str(script: &str) -> Result<Self, ScriptError> {

        let mut entries: Vec<TimedEntry<T>> = Vec::new();

        // Go through the script executing __the magic regex__.
        let re = RegexBuilder::
            new(r"^\s*(\d+(\.\d+)?)\s*:\s*([^;]*);")
            .multi_line(true)
            .build()
            .expect("script regex is valid");

        for cap in re.captures_iter(script) {
            // Both groups always participate in a match
            let time_str = cap.get(1).map_or("", |m| m.as_str());
            let payload_str = cap.get(3).map_or("", |m| m.as_str());

            let exec_time_s: f64 = time_str
                .parse()
                .map_err(|e| ScriptError::InvalidTimestamp(format!("{}", e)))?;

            let payload: T = serde_json::from_str(payload_str)
                .map_err(|e| ScriptError::InvalidPayload(exec_time_s, e))?;

            entries.push(TimedEntry {
                exec_time_s,
                payload
            });
        }

        if entries.is_empty() {
            return Err(ScriptError::ScriptEmpty)
        }

        // Stable sort keeps equal-time entries in script order
        entries.sort_by(|a, b| a.exec_time_s
            .partial_cmp(&b.exec_time_s)
            .unwrap_or(std::cmp::Ordering::Equal));

        Ok(ScriptInterpreter {
            script_path: None,
            entries
        })
    }
}

impl<T> ScriptInterpreter<T> {

    /// Path the script was loaded from, if it came from a file.
    pub fn script_path(&self) -> Option<&Path> {
        self.script_path.as_deref()
    }

    /// Borrow the entries of the script.
    pub fn entries(&self) -> &[TimedEntry<T>] {
        &self.entries
    }

    /// Consume the interpreter, returning the entries of the script.
    pub fn into_entries(self) -> Vec<TimedEntry<T>> {
        self.entries
    }

    /// Get the number of entries in the script
    pub fn get_num_entries(&self) -> usize {
        self.entries.len()
    }

    /// Get the length of the script in seconds
    pub fn get_duration(&self) -> f64 {
        match self.entries.last() {
            Some(c) => c.exec_time_s,
            None => 0f64
        }
    }
}
