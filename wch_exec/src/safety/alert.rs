//! Safety alerts

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Record of a safety transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafetyAlert {
    pub level: AlertLevel,
    pub message: String,

    /// Simulation time the alert was raised at.
    ///
    /// Units: seconds
    pub timestamp_s: f64,
}

/// Append-only log of alerts holding at most `retention` entries, the oldest are evicted first.
#[derive(Debug, Clone)]
pub struct AlertLog {
    alerts: VecDeque<SafetyAlert>,
    retention: usize,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub enum AlertLevel {
    Info,
    Warning,
    Critical,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl AlertLog {
    pub fn new(retention: usize) -> Self {
        Self {
            alerts: VecDeque::with_capacity(retention.min(1024)),
            retention: retention.max(1),
        }
    }

    pub fn push(&mut self, alert: SafetyAlert) {
        while self.alerts.len() >= self.retention {
            self.alerts.pop_front();
        }
        self.alerts.push_back(alert);
    }

    /// Iterate over the alerts, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &SafetyAlert> {
        self.alerts.iter()
    }

    /// Alerts raised at or after the given time.
    pub fn since(&self, timestamp_s: f64) -> impl Iterator<Item = &SafetyAlert> {
        self.alerts.iter().filter(move |a| a.timestamp_s >= timestamp_s)
    }

    pub fn latest(&self) -> Option<&SafetyAlert> {
        self.alerts.back()
    }

    pub fn len(&self) -> usize {
        self.alerts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alerts.is_empty()
    }
}
