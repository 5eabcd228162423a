//! # Scenario presets
//!
//! Named operating environments and the wear of an aged chair, expressed through the parameters
//! and the sensor suite's setters.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::info;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::params::{Params, ParamsError};
use crate::sensors::{Direction, SensorSuite};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Motor efficiency of a worn chair relative to a new one.
const WORN_MOTOR_EFFICIENCY: f64 = 0.9;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Operating environment of the chair.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scenario {
    /// Indoors, clear sensors.
    Default,

    /// Built up streets, slightly reduced sensor visibility.
    Urban,

    /// Open ground in light rain.
    Outdoor,

    /// Test track with a fixed obstacle ahead.
    Testing,

    /// Heavy rain, poor visibility.
    Extreme,
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Wear of an aged chair.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Degradation {
    /// Motor wear, 1 for new motors. Scales the speed and acceleration limits.
    pub wear_factor: f64,

    /// Battery health, 1 for a new pack. Scales the usable capacity.
    pub battery_health: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Scenario {
    /// Visibility factor of the proximity sensors.
    pub fn visibility(&self) -> f64 {
        match self {
            Scenario::Default | Scenario::Testing => 1.0,
            Scenario::Urban => 0.8,
            Scenario::Outdoor => 0.9,
            Scenario::Extreme => 0.5,
        }
    }

    /// Fixed obstacles the scenario places around the chair.
    ///
    /// Units: meters
    pub fn obstacles(&self) -> Vec<(Direction, f64)> {
        match self {
            Scenario::Testing => vec![(Direction::Front, 2.0)],
            _ => Vec::new(),
        }
    }

    /// Configure a sensor suite for the scenario.
    pub fn apply(&self, sensors: &mut dyn SensorSuite) {
        info!("Applying the {:?} scenario", self);

        sensors.set_visibility(self.visibility());
        sensors.clear_virtual_obstacles();
        for (d, dist) in self.obstacles() {
            sensors.set_virtual_obstacle(d, Some(dist));
        }
    }
}

impl Default for Scenario {
    fn default() -> Self {
        Scenario::Default
    }
}

impl FromStr for Scenario {
    type Err = ParamsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "default" => Ok(Scenario::Default),
            "urban" => Ok(Scenario::Urban),
            "outdoor" => Ok(Scenario::Outdoor),
            "testing" => Ok(Scenario::Testing),
            "extreme" => Ok(Scenario::Extreme),
            _ => Err(ParamsError::UnknownScenario(s.to_string())),
        }
    }
}

impl Degradation {
    pub fn new(wear_factor: f64, battery_health: f64) -> Result<Self, ParamsError> {
        let d = Self {
            wear_factor,
            battery_health,
        };
        d.is_valid()?;
        Ok(d)
    }

    /// Both factors must be in (0, 1].
    pub fn is_valid(&self) -> Result<(), ParamsError> {
        factor("wear_factor", self.wear_factor)?;
        factor("battery_health", self.battery_health)
    }

    /// Derate the parameters of a new chair.
    ///
    /// Worn motors are slower, accelerate less and draw more power for the same speed.
    pub fn apply(&self, params: &mut Params) {
        info!(
            "Degrading the chair, wear {:.2}, battery health {:.2}",
            self.wear_factor, self.battery_health
        );

        params.max_velocity *= self.wear_factor;
        params.max_acceleration *= self.wear_factor;
        params.power.capacity_wh *= self.battery_health;

        if self.wear_factor < 1.0 {
            params.power.motor_power_coeff_w /= WORN_MOTOR_EFFICIENCY;
        }
    }
}

impl Default for Degradation {
    /// A chair that has seen a few years of use.
    fn default() -> Self {
        Self {
            wear_factor: 0.8,
            battery_health: 0.9,
        }
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn factor(name: &'static str, value: f64) -> Result<(), ParamsError> {
    if value > 0.0 && value <= 1.0 {
        Ok(())
    }
    else {
        Err(ParamsError::NotAFactor(name, value))
    }
}
