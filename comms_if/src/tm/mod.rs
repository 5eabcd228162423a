//! # Telemetry module
//!
//! Defines the snapshot of wheelchair state offered to observers every cycle. The field names,
//! units and ranges are a stable contract with the visualisation and transport services.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Serialize, Deserialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Snapshot of the wheelchair state at the end of a cycle.
#[derive(Debug, Copy, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct WheelchairTm {
    /// Units: meters
    pub x: f64,

    /// Units: meters
    pub y: f64,

    /// Heading in (-pi, pi].
    ///
    /// Units: radians
    pub theta: f64,

    /// Units: meters/second
    pub linear_velocity: f64,

    /// Units: radians/second
    pub angular_velocity: f64,

    /// Normalised to [-1, 1]
    pub left_motor_speed: f64,

    /// Normalised to [-1, 1]
    pub right_motor_speed: f64,

    /// Units: volts
    pub battery_voltage: f64,

    /// State of charge in [0, 100].
    pub battery_percent: f64,

    /// True while the safety monitor holds the chair stopped.
    pub emergency_stop: bool,

    /// True while the deadman timeout is exceeded.
    pub deadman_active: bool,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_field_names() {
        let json = serde_json::to_value(WheelchairTm::default()).unwrap();
        let obj = json.as_object().unwrap();

        for key in [
            "x", "y", "theta", "linear_velocity", "angular_velocity", "left_motor_speed",
            "right_motor_speed", "battery_voltage", "battery_percent", "emergency_stop",
            "deadman_active"
        ].iter() {
            assert!(obj.contains_key(*key), "missing {}", key);
        }
        assert_eq!(obj.len(), 11);
    }
}
