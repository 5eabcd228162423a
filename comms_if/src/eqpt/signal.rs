//! # Raw controller signals

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Signals read from an analog joystick controller.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq)]
pub struct AnalogSignal {
    /// Voltage on the X (turn) axis.
    ///
    /// Units: volts
    pub axis_x_voltage: f64,

    /// Voltage on the Y (forward/backward) axis.
    ///
    /// Units: volts
    pub axis_y_voltage: f64,

    /// State of the enable (deadman) line. The joystick output is ignored unless this is high.
    pub enable_line: bool,

    /// Voltage of the speed potentiometer, only present on controllers fitted with one.
    ///
    /// Units: volts
    #[serde(default)]
    pub speed_pot_voltage: Option<f64>,

    /// State of the hardware emergency stop button.
    #[serde(default)]
    pub emergency_stop: bool,

    /// State of the mode selection button.
    #[serde(default)]
    pub mode_button: bool,
}

/// Frame decoded from a digital bus controller.
///
/// The axes are already normalised by the controller, so no voltage conversion is needed.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq)]
pub struct BusSignal {
    /// Forward/backward axis in the range [-1, 1].
    pub linear_axis: f64,

    /// Turning axis in the range [-1, 1]. Positive turns left.
    pub angular_axis: f64,

    /// Enable (deadman) flag.
    pub enable: bool,

    /// Emergency stop flag.
    #[serde(default)]
    pub emergency_stop: bool,

    /// Selected drive profile (0 = slowest, 3 = fastest), if the controller reports one.
    #[serde(default)]
    pub drive_profile: Option<u8>,

    /// State of the mode selection button.
    #[serde(default)]
    pub mode_button: bool,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// A raw signal from any controller family.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum RawSignal {
    Analog(AnalogSignal),
    Bus(BusSignal),
}

/// The kind of a raw signal, used when reporting mismatches.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq)]
pub enum SignalKind {
    Analog,
    Bus,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl AnalogSignal {
    /// Create a new analog signal with no speed pot and all buttons released.
    pub fn new(axis_x_voltage: f64, axis_y_voltage: f64, enable_line: bool) -> Self {
        Self {
            axis_x_voltage,
            axis_y_voltage,
            enable_line,
            speed_pot_voltage: None,
            emergency_stop: false,
            mode_button: false,
        }
    }

    /// Set the speed potentiometer voltage.
    pub fn with_speed_pot(mut self, speed_pot_voltage: f64) -> Self {
        self.speed_pot_voltage = Some(speed_pot_voltage);
        self
    }
}

impl BusSignal {
    /// Create a new bus frame with no drive profile and e-stop released.
    pub fn new(linear_axis: f64, angular_axis: f64, enable: bool) -> Self {
        Self {
            linear_axis,
            angular_axis,
            enable,
            emergency_stop: false,
            drive_profile: None,
            mode_button: false,
        }
    }

    /// Set the drive profile.
    pub fn with_profile(mut self, drive_profile: u8) -> Self {
        self.drive_profile = Some(drive_profile);
        self
    }
}

impl RawSignal {
    /// Get the kind of this signal.
    pub fn kind(&self) -> SignalKind {
        match self {
            RawSignal::Analog(_) => SignalKind::Analog,
            RawSignal::Bus(_) => SignalKind::Bus,
        }
    }
}

impl From<AnalogSignal> for RawSignal {
    fn from(s: AnalogSignal) -> Self {
        RawSignal::Analog(s)
    }
}

impl From<BusSignal> for RawSignal {
    fn from(s: BusSignal) -> Self {
        RawSignal::Bus(s)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_json_defaults() {
        let s: RawSignal = serde_json::from_str(
            r#"{"analog": {"axis_x_voltage": 2.5, "axis_y_voltage": 4.0, "enable_line": true}}"#
        ).unwrap();

        assert_eq!(s, RawSignal::Analog(AnalogSignal::new(2.5, 4.0, true)));
        assert_eq!(s.kind(), SignalKind::Analog);

        let b: RawSignal = serde_json::from_str(
            r#"{"bus": {"linear_axis": 1.0, "angular_axis": 0.0, "enable": true, "drive_profile": 2}}"#
        ).unwrap();

        assert_eq!(b, RawSignal::Bus(BusSignal::new(1.0, 0.0, true).with_profile(2)));
    }
}
