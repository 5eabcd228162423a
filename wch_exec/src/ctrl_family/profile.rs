//! Electrical profiles of the controller families

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Serialize;
use super::ControllerFamily;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Speed multipliers of the Q-Logic drive profiles, indexed by profile number.
pub const DRIVE_PROFILE_SCALES: [f64; 4] = [0.25, 0.5, 0.75, 1.0];

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// How a family delivers its axes.
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub enum SignalScheme {
    /// Analog joystick, axes are voltages in `[voltage_min, voltage_max]`.
    Analog {
        /// Units: volts
        voltage_min: f64,

        /// Units: volts
        voltage_max: f64,

        /// A speed potentiometer scales the output.
        has_speed_pot: bool,
    },

    /// Digital bus, axes arrive already normalised.
    Bus {
        /// Selectable drive profiles scale the output.
        has_drive_profile: bool,
    },
}

/// Market tier of a family.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize)]
pub enum MarketTier {
    Tier1,
    Tier2,
    Fallback,
}

/// Static description of one controller family's electrical characteristics.
///
/// Profiles are built once and never change.
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct ControllerFamilyProfile {
    pub family: ControllerFamily,

    /// Connector type, informational only.
    pub connector: &'static str,

    /// Fraction of the axis range around center treated as no input.
    pub deadzone_fraction: f64,

    pub scheme: SignalScheme,
}

/// Read-only characteristics of a family, used for diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalCharacteristics {
    pub family: ControllerFamily,
    pub family_name: &'static str,
    pub connector: &'static str,
    pub protocol: &'static str,
    pub deadzone_fraction: f64,

    /// `(min, max)` voltage of the axes, `None` for bus families.
    ///
    /// Units: volts
    pub voltage_range: Option<(f64, f64)>,

    /// Units: volts
    pub center_voltage: Option<f64>,

    pub has_speed_pot: bool,
    pub has_drive_profile: bool,
    pub is_digital_bus: bool,
    pub tier: MarketTier,
    pub features: Vec<&'static str>,
    pub common_models: Vec<&'static str>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ControllerFamilyProfile {
    /// Build the profile of the given family.
    pub fn for_family(family: ControllerFamily) -> Self {
        use ControllerFamily::*;

        let analog = |voltage_max: f64, has_speed_pot: bool| SignalScheme::Analog {
            voltage_min: 0.0,
            voltage_max,
            has_speed_pot,
        };

        let (connector, deadzone_fraction, scheme) = match family {
            Rnet => ("DB9", 0.15, analog(5.0, false)),
            SharkDx => ("4-pin DCI", 0.12, analog(3.3, false)),
            Vr2Pilot => ("4-pin analog", 0.10, analog(5.0, true)),
            LinxDx => (
                "4-pin micro DX Bus",
                0.08,
                SignalScheme::Bus { has_drive_profile: false },
            ),
            Qlogic => ("Digital bus", 0.08, SignalScheme::Bus { has_drive_profile: true }),
            Generic => ("Various", 0.10, analog(5.0, false)),
        };

        Self {
            family,
            connector,
            deadzone_fraction,
            scheme,
        }
    }

    /// `(min, max)` voltage range for analog families.
    pub fn voltage_range(&self) -> Option<(f64, f64)> {
        match self.scheme {
            SignalScheme::Analog { voltage_min, voltage_max, .. } => Some((voltage_min, voltage_max)),
            SignalScheme::Bus { .. } => None,
        }
    }

    /// Midpoint of the voltage range for analog families.
    pub fn center_voltage(&self) -> Option<f64> {
        self.voltage_range().map(|(min, max)| (min + max) / 2.0)
    }

    pub fn has_speed_pot(&self) -> bool {
        matches!(self.scheme, SignalScheme::Analog { has_speed_pot: true, .. })
    }

    pub fn has_drive_profile(&self) -> bool {
        matches!(self.scheme, SignalScheme::Bus { has_drive_profile: true })
    }

    pub fn is_digital_bus(&self) -> bool {
        matches!(self.scheme, SignalScheme::Bus { .. })
    }

    /// Full characteristics of the family.
    pub fn characteristics(&self) -> SignalCharacteristics {
        use ControllerFamily::*;

        let (family_name, protocol, tier, features, common_models): (_, _, _, Vec<&'static str>, Vec<&'static str>) =
            match self.family {
                Rnet => (
                    "PG Drives R-Net",
                    "Analog Proportional",
                    MarketTier::Tier1,
                    vec!["Enable line", "Mode selection"],
                    vec![
                        "Permobil M3 Corpus",
                        "Permobil M5 Corpus",
                        "Quickie Q500 M",
                        "Quickie Q300/Q400/Q700",
                        "Magic Mobility Extreme X8",
                    ],
                ),
                SharkDx => (
                    "Dynamic Controls Shark/DX",
                    "Analog Hall Effect",
                    MarketTier::Tier1,
                    vec!["Enable line"],
                    vec!["Merits Vision Super HD (P327)", "Shoprider 6Runner 10"],
                ),
                Vr2Pilot => (
                    "PG Drives VR2/Pilot+/VSI",
                    "Analog Proportional",
                    MarketTier::Tier1,
                    vec!["Speed potentiometer", "Mode switching"],
                    vec![
                        "Pride Jazzy Carbon",
                        "Pride Jazzy Ultra Light",
                        "Pride Jazzy Select 6",
                        "Pride Jazzy 600 ES",
                        "Golden LiteRider Envy GP162",
                        "Golden Compass Sport",
                        "Hoveround LX-5",
                    ],
                ),
                LinxDx => (
                    "Dynamic Controls LiNX",
                    "Digital CAN-like (proprietary)",
                    MarketTier::Tier2,
                    vec![
                        "Telemetry support",
                        "Configuration via bus",
                        "Error reporting",
                        "Battery monitoring",
                    ],
                    vec![
                        "Invacare TDX SP2",
                        "Invacare Aviva RX",
                        "Golden LiteRider Envy (variants)",
                        "Drive Titan AXS",
                    ],
                ),
                Qlogic => (
                    "Quantum Q-Logic 3/NE Series",
                    "CAN/RS485 hybrid",
                    MarketTier::Tier2,
                    vec![
                        "Drive profiles",
                        "Specialty controls",
                        "Seating integration",
                        "Advanced diagnostics",
                        "USB connectivity",
                    ],
                    vec!["Quantum Edge 3", "Quantum Edge 3 Stretto", "Quantum 4 Front 2"],
                ),
                Generic => ("Generic Analog", "Generic Analog", MarketTier::Fallback, vec![], vec![]),
            };

        SignalCharacteristics {
            family: self.family,
            family_name,
            connector: self.connector,
            protocol,
            deadzone_fraction: self.deadzone_fraction,
            voltage_range: self.voltage_range(),
            center_voltage: self.center_voltage(),
            has_speed_pot: self.has_speed_pot(),
            has_drive_profile: self.has_drive_profile(),
            is_digital_bus: self.is_digital_bus(),
            tier,
            features,
            common_models,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_profiles() {
        let rnet = ControllerFamily::Rnet.profile();
        assert_eq!(rnet.deadzone_fraction, 0.15);
        assert_eq!(rnet.voltage_range(), Some((0.0, 5.0)));
        assert_eq!(rnet.center_voltage(), Some(2.5));
        assert!(!rnet.is_digital_bus());

        let shark = ControllerFamily::SharkDx.profile();
        assert_eq!(shark.center_voltage(), Some(1.65));
        assert_eq!(shark.deadzone_fraction, 0.12);

        assert!(ControllerFamily::Vr2Pilot.profile().has_speed_pot());
        assert!(ControllerFamily::Qlogic.profile().has_drive_profile());
        assert!(!ControllerFamily::LinxDx.profile().has_drive_profile());

        for f in [ControllerFamily::LinxDx, ControllerFamily::Qlogic].iter() {
            let p = f.profile();
            assert!(p.is_digital_bus());
            assert_eq!(p.voltage_range(), None);
            assert_eq!(p.deadzone_fraction, 0.08);
        }

        // Only one family of each feature
        let pots = ControllerFamily::ALL.iter().filter(|f| f.profile().has_speed_pot()).count();
        let profiles = ControllerFamily::ALL
            .iter()
            .filter(|f| f.profile().has_drive_profile())
            .count();
        assert_eq!((pots, profiles), (1, 1));
    }

    #[test]
    fn test_characteristics() {
        let c = ControllerFamily::Qlogic.profile().characteristics();
        assert_eq!(c.tier, MarketTier::Tier2);
        assert!(c.features.contains(&"Drive profiles"));
        assert!(c.is_digital_bus && c.has_drive_profile && !c.has_speed_pot);

        let g = ControllerFamily::Generic.profile().characteristics();
        assert_eq!(g.tier, MarketTier::Fallback);
        assert!(g.common_models.is_empty());
    }
}
