//! Signal processing for the controller families

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::trace;

// Internal
use comms_if::eqpt::{AnalogSignal, BusSignal, RawSignal, SignalKind};
use util::maths::clamp;
use super::{
    ControllerFamily, ControllerFamilyProfile, ControllerInput, NormalizedCommand,
    SignalCharacteristics, SignalError, SignalScheme, DRIVE_PROFILE_SCALES,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Converts raw signals into normalised commands following the rules of one controller family.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SignalProcessor {
    profile: ControllerFamilyProfile,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SignalProcessor {
    pub fn new(family: ControllerFamily) -> Self {
        Self::from_profile(family.profile())
    }

    pub fn from_profile(profile: ControllerFamilyProfile) -> Self {
        Self { profile }
    }

    pub fn family(&self) -> ControllerFamily {
        self.profile.family
    }

    pub fn profile(&self) -> &ControllerFamilyProfile {
        &self.profile
    }

    pub fn characteristics(&self) -> SignalCharacteristics {
        self.profile.characteristics()
    }

    /// The kind of signal this family accepts.
    pub fn expected_kind(&self) -> SignalKind {
        match self.profile.scheme {
            SignalScheme::Analog { .. } => SignalKind::Analog,
            SignalScheme::Bus { .. } => SignalKind::Bus,
        }
    }

    /// Check that a signal can be processed by this family without processing it.
    pub fn check(&self, signal: &RawSignal) -> Result<(), SignalError> {
        if signal.kind() != self.expected_kind() {
            return Err(self.mismatch(signal));
        }

        if let RawSignal::Bus(BusSignal { drive_profile: Some(p), .. }) = signal {
            if self.profile.has_drive_profile() && *p as usize >= DRIVE_PROFILE_SCALES.len() {
                return Err(SignalError::InvalidDriveProfile(*p));
            }
        }

        Ok(())
    }

    /// Process a raw signal into a controller input.
    ///
    /// A signal of the wrong kind for the family is rejected with
    /// [`SignalError::FamilyMismatch`].
    pub fn process(&self, signal: &RawSignal) -> Result<ControllerInput, SignalError> {
        self.check(signal)?;

        let input = match (self.profile.scheme, signal) {
            (SignalScheme::Analog { voltage_min, voltage_max, has_speed_pot }, RawSignal::Analog(s)) => {
                self.process_analog(s, voltage_min, voltage_max, has_speed_pot)
            }
            (SignalScheme::Bus { has_drive_profile }, RawSignal::Bus(s)) => {
                self.process_bus(s, has_drive_profile)
            }
            _ => return Err(self.mismatch(signal)),
        };

        trace!("{} processed {:?} -> {:?}", self.profile.family, signal, input.command);

        Ok(input)
    }

    fn process_analog(
        &self,
        signal: &AnalogSignal,
        voltage_min: f64,
        voltage_max: f64,
        has_speed_pot: bool,
    ) -> ControllerInput {
        let mut input = ControllerInput {
            command: NormalizedCommand::zero(),
            emergency_stop: signal.emergency_stop,
            enable: signal.enable_line,
            mode_switch: signal.mode_button,
        };

        if !signal.enable_line || signal.emergency_stop {
            return input;
        }

        let center = (voltage_min + voltage_max) / 2.0;
        let to_axis = |v: f64| self.apply_deadzone(voltage_to_axis(v, voltage_min, center, voltage_max));

        let mut linear = to_axis(signal.axis_y_voltage);
        let mut angular = to_axis(signal.axis_x_voltage);

        if has_speed_pot {
            let scale = match signal.speed_pot_voltage {
                Some(v) if v.is_finite() => clamp(v / voltage_max, 0.0, 1.0),
                _ => 1.0,
            };
            linear *= scale;
            angular *= scale;
        }

        input.command = NormalizedCommand::new(linear, angular);
        input
    }

    fn process_bus(&self, signal: &BusSignal, has_drive_profile: bool) -> ControllerInput {
        let mut input = ControllerInput {
            command: NormalizedCommand::zero(),
            emergency_stop: signal.emergency_stop,
            enable: signal.enable,
            mode_switch: signal.mode_button,
        };

        if !signal.enable || signal.emergency_stop {
            return input;
        }

        let to_axis = |v: f64| {
            let v = if v.is_finite() { clamp(v, -1.0, 1.0) } else { 0.0 };
            self.apply_deadzone(v)
        };

        let mut linear = to_axis(signal.linear_axis);
        let mut angular = to_axis(signal.angular_axis);

        if has_drive_profile {
            // Profile range was checked before processing
            let scale = signal
                .drive_profile
                .and_then(|p| DRIVE_PROFILE_SCALES.get(p as usize).copied())
                .unwrap_or(1.0);
            linear *= scale;
            angular *= scale;
        }

        input.command = NormalizedCommand::new(linear, angular);
        input
    }

    fn mismatch(&self, signal: &RawSignal) -> SignalError {
        SignalError::FamilyMismatch {
            family: self.profile.family,
            expected: self.expected_kind(),
            found: signal.kind(),
        }
    }

    /// Zero values inside the deadzone and rescale the rest so the deadzone edge maps to 0 and
    /// full deflection maps to 1.
    fn apply_deadzone(&self, value: f64) -> f64 {
        let dz = self.profile.deadzone_fraction;

        if value.abs() < dz {
            0.0
        }
        else {
            value.signum() * (value.abs() - dz) / (1.0 - dz)
        }
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Convert an axis voltage into the range [-1, 1].
///
/// Positive deflection is scaled by the span above center and negative deflection by the span
/// below it.
fn voltage_to_axis(voltage: f64, voltage_min: f64, center: f64, voltage_max: f64) -> f64 {
    if !voltage.is_finite() {
        return 0.0;
    }

    let raw = if voltage >= center {
        (voltage - center) / (voltage_max - center)
    }
    else {
        (voltage - center) / (center - voltage_min)
    };

    clamp(raw, -1.0, 1.0)
}

#[cfg(test)]
mod test {
    use super::*;

    fn analog(x: f64, y: f64) -> RawSignal {
        AnalogSignal::new(x, y, true).into()
    }

    #[test]
    fn test_deadzone_zero() {
        for family in ControllerFamily::ALL.iter() {
            let sp = SignalProcessor::new(*family);
            let dz = sp.profile().deadzone_fraction;

            let signal = match sp.profile().voltage_range() {
                Some((min, max)) => {
                    let c = (min + max) / 2.0;
                    let off = 0.99 * dz * (max - c);
                    analog(c - off, c + off)
                }
                None => BusSignal::new(0.99 * dz, -0.99 * dz, true).into(),
            };

            let out = sp.process(&signal).unwrap();
            assert_eq!(out.command, NormalizedCommand::zero(), "{}", family);
        }
    }

    #[test]
    fn test_rnet_vs_vr2() {
        let rnet = SignalProcessor::new(ControllerFamily::Rnet);
        let vr2 = SignalProcessor::new(ControllerFamily::Vr2Pilot);

        let s = analog(2.5, 2.8);

        assert_eq!(rnet.process(&s).unwrap().command.linear, 0.0);
        assert!(vr2.process(&s).unwrap().command.linear > 0.0);
    }

    #[test]
    fn test_full_deflection() {
        let rnet = SignalProcessor::new(ControllerFamily::Rnet);
        let out = rnet.process(&analog(0.0, 5.0)).unwrap().command;
        assert_eq!(out.linear, 1.0);
        assert_eq!(out.angular, -1.0);

        // Out of range voltages are clamped
        let shark = SignalProcessor::new(ControllerFamily::SharkDx);
        let out = shark.process(&analog(1.65, 4.5)).unwrap().command;
        assert_eq!(out.linear, 1.0);
        assert_eq!(out.angular, 0.0);
    }

    #[test]
    fn test_speed_pot() {
        let vr2 = SignalProcessor::new(ControllerFamily::Vr2Pilot);

        let half = AnalogSignal::new(2.5, 5.0, true).with_speed_pot(2.5).into();
        assert!((vr2.process(&half).unwrap().command.linear - 0.5).abs() < 1e-12);

        // No pot reading means full scale
        assert_eq!(vr2.process(&analog(2.5, 5.0)).unwrap().command.linear, 1.0);
    }

    #[test]
    fn test_enable_and_estop() {
        let rnet = SignalProcessor::new(ControllerFamily::Rnet);

        let disabled = AnalogSignal::new(5.0, 5.0, false).into();
        let out = rnet.process(&disabled).unwrap();
        assert!(out.command.is_zero());
        assert!(!out.enable);

        let linx = SignalProcessor::new(ControllerFamily::LinxDx);
        let mut frame = BusSignal::new(1.0, 1.0, true);
        frame.emergency_stop = true;
        let out = linx.process(&frame.into()).unwrap();
        assert!(out.command.is_zero());
        assert!(out.emergency_stop);
    }

    #[test]
    fn test_drive_profiles() {
        let ql = SignalProcessor::new(ControllerFamily::Qlogic);

        for (p, scale) in DRIVE_PROFILE_SCALES.iter().enumerate() {
            let s = BusSignal::new(1.0, 0.0, true).with_profile(p as u8).into();
            assert_eq!(ql.process(&s).unwrap().command.linear, *scale);
        }

        let none = BusSignal::new(1.0, 0.0, true).into();
        assert_eq!(ql.process(&none).unwrap().command.linear, 1.0);

        let bad = BusSignal::new(1.0, 0.0, true).with_profile(4).into();
        assert_eq!(ql.process(&bad), Err(SignalError::InvalidDriveProfile(4)));

        // LiNX ignores the profile
        let linx = SignalProcessor::new(ControllerFamily::LinxDx);
        let s = BusSignal::new(1.0, 0.0, true).with_profile(0).into();
        assert_eq!(linx.process(&s).unwrap().command.linear, 1.0);
    }

    #[test]
    fn test_mismatch() {
        let rnet = SignalProcessor::new(ControllerFamily::Rnet);
        let r = rnet.process(&BusSignal::new(1.0, 0.0, true).into());
        assert_eq!(
            r,
            Err(SignalError::FamilyMismatch {
                family: ControllerFamily::Rnet,
                expected: SignalKind::Analog,
                found: SignalKind::Bus,
            })
        );

        let linx = SignalProcessor::new(ControllerFamily::LinxDx);
        assert!(linx.process(&analog(2.5, 2.5)).is_err());
    }
}
