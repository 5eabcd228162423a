//! Simulated battery

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{trace, warn};

// Internal
use util::maths::clamp;
use crate::drive::MotorSpeeds;
use crate::params::PowerParams;
use super::{BatteryState, DischargeCurve, PiecewiseLinearCurve, PowerCondition, PowerSystem};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

const SECONDS_PER_HOUR: f64 = 3600.0;

/// Number of points at which a replacement discharge curve is checked.
const CURVE_CHECK_SAMPLES: u32 = 1000;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Battery drained by a constant base load plus a load proportional to the motor speeds.
pub struct SimPower {
    params: PowerParams,
    curve: Box<dyn DischargeCurve + Send>,

    capacity_remaining_wh: f64,
    power_w: f64,
    condition: PowerCondition,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SimPower {
    /// Create a new battery charged to the initial level, using the default discharge curve.
    pub fn new(params: &PowerParams) -> Self {
        let mut p = Self {
            params: params.clone(),
            curve: Box::new(PiecewiseLinearCurve::from_params(params)),
            capacity_remaining_wh: params.capacity_wh * clamp(params.initial_percent, 0.0, 100.0) / 100.0,
            power_w: 0.0,
            condition: PowerCondition::Nominal,
        };
        p.condition = p.classify();
        p
    }

    /// Replace the discharge curve.
    ///
    /// The curve is sampled across [0, 100] and rejected with `None` if it gives a non finite
    /// voltage or a voltage that falls as the charge rises.
    pub fn with_curve<C>(mut self, curve: C) -> Option<Self>
    where
        C: DischargeCurve + Send + 'static,
    {
        let mut last = f64::NEG_INFINITY;
        for i in 0..=CURVE_CHECK_SAMPLES {
            let pc = 100.0 * f64::from(i) / f64::from(CURVE_CHECK_SAMPLES);
            let v = curve.voltage(pc);

            if !v.is_finite() || v < last {
                warn!("Discharge curve rejected, {} V at {:.1} %", v, pc);
                return None;
            }
            last = v;
        }

        self.curve = Box::new(curve);
        Some(self)
    }

    pub fn percent(&self) -> f64 {
        clamp(self.capacity_remaining_wh / self.params.capacity_wh * 100.0, 0.0, 100.0)
    }

    pub fn voltage(&self) -> f64 {
        self.curve.voltage(self.percent())
    }

    /// Estimated time until the battery is empty at the last power draw, `None` if nothing is
    /// being drawn.
    ///
    /// Units: seconds
    pub fn remaining_runtime_s(&self) -> Option<f64> {
        if self.power_w > 0.0 {
            Some(self.capacity_remaining_wh / self.power_w * SECONDS_PER_HOUR)
        }
        else {
            None
        }
    }

    fn classify(&self) -> PowerCondition {
        let percent = self.percent();

        if percent <= 0.0 {
            PowerCondition::Depleted
        }
        else if percent < self.params.critical_battery_percent {
            PowerCondition::Critical
        }
        else if percent < self.params.low_battery_percent {
            PowerCondition::Low
        }
        else {
            PowerCondition::Nominal
        }
    }
}

impl PowerSystem for SimPower {
    fn update(&mut self, dt_s: f64, motor_speeds: MotorSpeeds) -> PowerCondition {
        let dt_s = if dt_s.is_finite() { dt_s.max(0.0) } else { 0.0 };

        self.power_w = self.params.base_load_w
            + self.params.motor_power_coeff_w * (motor_speeds.left.abs() + motor_speeds.right.abs());

        let energy_wh = (self.power_w * dt_s / SECONDS_PER_HOUR).max(0.0);
        self.capacity_remaining_wh = (self.capacity_remaining_wh - energy_wh).max(0.0);

        let condition = self.classify();
        if condition > self.condition {
            warn!("Battery condition now {:?} ({:.1}%)", condition, self.percent());
        }
        self.condition = condition;

        trace!(
            "Battery {:.2} V, {:.3}%, drawing {:.1} W",
            self.voltage(),
            self.percent(),
            self.power_w
        );

        condition
    }

    fn state(&self) -> BatteryState {
        let voltage = self.voltage();

        BatteryState {
            voltage,
            percent: self.percent(),
            capacity_remaining_wh: self.capacity_remaining_wh,
            power_w: self.power_w,
            current_a: if voltage > 0.0 { self.power_w / voltage } else { 0.0 },
            low: self.condition >= PowerCondition::Low,
            critical: self.condition >= PowerCondition::Critical,
        }
    }

    fn condition(&self) -> PowerCondition {
        self.condition
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    fn small_battery() -> PowerParams {
        PowerParams {
            capacity_wh: 1.0,
            base_load_w: 0.0,
            motor_power_coeff_w: 1800.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_full() {
        let p = SimPower::new(&PowerParams::default());
        let s = p.state();

        assert_eq!(s.percent, 100.0);
        assert_relative_eq!(s.voltage, 25.6, epsilon = 1e-9);
        assert_eq!(p.condition(), PowerCondition::Nominal);
        assert_eq!(p.remaining_runtime_s(), None);
    }

    #[test]
    fn test_energy() {
        let mut p = SimPower::new(&small_battery());

        // Both motors at half speed draw 1800 W, i.e. 0.5 Wh in one second
        p.update(1.0, MotorSpeeds { left: 0.5, right: -0.5 });
        let s = p.state();

        assert_relative_eq!(s.percent, 50.0, epsilon = 1e-9);
        assert_relative_eq!(s.power_w, 1800.0);
        assert_relative_eq!(s.current_a, 1800.0 / s.voltage);
        assert_relative_eq!(p.remaining_runtime_s().unwrap(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_conditions() {
        let mut p = SimPower::new(&small_battery());
        let full = MotorSpeeds { left: 1.0, right: 1.0 };

        // 3600 W drains 1 Wh per second
        assert_eq!(p.update(0.85, full), PowerCondition::Low);
        assert!(p.state().low && !p.state().critical);
        assert_eq!(p.update(0.12, full), PowerCondition::Critical);
        assert_eq!(p.update(0.1, full), PowerCondition::Depleted);
        assert_eq!(p.state().percent, 0.0);
        assert_relative_eq!(p.state().voltage, 21.0);

        // Stays empty
        assert_eq!(p.update(1.0, full), PowerCondition::Depleted);
        assert_eq!(p.state().capacity_remaining_wh, 0.0);
    }

    #[test]
    fn test_monotonic() {
        let mut p = SimPower::new(&PowerParams::default());
        let mut last = p.state();

        for i in 0..500 {
            let s = ((i as f64) * 0.37).sin();
            p.update(0.5, MotorSpeeds { left: s, right: -s * 0.5 });
            let now = p.state();

            assert!(now.percent <= last.percent);
            assert!(now.voltage <= last.voltage);
            last = now;
        }
    }

    #[test]
    fn test_custom_curve() {
        let p = SimPower::new(&PowerParams::default())
            .with_curve(|pc: f64| pc / 10.0)
            .unwrap();
        assert_relative_eq!(p.voltage(), 10.0);

        // Flat curves are fine
        assert!(SimPower::new(&PowerParams::default()).with_curve(|_pc: f64| 24.0).is_some());
    }

    #[test]
    fn test_rising_curve_rejected() {
        let params = PowerParams::default();

        // Voltage rising as the battery drains
        assert!(SimPower::new(&params).with_curve(|pc: f64| 30.0 - pc / 10.0).is_none());

        // A dip in the middle of the plateau
        let dip = |pc: f64| if (40.0..45.0).contains(&pc) { 20.0 } else { 24.0 };
        assert!(SimPower::new(&params).with_curve(dip).is_none());

        assert!(SimPower::new(&params).with_curve(|_pc: f64| f64::NAN).is_none());
    }
}
