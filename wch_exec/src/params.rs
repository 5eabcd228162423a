//! Parameters structure for the wheelchair simulation

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::info;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;
use util::params::LoadError;

use crate::ctrl_family::ControllerFamily;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Longest paced tick, a slower pacing is a misconfiguration.
///
/// Units: seconds
pub const MAX_PACED_PERIOD_S: f64 = 60.0;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the simulation.
///
/// Every key has a default, so an empty file gives the standard wheelchair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Params {

    // ---- GEOMETRY ----

    /// Distance between the two drive wheels.
    ///
    /// Units: meters
    pub wheelbase: f64,

    // ---- CAPABILITIES ----

    /// Maximum speed of either wheel.
    ///
    /// Units: meters/second
    pub max_velocity: f64,

    /// Maximum rate of change of either wheel's speed.
    ///
    /// Units: meters/second^2
    pub max_acceleration: f64,

    // ---- CONTROLLER ----

    /// Family of the fitted controller. `None` accepts only direct commands.
    pub controller_family: Option<ControllerFamily>,

    // ---- SENSORS ----

    /// Standard deviation of the IMU noise.
    ///
    /// Units: radians (heading), radians/second (rate)
    pub imu_noise_stddev: f64,

    /// Standard deviation of the proximity noise.
    ///
    /// Units: meters
    pub proximity_noise_stddev: f64,

    /// Maximum range of the proximity sensors.
    ///
    /// Units: meters
    pub proximity_range: f64,

    // ---- SAFETY ----

    /// Maximum time without a command before the deadman trips.
    ///
    /// Units: seconds
    pub deadman_timeout: f64,

    /// Proximity reading below which the chair is stopped.
    ///
    /// Units: meters
    pub obstacle_stop_distance: f64,

    // ---- LOOP ----

    /// Tick rate of the simulation loop.
    ///
    /// Units: Hz
    pub update_rate: f64,

    /// Seed of the noise source. `None` seeds from entropy.
    pub seed: Option<u64>,

    /// Wall clock pacing factor. Values above 1 run faster than real time, `None` or 0 disables
    /// pacing.
    pub realtime_factor: Option<f64>,

    /// Maximum number of poses kept in the path history.
    pub max_path_len: usize,

    pub power: PowerParams,

    pub safety: SafetyParams,
}

/// Battery parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PowerParams {
    /// Usable battery capacity.
    ///
    /// Units: watt-hours
    pub capacity_wh: f64,

    /// Power drawn by the electronics while idle.
    ///
    /// Units: watts
    pub base_load_w: f64,

    /// Power drawn per unit of normalised motor speed, per motor.
    ///
    /// Units: watts
    pub motor_power_coeff_w: f64,

    /// Voltage at 100% charge.
    ///
    /// Units: volts
    pub full_voltage: f64,

    /// Voltage at the top of the discharge plateau (90% charge).
    ///
    /// Units: volts
    pub plateau_high_voltage: f64,

    /// Voltage at the bottom of the discharge plateau (10% charge).
    ///
    /// Units: volts
    pub plateau_low_voltage: f64,

    /// Voltage at 0% charge.
    ///
    /// Units: volts
    pub cutoff_voltage: f64,

    /// Initial state of charge in [0, 100].
    pub initial_percent: f64,

    /// Charge below which the battery is low.
    pub low_battery_percent: f64,

    /// Charge below which the battery is critical.
    pub critical_battery_percent: f64,
}

/// Safety monitor parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SafetyParams {
    /// Number of alerts retained, oldest are evicted first.
    pub alert_retention: usize,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Named wheelchair models with preset geometry and limits.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WheelchairModel {
    Standard,
    HeavyDuty,
    Lightweight,
    Racing,
}

/// Errors in the parameters.
#[derive(Debug, Error, PartialEq)]
pub enum ParamsError {
    #[error("{0} must be positive and finite (got {1})")]
    NotPositive(&'static str, f64),

    #[error("{0} must not be negative (got {1})")]
    Negative(&'static str, f64),

    #[error("{0} must be in [0, 100] (got {1})")]
    NotAPercentage(&'static str, f64),

    #[error(
        "Battery voltages must satisfy cutoff <= plateau low <= plateau high <= full \
        (got {0}, {1}, {2}, {3})"
    )]
    InconsistentVoltages(f64, f64, f64, f64),

    #[error("The critical battery level ({0}) must be below the low level ({1})")]
    InconsistentBatteryLevels(f64, f64),

    #[error("The path history must hold at least one pose")]
    EmptyPath,

    #[error("The alert log must hold at least one alert")]
    EmptyAlertLog,

    #[error("Unknown wheelchair model \"{0}\"")]
    UnknownModel(String),

    #[error("Unknown scenario \"{0}\"")]
    UnknownScenario(String),

    #[error("{0} must be in (0, 1] (got {1})")]
    NotAFactor(&'static str, f64),

    #[error(
        "The obstacle stop distance ({0} m) must be below the proximity range ({1} m)"
    )]
    StopBeyondRange(f64, f64),

    #[error(
        "A realtime factor of {0} paces ticks {1} s apart, the longest allowed is {}",
        MAX_PACED_PERIOD_S
    )]
    PacingTooSlow(f64, f64),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Params {
    fn default() -> Self {
        Self {
            wheelbase: 0.6,
            max_velocity: 2.0,
            max_acceleration: 1.0,
            controller_family: None,
            imu_noise_stddev: 0.01,
            proximity_noise_stddev: 0.02,
            proximity_range: 4.0,
            deadman_timeout: 0.5,
            obstacle_stop_distance: 0.3,
            update_rate: 50.0,
            seed: None,
            realtime_factor: None,
            max_path_len: 1000,
            power: PowerParams::default(),
            safety: SafetyParams::default(),
        }
    }
}

impl Default for PowerParams {
    fn default() -> Self {
        // 24 V lithium pack
        Self {
            capacity_wh: 1200.0,
            base_load_w: 5.0,
            motor_power_coeff_w: 200.0,
            full_voltage: 25.6,
            plateau_high_voltage: 25.0,
            plateau_low_voltage: 23.5,
            cutoff_voltage: 21.0,
            initial_percent: 100.0,
            low_battery_percent: 20.0,
            critical_battery_percent: 5.0,
        }
    }
}

impl Default for SafetyParams {
    fn default() -> Self {
        Self {
            alert_retention: 256,
        }
    }
}

impl Params {
    /// Load a file from the software root's parameter directory, falling back on the defaults if
    /// the root isn't set or the file doesn't exist. A file that exists but can't be parsed is an
    /// error.
    pub fn load_or_default(file_name: &str) -> Result<Self, LoadError> {
        match util::params::load(file_name) {
            Ok(p) => {
                info!("Parameters loaded from {}", file_name);
                Ok(p)
            }
            Err(LoadError::SwRootNotSet) | Err(LoadError::FileLoadError(_)) => {
                info!("No {} in the software root, using defaults", file_name);
                Ok(Self::default())
            }
            Err(e) => Err(e),
        }
    }

    /// Check the parameters are usable.
    pub fn are_valid(&self) -> Result<(), ParamsError> {
        positive("wheelbase", self.wheelbase)?;
        positive("max_velocity", self.max_velocity)?;
        positive("max_acceleration", self.max_acceleration)?;
        positive("update_rate", self.update_rate)?;

        non_negative("imu_noise_stddev", self.imu_noise_stddev)?;
        non_negative("proximity_noise_stddev", self.proximity_noise_stddev)?;
        positive("proximity_range", self.proximity_range)?;
        non_negative("deadman_timeout", self.deadman_timeout)?;
        non_negative("obstacle_stop_distance", self.obstacle_stop_distance)?;

        if self.obstacle_stop_distance >= self.proximity_range {
            return Err(ParamsError::StopBeyondRange(
                self.obstacle_stop_distance,
                self.proximity_range,
            ));
        }

        if let Some(f) = self.realtime_factor {
            non_negative("realtime_factor", f)?;

            let paced_s = self.period_s() / f;
            if f > 0.0 && !(paced_s <= MAX_PACED_PERIOD_S) {
                return Err(ParamsError::PacingTooSlow(f, paced_s));
            }
        }

        if self.max_path_len == 0 {
            return Err(ParamsError::EmptyPath);
        }

        self.power.are_valid()?;

        if self.safety.alert_retention == 0 {
            return Err(ParamsError::EmptyAlertLog);
        }

        Ok(())
    }

    /// Override the geometry and limits with those of a wheelchair model.
    pub fn apply_model(&mut self, model: WheelchairModel) {
        let (wheelbase, max_velocity, max_acceleration) = model.geometry();
        self.wheelbase = wheelbase;
        self.max_velocity = max_velocity;
        self.max_acceleration = max_acceleration;
    }

    /// Period of one tick, zero if the update rate is invalid.
    ///
    /// Units: seconds
    pub fn period_s(&self) -> f64 {
        util::time::rate_to_period_s(self.update_rate).unwrap_or(0.0)
    }
}

impl PowerParams {
    pub fn are_valid(&self) -> Result<(), ParamsError> {
        positive("power.capacity_wh", self.capacity_wh)?;
        non_negative("power.base_load_w", self.base_load_w)?;
        non_negative("power.motor_power_coeff_w", self.motor_power_coeff_w)?;
        positive("power.cutoff_voltage", self.cutoff_voltage)?;

        if !(self.cutoff_voltage <= self.plateau_low_voltage
            && self.plateau_low_voltage <= self.plateau_high_voltage
            && self.plateau_high_voltage <= self.full_voltage)
        {
            return Err(ParamsError::InconsistentVoltages(
                self.cutoff_voltage,
                self.plateau_low_voltage,
                self.plateau_high_voltage,
                self.full_voltage,
            ));
        }

        percentage("power.initial_percent", self.initial_percent)?;
        percentage("power.low_battery_percent", self.low_battery_percent)?;
        percentage("power.critical_battery_percent", self.critical_battery_percent)?;

        if self.critical_battery_percent > self.low_battery_percent {
            return Err(ParamsError::InconsistentBatteryLevels(
                self.critical_battery_percent,
                self.low_battery_percent,
            ));
        }

        Ok(())
    }
}

impl WheelchairModel {
    /// `(wheelbase, max_velocity, max_acceleration)` of the model.
    pub fn geometry(&self) -> (f64, f64, f64) {
        match self {
            WheelchairModel::Standard => (0.6, 2.0, 1.0),
            WheelchairModel::HeavyDuty => (0.65, 1.5, 0.8),
            WheelchairModel::Lightweight => (0.55, 2.5, 1.5),
            WheelchairModel::Racing => (0.7, 4.0, 2.0),
        }
    }
}

impl FromStr for WheelchairModel {
    type Err = ParamsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "standard" => Ok(WheelchairModel::Standard),
            "heavy_duty" => Ok(WheelchairModel::HeavyDuty),
            "lightweight" => Ok(WheelchairModel::Lightweight),
            "racing" => Ok(WheelchairModel::Racing),
            _ => Err(ParamsError::UnknownModel(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn positive(name: &'static str, value: f64) -> Result<(), ParamsError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    }
    else {
        Err(ParamsError::NotPositive(name, value))
    }
}

fn non_negative(name: &'static str, value: f64) -> Result<(), ParamsError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    }
    else {
        Err(ParamsError::Negative(name, value))
    }
}

fn percentage(name: &'static str, value: f64) -> Result<(), ParamsError> {
    if (0.0..=100.0).contains(&value) {
        Ok(())
    }
    else {
        Err(ParamsError::NotAPercentage(name, value))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_empty_file_is_default() {
        let p: Params = util::params::from_toml_str("").unwrap();
        assert_eq!(p, Params::default());
        assert!(p.are_valid().is_ok());
        assert_eq!(p.period_s(), 0.02);
    }

    #[test]
    fn test_partial_file() {
        let p: Params = util::params::from_toml_str(
            "controller_family = \"vr2_pilot\"\n\
            seed = 42\n\
            realtime_factor = 0.0\n\
            [power]\n\
            capacity_wh = 600.0\n"
        ).unwrap();

        assert_eq!(p.controller_family, Some(ControllerFamily::Vr2Pilot));
        assert_eq!(p.seed, Some(42));
        assert_eq!(p.power.capacity_wh, 600.0);
        assert_eq!(p.power.cutoff_voltage, PowerParams::default().cutoff_voltage);
        assert!(p.are_valid().is_ok());
    }

    #[test]
    fn test_invalid() {
        let mut p = Params::default();
        p.wheelbase = 0.0;
        assert_eq!(p.are_valid(), Err(ParamsError::NotPositive("wheelbase", 0.0)));

        let mut p = Params::default();
        p.realtime_factor = Some(-1.0);
        assert!(p.are_valid().is_err());

        let mut p = Params::default();
        p.power.cutoff_voltage = 30.0;
        assert!(matches!(p.are_valid(), Err(ParamsError::InconsistentVoltages(..))));

        let mut p = Params::default();
        p.power.critical_battery_percent = 50.0;
        assert!(matches!(p.are_valid(), Err(ParamsError::InconsistentBatteryLevels(..))));

        let mut p = Params::default();
        p.obstacle_stop_distance = 4.0;
        assert_eq!(p.are_valid(), Err(ParamsError::StopBeyondRange(4.0, 4.0)));
    }

    #[test]
    fn test_realtime_factor_bounds() {
        let mut p = Params::default();

        for f in [0.0, 0.001, 1.0, 100.0].iter() {
            p.realtime_factor = Some(*f);
            assert!(p.are_valid().is_ok(), "factor {}", f);
        }

        // Would pace ticks hours apart
        p.realtime_factor = Some(1e-300);
        assert!(matches!(p.are_valid(), Err(ParamsError::PacingTooSlow(..))));
        p.realtime_factor = Some(f64::MIN_POSITIVE);
        assert!(matches!(p.are_valid(), Err(ParamsError::PacingTooSlow(..))));

        // Slow ticks at full speed are fine, the same ticks slowed down are not
        p.realtime_factor = Some(1.0);
        p.update_rate = 0.05;
        assert!(p.are_valid().is_ok());
        p.realtime_factor = Some(0.1);
        assert!(matches!(p.are_valid(), Err(ParamsError::PacingTooSlow(..))));
    }

    #[test]
    fn test_models() {
        let mut p = Params::default();
        p.apply_model("racing".parse().unwrap());
        assert_eq!((p.wheelbase, p.max_velocity, p.max_acceleration), (0.7, 4.0, 2.0));

        assert!(matches!(
            "hovercraft".parse::<WheelchairModel>(),
            Err(ParamsError::UnknownModel(_))
        ));
    }

    #[test]
    fn test_load_from_sw_root() {
        let root = concat!(env!("CARGO_MANIFEST_DIR"), "/..");
        std::env::set_var(util::host::SW_ROOT_ENV_VAR, root);

        let p = Params::load_or_default("wch_exec.toml").unwrap();
        assert_eq!(p.controller_family, Some(ControllerFamily::Rnet));

        let p = Params::load_or_default("not_a_params_file.toml").unwrap();
        assert_eq!(p, Params::default());
    }

    #[test]
    fn test_shipped_file() {
        let p: Params = util::params::from_toml_str(
            include_str!("../../params/wch_exec.toml")
        ).unwrap();

        assert!(p.are_valid().is_ok());
        assert_eq!(p.controller_family, Some(ControllerFamily::Rnet));
        assert_eq!(p.power, PowerParams::default());
    }
}
