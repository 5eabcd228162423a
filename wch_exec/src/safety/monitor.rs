//! Safety interlock state machine

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, error, info, warn};

// Internal
use crate::ctrl_family::NormalizedCommand;
use crate::drive::Drive;
use crate::params::Params;
use crate::power::PowerCondition;
use super::{
    AlertLevel, AlertLog, ResetOutcome, SafetyAlert, SafetyInputs, SafetyMonitor, SafetyState,
    TripCause,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The safety interlock.
///
/// Stops the drive when the deadman timeout is exceeded, an obstacle is closer than the stop
/// distance, an emergency stop is requested or the battery is depleted. The stop is only cleared
/// by an explicit reset, and only once every one of those conditions has cleared.
#[derive(Debug, Clone)]
pub struct Interlock {
    deadman_timeout_s: f64,
    obstacle_stop_distance_m: f64,

    state: SafetyState,
    trip_causes: Vec<TripCause>,

    /// Conditions active at the last evaluation.
    active: Vec<TripCause>,

    pending_estop: bool,
    deadman_active: bool,
    low_battery_warned: bool,

    alerts: AlertLog,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Interlock {
    pub fn new(deadman_timeout_s: f64, obstacle_stop_distance_m: f64, alert_retention: usize) -> Self {
        Self {
            deadman_timeout_s,
            obstacle_stop_distance_m,
            state: SafetyState::Normal,
            trip_causes: Vec::new(),
            active: Vec::new(),
            pending_estop: false,
            deadman_active: false,
            low_battery_warned: false,
            alerts: AlertLog::new(alert_retention),
        }
    }

    pub fn from_params(params: &Params) -> Self {
        Self::new(
            params.deadman_timeout,
            params.obstacle_stop_distance,
            params.safety.alert_retention,
        )
    }

    /// Conditions active at the last evaluation.
    pub fn active_conditions(&self) -> &[TripCause] {
        &self.active
    }

    fn alert(&mut self, level: AlertLevel, message: String, timestamp_s: f64) {
        match level {
            AlertLevel::Info => info!("{}", message),
            AlertLevel::Warning => warn!("{}", message),
            AlertLevel::Critical => error!("{}", message),
        }

        self.alerts.push(SafetyAlert {
            level,
            message,
            timestamp_s,
        });
    }

    fn trip(&mut self, causes: Vec<TripCause>, now_s: f64, drive: &mut dyn Drive) {
        let level = causes
            .iter()
            .map(|c| c.level())
            .max()
            .unwrap_or(AlertLevel::Warning);

        drive.emergency_stop();
        self.state = SafetyState::Estopped;

        self.alert(level, format!("Emergency stop, causes: {:?}", causes), now_s);
        self.trip_causes = causes;
    }
}

impl SafetyMonitor for Interlock {
    fn evaluate(
        &mut self,
        inputs: &SafetyInputs,
        cmd: NormalizedCommand,
        drive: &mut dyn Drive,
    ) -> NormalizedCommand {
        // ---- CONDITIONS ----

        let mut active = Vec::with_capacity(4);

        // No command yet counts from the start of the loop
        let since_cmd_s = inputs.now_s - inputs.last_command_time_s.unwrap_or(0.0);
        self.deadman_active = since_cmd_s > self.deadman_timeout_s;

        if self.deadman_active {
            active.push(TripCause::Deadman);
        }
        if inputs.min_proximity_m < self.obstacle_stop_distance_m {
            active.push(TripCause::Obstacle);
        }
        if inputs.hardware_estop {
            active.push(TripCause::EStopRequest);
        }
        if inputs.power == PowerCondition::Depleted {
            active.push(TripCause::Depleted);
        }

        let mut causes = active.clone();
        self.active = active;

        if std::mem::take(&mut self.pending_estop) && !causes.contains(&TripCause::EStopRequest) {
            causes.push(TripCause::EStopRequest);
        }

        // ---- BATTERY ----

        if inputs.power >= PowerCondition::Low && !self.low_battery_warned {
            self.low_battery_warned = true;
            self.alert(AlertLevel::Warning, format!("Battery {:?}", inputs.power), inputs.now_s);
        }

        // ---- TRANSITIONS ----

        match self.state {
            SafetyState::Normal => {
                if !causes.is_empty() {
                    self.trip(causes, inputs.now_s, drive);
                }
            }
            SafetyState::Estopped => {
                for c in causes {
                    if !self.trip_causes.contains(&c) {
                        debug!("Additional stop cause while stopped: {:?}", c);
                        self.trip_causes.push(c);
                    }
                }
            }
        }

        match self.state {
            SafetyState::Normal => cmd,
            SafetyState::Estopped => NormalizedCommand::zero(),
        }
    }

    fn request_estop(&mut self) {
        debug!("Emergency stop requested");
        self.pending_estop = true;
    }

    fn request_reset(&mut self, now_s: f64) -> ResetOutcome {
        if self.state == SafetyState::Normal {
            return ResetOutcome::AlreadyNormal;
        }

        if !self.active.is_empty() {
            info!("Reset rejected, conditions still active: {:?}", self.active);
            return ResetOutcome::Rejected(self.active.clone());
        }

        self.state = SafetyState::Normal;
        self.trip_causes.clear();
        self.alert(AlertLevel::Info, String::from("Emergency stop reset"), now_s);

        ResetOutcome::Reset
    }

    fn state(&self) -> SafetyState {
        self.state
    }

    fn deadman_active(&self) -> bool {
        self.deadman_active
    }

    fn trip_causes(&self) -> &[TripCause] {
        &self.trip_causes
    }

    fn alerts(&self) -> &AlertLog {
        &self.alerts
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::drive::{DiffDrive, WheelSpeeds};

    fn inputs(now_s: f64, last: Option<f64>, prox: f64) -> SafetyInputs {
        SafetyInputs {
            now_s,
            last_command_time_s: last,
            min_proximity_m: prox,
            power: PowerCondition::Nominal,
            hardware_estop: false,
        }
    }

    fn moving_drive() -> DiffDrive {
        let mut d = DiffDrive::new(0.6, 2.0, 1.0);
        d.set_command(NormalizedCommand::new(1.0, 0.0));
        for _ in 0..20 {
            d.update(0.02);
        }
        d
    }

    #[test]
    fn test_pass_through() {
        let mut s = Interlock::new(0.5, 0.3, 16);
        let mut d = moving_drive();
        let cmd = NormalizedCommand::new(0.5, 0.1);

        assert_eq!(s.evaluate(&inputs(0.1, Some(0.1), 4.0), cmd, &mut d), cmd);
        assert_eq!(s.state(), SafetyState::Normal);
        assert!(s.alerts().is_empty());
    }

    #[test]
    fn test_deadman() {
        let mut s = Interlock::new(0.5, 0.3, 16);
        let mut d = moving_drive();
        let cmd = NormalizedCommand::new(0.5, 0.0);

        // Never commanded, measured from the start
        assert_eq!(s.evaluate(&inputs(0.5, None, 4.0), cmd, &mut d), cmd);
        assert!(!s.deadman_active());

        let out = s.evaluate(&inputs(0.6, Some(0.0), 4.0), cmd, &mut d);
        assert!(out.is_zero());
        assert!(s.deadman_active());
        assert_eq!(s.state(), SafetyState::Estopped);
        assert_eq!(s.trip_causes(), &[TripCause::Deadman]);
        assert_eq!(d.wheel_speeds(), WheelSpeeds::default());

        let a = s.alerts().latest().unwrap();
        assert_eq!(a.level, AlertLevel::Warning);
        assert_eq!(a.timestamp_s, 0.6);

        // Deadman still active
        assert_eq!(s.request_reset(0.7), ResetOutcome::Rejected(vec![TripCause::Deadman]));

        // Fresh command clears the condition, but not the stop
        assert!(s.evaluate(&inputs(0.8, Some(0.8), 4.0), cmd, &mut d).is_zero());
        assert_eq!(s.request_reset(0.8), ResetOutcome::Reset);
        assert_eq!(s.evaluate(&inputs(0.82, Some(0.82), 4.0), cmd, &mut d), cmd);
    }

    #[test]
    fn test_obstacle_reset_idempotent() {
        let mut s = Interlock::new(0.5, 0.3, 16);
        let mut d = moving_drive();
        let cmd = NormalizedCommand::new(0.5, 0.0);

        s.evaluate(&inputs(1.0, Some(1.0), 0.2), cmd, &mut d);
        assert_eq!(s.state(), SafetyState::Estopped);

        for _ in 0..3 {
            assert_eq!(s.request_reset(1.0), ResetOutcome::Rejected(vec![TripCause::Obstacle]));
            assert_eq!(s.state(), SafetyState::Estopped);
        }

        s.evaluate(&inputs(1.1, Some(1.1), 1.0), cmd, &mut d);
        assert_eq!(s.request_reset(1.1), ResetOutcome::Reset);
        assert_eq!(s.request_reset(1.1), ResetOutcome::AlreadyNormal);

        let infos = s.alerts().iter().filter(|a| a.level == AlertLevel::Info).count();
        assert_eq!(infos, 1);
    }

    #[test]
    fn test_estop_request() {
        let mut s = Interlock::new(0.5, 0.3, 16);
        let mut d = moving_drive();
        let cmd = NormalizedCommand::new(0.5, 0.0);

        s.request_estop();
        assert!(s.evaluate(&inputs(1.0, Some(1.0), 4.0), cmd, &mut d).is_zero());
        assert_eq!(s.trip_causes(), &[TripCause::EStopRequest]);
        assert_eq!(s.alerts().latest().unwrap().level, AlertLevel::Critical);

        // The request is one-shot so the reset is accepted
        s.evaluate(&inputs(1.02, Some(1.02), 4.0), cmd, &mut d);
        assert_eq!(s.request_reset(1.02), ResetOutcome::Reset);
    }

    #[test]
    fn test_hardware_estop_held() {
        let mut s = Interlock::new(0.5, 0.3, 16);
        let mut d = moving_drive();
        let mut i = inputs(1.0, Some(1.0), 4.0);
        i.hardware_estop = true;

        s.evaluate(&i, NormalizedCommand::new(1.0, 0.0), &mut d);
        assert_eq!(s.state(), SafetyState::Estopped);
        assert!(matches!(s.request_reset(1.0), ResetOutcome::Rejected(_)));
    }

    #[test]
    fn test_depleted_and_low() {
        let mut s = Interlock::new(0.5, 0.3, 16);
        let mut d = moving_drive();
        let cmd = NormalizedCommand::new(0.5, 0.0);

        let mut i = inputs(1.0, Some(1.0), 4.0);
        i.power = PowerCondition::Low;
        assert_eq!(s.evaluate(&i, cmd, &mut d), cmd);
        assert_eq!(s.evaluate(&i, cmd, &mut d), cmd);
        assert_eq!(s.alerts().len(), 1);
        assert_eq!(s.state(), SafetyState::Normal);

        i.power = PowerCondition::Depleted;
        assert!(s.evaluate(&i, cmd, &mut d).is_zero());
        assert_eq!(s.trip_causes(), &[TripCause::Depleted]);
        assert_eq!(s.alerts().latest().unwrap().level, AlertLevel::Critical);
    }

    #[test]
    fn test_one_alert_per_transition() {
        let mut s = Interlock::new(0.5, 0.3, 16);
        let mut d = moving_drive();

        for k in 0..10 {
            let t = 1.0 + k as f64 * 0.02;
            s.evaluate(&inputs(t, Some(0.0), 0.1), NormalizedCommand::zero(), &mut d);
        }

        assert_eq!(s.alerts().len(), 1);
        assert_eq!(s.trip_causes(), &[TripCause::Deadman, TripCause::Obstacle]);
    }
}
