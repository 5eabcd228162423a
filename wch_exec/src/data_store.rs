//! # Data Store
//!
//! Holds the wheelchair state and the cycle management data of the simulation loop.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::tm::WheelchairTm;
use serde::Serialize;
use std::collections::VecDeque;

use crate::{
    ctrl_family::{ControllerInput, NormalizedCommand},
    drive::{BodyVelocity, MotorSpeeds, Pose},
    power::BatteryState,
    safety::SafetyState,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// State of the wheelchair at the end of a cycle.
#[derive(Debug, Copy, Clone, Serialize)]
pub struct WheelchairState {
    pub pose: Pose,
    pub velocity: BodyVelocity,
    pub motor_speeds: MotorSpeeds,
    pub battery: BatteryState,
    pub safety_state: SafetyState,
    pub deadman_active: bool,
}

/// Cycle statistics of the loop.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize)]
pub struct CycleStats {
    /// Number of cycles already executed
    pub num_cycles: u64,

    /// Simulation elapsed time
    pub sim_time_s: f64,

    /// Number of consecutive cycle overruns
    pub num_consec_cycle_overruns: u64,

    /// Total number of cycle overruns
    pub num_cycle_overruns: u64,
}

/// Data store for the simulation loop.
#[derive(Debug, Clone)]
pub struct DataStore {
    // Cycle management
    pub stats: CycleStats,

    // State
    pub state: WheelchairState,

    /// Past poses, oldest first.
    pub path: VecDeque<Pose>,
    max_path_len: usize,

    // Cycle data
    /// Input read from the controller this cycle.
    pub controller_input: ControllerInput,

    /// Command passed to the drive this cycle, after the safety override.
    pub safe_cmd: NormalizedCommand,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for WheelchairState {
    fn default() -> Self {
        Self {
            pose: Pose::default(),
            velocity: BodyVelocity::default(),
            motor_speeds: MotorSpeeds::default(),
            battery: BatteryState::default(),
            safety_state: SafetyState::Normal,
            deadman_active: false,
        }
    }
}

impl WheelchairState {
    /// True while the safety monitor holds the chair stopped.
    pub fn emergency_stop(&self) -> bool {
        self.safety_state == SafetyState::Estopped
    }

    /// Build the telemetry snapshot of this state.
    pub fn to_tm(&self) -> WheelchairTm {
        WheelchairTm {
            x: self.pose.x,
            y: self.pose.y,
            theta: self.pose.theta,
            linear_velocity: self.velocity.linear,
            angular_velocity: self.velocity.angular,
            left_motor_speed: self.motor_speeds.left,
            right_motor_speed: self.motor_speeds.right,
            battery_voltage: self.battery.voltage,
            battery_percent: self.battery.percent,
            emergency_stop: self.emergency_stop(),
            deadman_active: self.deadman_active,
        }
    }
}

impl DataStore {
    pub fn new(initial_pose: Pose, max_path_len: usize) -> Self {
        let mut ds = Self {
            stats: CycleStats::default(),
            state: WheelchairState::default(),
            path: VecDeque::new(),
            max_path_len: max_path_len.max(1),
            controller_input: ControllerInput::default(),
            safe_cmd: NormalizedCommand::zero(),
        };
        ds.reset_path(initial_pose);
        ds
    }

    /// Perform actions required at the start of a cycle.
    pub fn cycle_start(&mut self) {
        self.controller_input = ControllerInput::default();
        self.safe_cmd = NormalizedCommand::zero();
    }

    /// Perform actions required at the end of a cycle.
    pub fn cycle_end(&mut self, dt_s: f64) {
        self.stats.num_cycles += 1;
        self.stats.sim_time_s += dt_s;
    }

    /// Append a pose to the path, dropping the oldest if the path is full.
    pub fn record_pose(&mut self, pose: Pose) {
        while self.path.len() >= self.max_path_len {
            self.path.pop_front();
        }
        self.path.push_back(pose);
    }

    /// Clear the path and start it from the given pose.
    pub fn reset_path(&mut self, pose: Pose) {
        self.path.clear();
        self.path.push_back(pose);
        self.state.pose = pose;
        self.state.velocity = BodyVelocity::default();
        self.state.motor_speeds = MotorSpeeds::default();
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_path_bounded() {
        let mut ds = DataStore::new(Pose::default(), 3);
        for i in 0..10 {
            ds.record_pose(Pose::new(i as f64, 0.0, 0.0));
        }

        assert_eq!(ds.path.len(), 3);
        assert_eq!(ds.path.front().unwrap().x, 7.0);

        ds.reset_path(Pose::new(1.0, 1.0, 0.0));
        assert_eq!(ds.path.len(), 1);
        assert_eq!(ds.state.pose.x, 1.0);
    }

    #[test]
    fn test_tm() {
        let mut state = WheelchairState::default();
        state.safety_state = SafetyState::Estopped;
        state.battery.percent = 80.0;

        let tm = state.to_tm();
        assert!(tm.emergency_stop);
        assert_eq!(tm.battery_percent, 80.0);
    }
}
