//! Differential drive kinematic model

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::trace;

// Internal
use util::maths::{step_towards, wrap_pi};
use crate::ctrl_family::NormalizedCommand;
use crate::params::Params;
use super::{BodyVelocity, Drive, MotorSpeeds, Pose, WheelSpeeds};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Two independently driven wheels on a common axle.
#[derive(Debug, Clone)]
pub struct DiffDrive {
    wheelbase: f64,
    max_velocity: f64,
    max_acceleration: f64,

    pose: Pose,
    current: WheelSpeeds,
    target: WheelSpeeds,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl DiffDrive {
    /// Create a new drive at rest at the origin.
    pub fn new(wheelbase: f64, max_velocity: f64, max_acceleration: f64) -> Self {
        Self {
            wheelbase,
            max_velocity,
            max_acceleration,
            pose: Pose::default(),
            current: WheelSpeeds::default(),
            target: WheelSpeeds::default(),
        }
    }

    pub fn from_params(params: &Params) -> Self {
        Self::new(params.wheelbase, params.max_velocity, params.max_acceleration)
    }

    /// Target wheel speeds of the last command.
    pub fn target_wheel_speeds(&self) -> WheelSpeeds {
        self.target
    }

    /// Wheel speeds for a command.
    ///
    /// Full linear demand drives both wheels at the maximum velocity, full angular demand spins
    /// the wheels in opposite directions at the maximum velocity. If the combination would exceed
    /// the limit on either wheel both are scaled down together, so the turn radius is kept.
    fn wheel_targets(&self, cmd: NormalizedCommand) -> WheelSpeeds {
        let v = cmd.linear * self.max_velocity;
        let omega = cmd.angular * 2.0 * self.max_velocity / self.wheelbase;

        let mut left = v - omega * self.wheelbase / 2.0;
        let mut right = v + omega * self.wheelbase / 2.0;

        let peak = left.abs().max(right.abs());
        if peak > self.max_velocity {
            let scale = self.max_velocity / peak;
            left *= scale;
            right *= scale;
        }

        WheelSpeeds { left, right }
    }
}

impl Drive for DiffDrive {
    fn set_command(&mut self, cmd: NormalizedCommand) {
        self.target = self.wheel_targets(NormalizedCommand::new(cmd.linear, cmd.angular));
    }

    fn update(&mut self, dt_s: f64) {
        if dt_s <= 0.0 || !dt_s.is_finite() {
            return;
        }

        let max_step = self.max_acceleration * dt_s;
        self.current.left = step_towards(self.current.left, self.target.left, max_step);
        self.current.right = step_towards(self.current.right, self.target.right, max_step);

        let BodyVelocity { linear, angular } = self.velocity();

        self.pose.x += linear * self.pose.theta.cos() * dt_s;
        self.pose.y += linear * self.pose.theta.sin() * dt_s;
        self.pose.theta = wrap_pi(self.pose.theta + angular * dt_s);

        trace!(
            "Drive wheels ({:.3}, {:.3}) m/s, pose ({:.3}, {:.3}, {:.3})",
            self.current.left,
            self.current.right,
            self.pose.x,
            self.pose.y,
            self.pose.theta
        );
    }

    fn emergency_stop(&mut self) {
        self.current = WheelSpeeds::default();
        self.target = WheelSpeeds::default();
    }

    fn pose(&self) -> Pose {
        self.pose
    }

    fn velocity(&self) -> BodyVelocity {
        BodyVelocity {
            linear: (self.current.left + self.current.right) / 2.0,
            angular: (self.current.right - self.current.left) / self.wheelbase,
        }
    }

    fn motor_speeds(&self) -> MotorSpeeds {
        MotorSpeeds {
            left: self.current.left / self.max_velocity,
            right: self.current.right / self.max_velocity,
        }
    }

    fn wheel_speeds(&self) -> WheelSpeeds {
        self.current
    }

    fn reset_pose(&mut self, pose: Pose) {
        self.pose = Pose::new(pose.x, pose.y, pose.theta);
        self.emergency_stop();
    }
}
