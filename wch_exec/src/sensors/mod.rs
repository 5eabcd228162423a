//! # Sensors module
//!
//! Produces IMU and proximity readings from the ground truth state of the chair.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod noise;
mod sim_sensors;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
pub use noise::*;
pub use sim_sensors::*;

use crate::drive::{BodyVelocity, Pose};

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A suite of sensors observing the chair.
pub trait SensorSuite {
    /// Take new readings from the given ground truth, drawing noise from `noise`.
    fn update(&mut self, truth: &GroundTruth, noise: &mut NoiseGenerator);

    /// Latest IMU reading.
    fn imu(&self) -> ImuReading;

    /// Latest proximity readings.
    fn proximity(&self) -> ProximityReading;

    /// Override the clean value of one proximity sensor, `None` removes the override.
    fn set_virtual_obstacle(&mut self, direction: Direction, distance_m: Option<f64>);

    /// Remove every virtual obstacle.
    fn clear_virtual_obstacles(&mut self) {
        for d in Direction::ALL.iter() {
            self.set_virtual_obstacle(*d, None);
        }
    }

    /// Set the visibility factor in (0, 1]. Obstacles further than the proximity range scaled
    /// by this factor are not detected.
    fn set_visibility(&mut self, visibility: f64);

    fn visibility(&self) -> f64;

    /// Add an obstacle to the world.
    fn add_obstacle(&mut self, obstacle: CircleObstacle);

    /// Remove every world obstacle.
    fn clear_obstacles(&mut self);
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The true state of the chair.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct GroundTruth {
    pub pose: Pose,
    pub velocity: BodyVelocity,
}

/// Reading of the inertial measurement unit.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImuReading {
    /// Units: radians
    pub theta: f64,

    /// Units: radians/second
    pub angular_velocity: f64,
}

/// Distances measured by the four proximity sensors.
///
/// Units: meters
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProximityReading {
    pub front: f64,
    pub left: f64,
    pub right: f64,
    pub back: f64,
}

/// Direction a proximity sensor faces.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Front,
    Left,
    Right,
    Back,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Direction {
    pub const ALL: [Direction; 4] = [Direction::Front, Direction::Left, Direction::Right, Direction::Back];

    /// Index of the direction in [`Direction::ALL`].
    pub fn index(&self) -> usize {
        match self {
            Direction::Front => 0,
            Direction::Left => 1,
            Direction::Right => 2,
            Direction::Back => 3,
        }
    }
}

impl ProximityReading {
    /// Reading with every sensor at the same distance.
    pub fn uniform(distance_m: f64) -> Self {
        Self {
            front: distance_m,
            left: distance_m,
            right: distance_m,
            back: distance_m,
        }
    }

    pub fn get(&self, direction: Direction) -> f64 {
        match direction {
            Direction::Front => self.front,
            Direction::Left => self.left,
            Direction::Right => self.right,
            Direction::Back => self.back,
        }
    }

    pub fn set(&mut self, direction: Direction, distance_m: f64) {
        match direction {
            Direction::Front => self.front = distance_m,
            Direction::Left => self.left = distance_m,
            Direction::Right => self.right = distance_m,
            Direction::Back => self.back = distance_m,
        }
    }

    /// Shortest of the four distances.
    pub fn min(&self) -> f64 {
        self.front.min(self.left).min(self.right).min(self.back)
    }
}
