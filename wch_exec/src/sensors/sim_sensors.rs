//! Simulated sensor suite

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, trace};
use serde::{Deserialize, Serialize};

// Internal
use util::maths::{clamp, wrap_pi};
use crate::params::Params;
use super::{Direction, GroundTruth, ImuReading, NoiseGenerator, ProximityReading, SensorSuite};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Distance of each proximity sensor from the center of the chair.
///
/// Units: meters
pub const PROXIMITY_SENSOR_OFFSET_M: f64 = 0.3;

/// Lowest visibility factor, below it the sensors would be blind.
pub const MIN_VISIBILITY: f64 = 0.05;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A circular obstacle in the world frame.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircleObstacle {
    /// Units: meters
    pub x: f64,

    /// Units: meters
    pub y: f64,

    /// Units: meters
    pub radius: f64,
}

/// Clean and noisy readings of the last update.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize)]
pub struct SensorDiagnostics {
    pub clean_imu: ImuReading,
    pub clean_proximity: ProximityReading,
    pub imu: ImuReading,
    pub proximity: ProximityReading,
    pub num_updates: u64,
}

/// Sensor suite simulated from ground truth.
#[derive(Debug, Clone)]
pub struct SimSensors {
    imu_noise_stddev: f64,
    proximity_noise_stddev: f64,
    proximity_range: f64,
    visibility: f64,

    virtual_obstacles: [Option<f64>; 4],
    world_obstacles: Vec<CircleObstacle>,

    diag: SensorDiagnostics,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SimSensors {
    pub fn new(imu_noise_stddev: f64, proximity_noise_stddev: f64, proximity_range: f64) -> Self {
        let mut diag = SensorDiagnostics::default();
        diag.clean_proximity = ProximityReading::uniform(proximity_range);
        diag.proximity = ProximityReading::uniform(proximity_range);

        Self {
            imu_noise_stddev,
            proximity_noise_stddev,
            proximity_range,
            visibility: 1.0,
            virtual_obstacles: [None; 4],
            world_obstacles: Vec::new(),
            diag,
        }
    }

    pub fn from_params(params: &Params) -> Self {
        Self::new(
            params.imu_noise_stddev,
            params.proximity_noise_stddev,
            params.proximity_range,
        )
    }

    pub fn obstacles(&self) -> &[CircleObstacle] {
        &self.world_obstacles
    }

    pub fn diagnostics(&self) -> SensorDiagnostics {
        self.diag
    }

    fn effective_range(&self) -> f64 {
        self.proximity_range * self.visibility
    }

    /// Distance from one sensor to the nearest world obstacle, capped at the sensor range.
    fn world_distance(&self, truth: &GroundTruth, direction: Direction) -> f64 {
        let (local_x, local_y) = match direction {
            Direction::Front => (PROXIMITY_SENSOR_OFFSET_M, 0.0),
            Direction::Back => (-PROXIMITY_SENSOR_OFFSET_M, 0.0),
            Direction::Left => (0.0, PROXIMITY_SENSOR_OFFSET_M),
            Direction::Right => (0.0, -PROXIMITY_SENSOR_OFFSET_M),
        };

        let (s, c) = truth.pose.theta.sin_cos();
        let sensor_x = truth.pose.x + local_x * c - local_y * s;
        let sensor_y = truth.pose.y + local_x * s + local_y * c;

        self.world_obstacles
            .iter()
            .map(|o| ((sensor_x - o.x).hypot(sensor_y - o.y) - o.radius).max(0.0))
            .fold(self.proximity_range, f64::min)
    }
}

impl SensorSuite for SimSensors {
    fn update(&mut self, truth: &GroundTruth, noise: &mut NoiseGenerator) {
        // ---- IMU ----

        let clean_imu = ImuReading {
            theta: truth.pose.theta,
            angular_velocity: truth.velocity.angular,
        };

        let imu = ImuReading {
            theta: wrap_pi(clean_imu.theta + noise.gaussian(self.imu_noise_stddev)),
            angular_velocity: clean_imu.angular_velocity + noise.gaussian(self.imu_noise_stddev),
        };

        // ---- PROXIMITY ----

        // Echoes from beyond the effective range are lost, so those sensors read as clear
        let max_range = self.effective_range();
        let mut clean_proximity = ProximityReading::default();
        let mut proximity = ProximityReading::default();

        for d in Direction::ALL.iter() {
            let clean = match self.virtual_obstacles[d.index()] {
                Some(v) => v,
                None => self.world_distance(truth, *d),
            };

            let seen = match clean <= max_range {
                true => clean,
                false => self.proximity_range,
            };
            let noisy = seen + noise.gaussian(self.proximity_noise_stddev);

            clean_proximity.set(*d, clean);
            proximity.set(*d, clamp(noisy, 0.0, self.proximity_range));
        }

        trace!("Sensors: imu {:?}, proximity {:?}", imu, proximity);

        self.diag = SensorDiagnostics {
            clean_imu,
            clean_proximity,
            imu,
            proximity,
            num_updates: self.diag.num_updates + 1,
        };
    }

    fn imu(&self) -> ImuReading {
        self.diag.imu
    }

    fn proximity(&self) -> ProximityReading {
        self.diag.proximity
    }

    fn set_virtual_obstacle(&mut self, direction: Direction, distance_m: Option<f64>) {
        self.virtual_obstacles[direction.index()] = distance_m.map(|d| d.max(0.0));
    }

    fn set_visibility(&mut self, visibility: f64) {
        self.visibility = match visibility.is_nan() {
            true => 1.0,
            false => clamp(visibility, MIN_VISIBILITY, 1.0),
        };
        debug!("Sensor visibility set to {:.2}", self.visibility);
    }

    fn visibility(&self) -> f64 {
        self.visibility
    }

    fn add_obstacle(&mut self, obstacle: CircleObstacle) {
        self.world_obstacles.push(obstacle);
    }

    fn clear_obstacles(&mut self) {
        self.world_obstacles.clear();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::drive::Pose;

    fn truth(x: f64, y: f64, theta: f64) -> GroundTruth {
        GroundTruth {
            pose: Pose::new(x, y, theta),
            ..Default::default()
        }
    }

    #[test]
    fn test_no_noise() {
        let mut s = SimSensors::new(0.0, 0.0, 4.0);
        let mut n = NoiseGenerator::new(Some(1));

        s.update(&truth(0.0, 0.0, 1.0), &mut n);
        assert_eq!(s.imu().theta, 1.0);
        assert_eq!(s.proximity(), ProximityReading::uniform(4.0));
    }

    #[test]
    fn test_determinism() {
        let mut a = SimSensors::new(0.01, 0.02, 4.0);
        let mut b = SimSensors::new(0.01, 0.02, 4.0);
        let mut na = NoiseGenerator::new(Some(1234));
        let mut nb = NoiseGenerator::new(Some(1234));

        a.set_virtual_obstacle(Direction::Front, Some(1.0));
        b.set_virtual_obstacle(Direction::Front, Some(1.0));

        for i in 0..50 {
            let t = truth(i as f64 * 0.1, 0.0, 0.0);
            a.update(&t, &mut na);
            b.update(&t, &mut nb);
            assert_eq!(a.diagnostics(), b.diagnostics());
        }
    }

    #[test]
    fn test_clamped() {
        let mut s = SimSensors::new(0.0, 1.0, 4.0);
        let mut n = NoiseGenerator::new(Some(9));

        s.set_virtual_obstacle(Direction::Back, Some(0.05));
        for _ in 0..200 {
            s.update(&truth(0.0, 0.0, 0.0), &mut n);
            for d in Direction::ALL.iter() {
                let v = s.proximity().get(*d);
                assert!(v >= 0.0 && v <= 4.0);
            }
        }
    }

    #[test]
    fn test_virtual_obstacle() {
        let mut s = SimSensors::new(0.0, 0.0, 4.0);
        let mut n = NoiseGenerator::new(Some(1));

        s.set_virtual_obstacle(Direction::Left, Some(0.2));
        s.update(&truth(0.0, 0.0, 0.0), &mut n);
        assert_eq!(s.proximity().left, 0.2);
        assert_eq!(s.proximity().min(), 0.2);

        s.clear_virtual_obstacles();
        s.update(&truth(0.0, 0.0, 0.0), &mut n);
        assert_eq!(s.proximity().left, 4.0);
    }

    #[test]
    fn test_world_obstacle() {
        let mut s = SimSensors::new(0.0, 0.0, 4.0);
        let mut n = NoiseGenerator::new(Some(1));

        s.add_obstacle(CircleObstacle { x: 2.3, y: 0.0, radius: 0.5 });
        s.update(&truth(0.0, 0.0, 0.0), &mut n);

        assert!((s.proximity().front - 1.5).abs() < 1e-12);
        assert!(s.proximity().back > s.proximity().front);

        // Turned around, the back sensor is now closest
        s.update(&truth(0.0, 0.0, std::f64::consts::PI), &mut n);
        assert!((s.proximity().back - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_visibility() {
        let mut s = SimSensors::new(0.0, 0.0, 4.0);
        let mut n = NoiseGenerator::new(Some(1));

        s.set_visibility(0.5);
        s.add_obstacle(CircleObstacle { x: 3.3, y: 0.0, radius: 0.0 });
        s.add_obstacle(CircleObstacle { x: -1.8, y: 0.0, radius: 0.0 });
        s.update(&truth(0.0, 0.0, 0.0), &mut n);

        // Front obstacle is out of the 2 m effective range, the back one is seen
        assert_eq!(s.proximity().front, 4.0);
        assert!((s.diagnostics().clean_proximity.front - 3.0).abs() < 1e-9);
        assert!((s.proximity().back - 1.5).abs() < 1e-9);

        // Never fully blind
        s.set_visibility(0.0);
        assert_eq!(s.visibility(), MIN_VISIBILITY);
        s.set_visibility(7.0);
        assert_eq!(s.visibility(), 1.0);
    }
}
