//! State observers
//!
//! Observers are called synchronously on the loop's thread after every tick, so they must not
//! block. An observer with slow work to do should hand it to another thread.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::info;
use thiserror::Error;

// Internal
use comms_if::tm::WheelchairTm;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// Receives the state snapshot after every tick.
pub trait Observer {
    fn on_tick(&mut self, tm: &WheelchairTm, dt_s: f64) -> Result<(), ObserverError>;
}

impl<F> Observer for F
where
    F: FnMut(&WheelchairTm, f64) -> Result<(), ObserverError>,
{
    fn on_tick(&mut self, tm: &WheelchairTm, dt_s: f64) -> Result<(), ObserverError> {
        self(tm, dt_s)
    }
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Logs the snapshot every `decimation` ticks.
#[derive(Debug, Clone)]
pub struct LogObserver {
    decimation: u64,
    count: u64,
}

/// Serialises each snapshot to JSON and passes it to a sink, such as a broadcast socket.
pub struct JsonObserver<S> {
    sink: S,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ObserverError {
    #[error("Could not serialise the snapshot: {0}")]
    Serialise(#[from] serde_json::Error),

    #[error("The sink failed: {0}")]
    Sink(String),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl LogObserver {
    pub fn new(decimation: u64) -> Self {
        Self {
            decimation: decimation.max(1),
            count: 0,
        }
    }
}

impl Observer for LogObserver {
    fn on_tick(&mut self, tm: &WheelchairTm, _dt_s: f64) -> Result<(), ObserverError> {
        if self.count % self.decimation == 0 {
            info!(
                "pose ({:.2}, {:.2}, {:.2}) vel ({:.2}, {:.2}) motors ({:.2}, {:.2}) \
                battery {:.2} V {:.1}% estop {} deadman {}",
                tm.x,
                tm.y,
                tm.theta,
                tm.linear_velocity,
                tm.angular_velocity,
                tm.left_motor_speed,
                tm.right_motor_speed,
                tm.battery_voltage,
                tm.battery_percent,
                tm.emergency_stop,
                tm.deadman_active
            );
        }
        self.count += 1;
        Ok(())
    }
}

impl<S> JsonObserver<S>
where
    S: FnMut(String) -> Result<(), ObserverError>,
{
    pub fn new(sink: S) -> Self {
        Self { sink }
    }
}

impl<S> Observer for JsonObserver<S>
where
    S: FnMut(String) -> Result<(), ObserverError>,
{
    fn on_tick(&mut self, tm: &WheelchairTm, _dt_s: f64) -> Result<(), ObserverError> {
        let json = serde_json::to_string(tm)?;
        (self.sink)(json)
    }
}
