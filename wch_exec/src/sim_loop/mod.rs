//! # Simulation loop module
//!
//! The fixed rate scheduler tying the components together. Each tick:
//!
//! 1. Pending teleoperation commands are executed.
//! 2. The controller is read.
//! 3. The safety monitor evaluates the command, and may override it.
//! 4. The drive is commanded and advanced.
//! 5. The sensors and the battery are advanced.
//! 6. The state snapshot is built and offered to the observers.
//!
//! A tick always runs to completion. [`SimLoop::run`] checks for cancellation between ticks only.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod observer;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info, trace, warn};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    mpsc::{self, Receiver, Sender},
    Arc,
};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;

// Internal
use comms_if::tc::{Tc, TcResponse};
use comms_if::tm::WheelchairTm;
use crate::{
    controller::{Controller, ControllerError, InteractiveController, InteractiveHandle},
    ctrl_family::ControllerInput,
    data_store::{CycleStats, DataStore, WheelchairState},
    drive::{DiffDrive, Drive, Pose},
    params::{Params, ParamsError},
    power::{PowerSystem, SimPower},
    safety::{Interlock, SafetyInputs, SafetyMonitor},
    sensors::{GroundTruth, NoiseGenerator, SensorSuite, SimSensors},
    tc_processor,
};
pub use observer::*;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The components ticked by the loop.
pub struct Components {
    pub controller: Box<dyn Controller + Send>,
    pub drive: Box<dyn Drive + Send>,
    pub sensors: Box<dyn SensorSuite + Send>,
    pub power: Box<dyn PowerSystem + Send>,
    pub safety: Box<dyn SafetyMonitor + Send>,
}

/// Handle used to cancel a running loop from another thread.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
}

/// The simulation loop.
///
/// Owns every component for its whole lifetime. Independent loops share nothing, so several may
/// run side by side on different threads.
pub struct SimLoop {
    pub(crate) params: Params,

    pub(crate) controller: Box<dyn Controller + Send>,
    pub(crate) drive: Box<dyn Drive + Send>,
    pub(crate) sensors: Box<dyn SensorSuite + Send>,
    pub(crate) power: Box<dyn PowerSystem + Send>,
    pub(crate) safety: Box<dyn SafetyMonitor + Send>,

    noise: NoiseGenerator,
    observers: Vec<Box<dyn Observer + Send>>,

    pub(crate) ds: DataStore,
    initial_pose: Pose,

    /// Handle on which drive telecommands are set.
    pub(crate) tc_handle: Option<InteractiveHandle>,
    tc_tx: Sender<Tc>,
    tc_rx: Receiver<Tc>,

    cancel: CancelHandle,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum LoopError {
    #[error("Invalid parameters: {0}")]
    InvalidParams(#[from] ParamsError),

    #[error("Controller error: {0}")]
    Controller(#[from] ControllerError),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl CancelHandle {
    /// Request the loop to stop after the current tick.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Clear a previous cancellation so the loop can be run again.
    pub fn clear(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

impl SimLoop {
    /// Create a loop with the simulated drive, sensors, battery and safety monitor built from the
    /// parameters.
    pub fn new(params: Params, controller: Box<dyn Controller + Send>) -> Result<Self, LoopError> {
        params.are_valid()?;

        let components = Components {
            controller,
            drive: Box::new(DiffDrive::from_params(&params)),
            sensors: Box::new(SimSensors::from_params(&params)),
            power: Box::new(SimPower::new(&params.power)),
            safety: Box::new(Interlock::from_params(&params)),
        };

        Self::from_parts(params, components)
    }

    /// Create a loop driven by an interactive controller of the configured family.
    ///
    /// Drive telecommands are set on the returned handle.
    pub fn new_interactive(params: Params) -> Result<(Self, InteractiveHandle), LoopError> {
        let controller = InteractiveController::new(params.controller_family);
        let handle = controller.handle();

        let mut sl = Self::new(params, Box::new(controller))?;
        sl.set_tc_handle(handle.clone());

        Ok((sl, handle))
    }

    /// Create a loop from any set of components.
    pub fn from_parts(params: Params, components: Components) -> Result<Self, LoopError> {
        params.are_valid()?;

        let (tc_tx, tc_rx) = mpsc::channel();

        let mut sl = Self {
            noise: NoiseGenerator::new(params.seed),
            ds: DataStore::new(Pose::default(), params.max_path_len),
            params,
            controller: components.controller,
            drive: components.drive,
            sensors: components.sensors,
            power: components.power,
            safety: components.safety,
            observers: Vec::new(),
            initial_pose: Pose::default(),
            tc_handle: None,
            tc_tx,
            tc_rx,
            cancel: CancelHandle::default(),
        };
        sl.refresh_state();

        Ok(sl)
    }

    /// Set the pose the chair starts from, and move it there.
    pub fn with_initial_pose(mut self, pose: Pose) -> Self {
        self.initial_pose = pose;
        self.reset();
        self
    }

    /// Set the handle drive telecommands are written to.
    pub fn set_tc_handle(&mut self, handle: InteractiveHandle) {
        self.tc_handle = Some(handle);
    }

    /// Register an observer, called after every tick.
    pub fn register_observer<O>(&mut self, observer: O)
    where
        O: Observer + Send + 'static,
    {
        self.observers.push(Box::new(observer));
    }

    /// Register a closure as an observer.
    pub fn register_fn<F>(&mut self, f: F)
    where
        F: FnMut(&WheelchairTm, f64) -> Result<(), ObserverError> + Send + 'static,
    {
        self.register_observer(f);
    }

    /// Connect the controller.
    pub fn connect(&mut self) -> Result<(), LoopError> {
        self.controller.connect().map_err(LoopError::from)
    }

    // ---- ACCESSORS ----

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn state(&self) -> WheelchairState {
        self.ds.state
    }

    pub fn snapshot(&self) -> WheelchairTm {
        self.ds.state.to_tm()
    }

    pub fn stats(&self) -> CycleStats {
        self.ds.stats
    }

    pub fn sim_time_s(&self) -> f64 {
        self.ds.stats.sim_time_s
    }

    /// Past poses, oldest first.
    pub fn path(&self) -> impl Iterator<Item = &Pose> {
        self.ds.path.iter()
    }

    /// Input read from the controller on the last tick.
    pub fn last_input(&self) -> ControllerInput {
        self.ds.controller_input
    }

    pub fn drive(&self) -> &dyn Drive {
        &*self.drive
    }

    pub fn sensors(&self) -> &dyn SensorSuite {
        &*self.sensors
    }

    /// Mutable access to the sensors, used to inject virtual obstacles.
    pub fn sensors_mut(&mut self) -> &mut dyn SensorSuite {
        &mut *self.sensors
    }

    pub fn power(&self) -> &dyn PowerSystem {
        &*self.power
    }

    pub fn safety(&self) -> &dyn SafetyMonitor {
        &*self.safety
    }

    pub fn controller(&self) -> &dyn Controller {
        &*self.controller
    }

    pub fn controller_mut(&mut self) -> &mut dyn Controller {
        &mut *self.controller
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Sender on which telecommands may be queued from another thread. They are executed at the
    /// start of the next tick.
    pub fn tc_sender(&self) -> Sender<Tc> {
        self.tc_tx.clone()
    }

    // ---- OPERATIONS ----

    /// Execute a telecommand immediately.
    pub fn exec_tc(&mut self, tc: &Tc) -> TcResponse {
        tc_processor::exec(self, tc)
    }

    /// Move the chair back to its initial pose at rest and clear the path. The battery and the
    /// simulation clock are kept.
    pub fn reset(&mut self) {
        info!("Simulation reset to {:?}", self.initial_pose);
        self.drive.reset_pose(self.initial_pose);
        self.ds.reset_path(self.drive.pose());
        self.refresh_state();
    }

    /// Execute one tick and return the snapshot offered to the observers.
    pub fn tick(&mut self) -> Result<WheelchairTm, LoopError> {
        let dt_s = self.params.period_s();
        let now_s = self.ds.stats.sim_time_s;

        self.ds.cycle_start();

        // ---- TELECOMMAND PROCESSING ----

        let tcs: Vec<Tc> = self.tc_rx.try_iter().collect();
        for tc in tcs.iter() {
            let response = tc_processor::exec(self, tc);
            debug!("{:?} -> {:?}", tc, response);
        }

        // ---- CONTROLLER ----

        let input = match self.controller.read_input(now_s) {
            Ok(i) => i,
            // Bad signals are treated as no input, the loop carries on
            Err(ControllerError::Signal(e)) => {
                warn!("Signal error: {}", e);
                ControllerInput::default()
            }
            Err(e) => return Err(LoopError::Controller(e)),
        };
        self.ds.controller_input = input;

        // ---- SAFETY ----

        let inputs = SafetyInputs {
            now_s,
            last_command_time_s: self.controller.last_command_time_s(),
            min_proximity_m: self.sensors.proximity().min(),
            power: self.power.condition(),
            hardware_estop: input.emergency_stop,
        };

        let safe_cmd = self.safety.evaluate(&inputs, input.command, &mut *self.drive);
        self.ds.safe_cmd = safe_cmd;

        // ---- DRIVE ----

        self.drive.set_command(safe_cmd);
        self.drive.update(dt_s);

        // ---- SENSORS AND POWER ----

        let truth = GroundTruth {
            pose: self.drive.pose(),
            velocity: self.drive.velocity(),
        };
        self.sensors.update(&truth, &mut self.noise);
        self.power.update(dt_s, self.drive.motor_speeds());

        // ---- SNAPSHOT ----

        self.refresh_state();
        self.ds.record_pose(truth.pose);
        let tm = self.ds.state.to_tm();

        trace!("Tick {} at {:.3} s: {:?}", self.ds.stats.num_cycles, now_s, tm);

        for (i, o) in self.observers.iter_mut().enumerate() {
            if let Err(e) = o.on_tick(&tm, dt_s) {
                warn!("Observer {} failed: {}", i, e);
            }
        }

        self.ds.cycle_end(dt_s);

        Ok(tm)
    }

    /// Run the loop.
    ///
    /// With a duration a bounded number of ticks is run, without one the loop runs until
    /// cancelled through its [`CancelHandle`]. Ticks are paced against the wall clock when a
    /// positive realtime factor is configured.
    pub fn run(&mut self, duration_s: Option<f64>) -> Result<CycleStats, LoopError> {
        let period_s = self.params.period_s();
        let max_ticks = duration_s.map(|d| {
            if d.is_finite() && d > 0.0 {
                (d / period_s).round() as u64
            }
            else {
                0
            }
        });

        let pacing = match self.params.realtime_factor {
            Some(f) if f > 0.0 => Some(Duration::from_secs_f64(period_s / f)),
            _ => None,
        };

        info!(
            "Running for {}, pacing {}",
            max_ticks.map_or(String::from("ever"), |n| format!("{} ticks", n)),
            pacing.map_or(String::from("disabled"), |p| format!("{:.4} s/tick", p.as_secs_f64()))
        );

        let mut num_ticks = 0u64;

        while max_ticks.map_or(true, |m| num_ticks < m) {
            if self.cancel.is_cancelled() {
                info!("Loop cancelled after {} ticks", num_ticks);
                break;
            }

            let cycle_start_instant = Instant::now();

            self.tick()?;
            num_ticks += 1;

            // ---- CYCLE MANAGEMENT ----

            if let Some(period) = pacing {
                let cycle_dur = Instant::now() - cycle_start_instant;

                match period.checked_sub(cycle_dur) {
                    Some(d) => {
                        self.ds.stats.num_consec_cycle_overruns = 0;
                        thread::sleep(d);
                    }
                    None => {
                        warn!(
                            "Cycle overran by {:.06} s",
                            cycle_dur.as_secs_f64() - period.as_secs_f64()
                        );
                        self.ds.stats.num_consec_cycle_overruns += 1;
                        self.ds.stats.num_cycle_overruns += 1;
                    }
                }
            }
        }

        Ok(self.stats())
    }

    /// Copy the component states into the data store.
    fn refresh_state(&mut self) {
        self.ds.state = WheelchairState {
            pose: self.drive.pose(),
            velocity: self.drive.velocity(),
            motor_speeds: self.drive.motor_speeds(),
            battery: self.power.state(),
            safety_state: self.safety.state(),
            deadman_active: self.safety.deadman_active(),
        };
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::controller::ScriptedController;
    use crate::ctrl_family::NormalizedCommand;
    use crate::safety::SafetyState;
    use crate::sensors::Direction;
    use std::sync::Mutex;

    fn params() -> Params {
        Params {
            seed: Some(3),
            ..Default::default()
        }
    }

    /// Single entry scripts are held past the deadman timeout otherwise.
    fn scripted_loop(script: &str) -> SimLoop {
        let c = ScriptedController::from_script_str(script, None).unwrap();
        let p = Params {
            deadman_timeout: 10.0,
            ..params()
        };
        SimLoop::new(p, Box::new(c)).unwrap()
    }

    #[test]
    fn test_not_connected() {
        let (mut sl, _h) = SimLoop::new_interactive(params()).unwrap();
        assert!(matches!(
            sl.tick(),
            Err(LoopError::Controller(ControllerError::NotConnected))
        ));
    }

    #[test]
    fn test_invalid_params() {
        let mut p = params();
        p.update_rate = 0.0;
        assert!(matches!(
            SimLoop::new_interactive(p),
            Err(LoopError::InvalidParams(_))
        ));
    }

    #[test]
    fn test_bounded_run() {
        let (mut sl, h) = SimLoop::new_interactive(params()).unwrap();
        sl.connect().unwrap();

        let seen = Arc::new(Mutex::new(0u64));
        let seen_obs = seen.clone();
        sl.register_fn(move |_tm, _dt| {
            *seen_obs.lock().unwrap() += 1;
            Ok(())
        });

        h.set_command(NormalizedCommand::new(0.5, 0.0), 0.0).unwrap();
        // Keep the deadman fed from inside the loop
        let h_obs = h.clone();
        let mut t = 0.0;
        sl.register_fn(move |_tm, dt| {
            t += dt;
            h_obs
                .set_command(NormalizedCommand::new(0.5, 0.0), t)
                .map_err(|e| ObserverError::Sink(e.to_string()))
        });

        let stats = sl.run(Some(1.0)).unwrap();

        assert_eq!(stats.num_cycles, 50);
        assert!((stats.sim_time_s - 1.0).abs() < 1e-9);
        assert_eq!(*seen.lock().unwrap(), 50);
        assert!(sl.snapshot().x > 0.0);
        assert!(!sl.snapshot().emergency_stop);
        assert_eq!(sl.path().count(), 51);
    }

    #[test]
    fn test_failing_observer_isolated() {
        let (mut sl, _h) = SimLoop::new_interactive(params()).unwrap();
        sl.connect().unwrap();

        let calls = Arc::new(Mutex::new(0u64));
        let c = calls.clone();
        sl.register_fn(|_tm, _dt| Err(ObserverError::Sink(String::from("unplugged"))));
        sl.register_fn(move |_tm, _dt| {
            *c.lock().unwrap() += 1;
            Ok(())
        });

        sl.run(Some(0.1)).unwrap();
        assert_eq!(*calls.lock().unwrap(), 5);
    }

    #[test]
    fn test_cancel() {
        let (mut sl, _h) = SimLoop::new_interactive(params()).unwrap();
        sl.connect().unwrap();

        let cancel = sl.cancel_handle();
        let mut n = 0;
        sl.register_fn(move |_tm, _dt| {
            n += 1;
            if n == 10 {
                cancel.cancel();
            }
            Ok(())
        });

        let stats = sl.run(None).unwrap();
        assert_eq!(stats.num_cycles, 10);
    }

    #[test]
    fn test_reset_keeps_battery() {
        let script = "0.0: {\"cmd\": {\"linear\": 1.0, \"angular\": 0.2}};";
        let mut sl = scripted_loop(script).with_initial_pose(Pose::new(1.0, -1.0, 0.5));
        sl.connect().unwrap();

        sl.run(Some(2.0)).unwrap();
        let before = sl.snapshot();
        assert!(before.battery_percent < 100.0);
        assert!(before.x != 1.0);
        assert!(!before.emergency_stop);

        sl.reset();
        let after = sl.snapshot();
        assert_eq!((after.x, after.y, after.theta), (1.0, -1.0, 0.5));
        assert_eq!(after.linear_velocity, 0.0);
        assert_eq!(after.battery_percent, before.battery_percent);
        assert_eq!(sl.path().count(), 1);
        assert!((sl.sim_time_s() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_virtual_obstacle_stops() {
        let script = "0.0: {\"cmd\": {\"linear\": 0.5, \"angular\": 0.0}};";
        let mut sl = scripted_loop(script);
        sl.connect().unwrap();

        sl.run(Some(0.5)).unwrap();
        assert_eq!(sl.safety().state(), SafetyState::Normal);

        sl.sensors_mut().set_virtual_obstacle(Direction::Front, Some(0.1));
        // One tick for the sensors to see it, one for the monitor to act
        sl.tick().unwrap();
        let tm = sl.tick().unwrap();

        assert!(tm.emergency_stop);
        assert_eq!(tm.left_motor_speed, 0.0);
        assert_eq!(tm.right_motor_speed, 0.0);
    }
}
