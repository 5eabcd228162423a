//! Interactive controller
//!
//! Inputs are set from outside the loop (a keyboard or gamepad bridge, or the teleoperation
//! daemon) through an [`InteractiveHandle`] and held until overwritten.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info};
use std::sync::{Arc, Mutex, MutexGuard};

// Internal
use comms_if::eqpt::RawSignal;
use crate::ctrl_family::{ControllerFamily, ControllerInput, NormalizedCommand, SignalProcessor};
use super::{Controller, ControllerError};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Controller returning the last input set through its handle.
#[derive(Debug, Clone)]
pub struct InteractiveController {
    handle: InteractiveHandle,
    connected: bool,
}

/// Cloneable, thread safe handle used to set the input of an [`InteractiveController`].
#[derive(Debug, Clone, Default)]
pub struct InteractiveHandle {
    shared: Arc<Mutex<Shared>>,
}

#[derive(Debug, Default)]
struct Shared {
    processor: Option<SignalProcessor>,
    held: Held,
    last_command_time_s: Option<f64>,
}

#[derive(Debug, Copy, Clone)]
enum Held {
    Cmd(NormalizedCommand),
    Signal(RawSignal),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Held {
    fn default() -> Self {
        Held::Cmd(NormalizedCommand::zero())
    }
}

impl InteractiveController {
    /// Create a new controller. Raw signals are only accepted if a family is given.
    pub fn new(family: Option<ControllerFamily>) -> Self {
        let shared = Shared {
            processor: family.map(SignalProcessor::new),
            ..Default::default()
        };

        Self {
            handle: InteractiveHandle {
                shared: Arc::new(Mutex::new(shared)),
            },
            connected: false,
        }
    }

    /// Get a handle with which to set the controller's input.
    pub fn handle(&self) -> InteractiveHandle {
        self.handle.clone()
    }
}

impl InteractiveHandle {
    fn lock(&self) -> Result<MutexGuard<'_, Shared>, ControllerError> {
        self.shared.lock().map_err(|_| ControllerError::Poisoned)
    }

    /// Set a direct command, received at the given simulation time.
    pub fn set_command(&self, cmd: NormalizedCommand, timestamp_s: f64) -> Result<(), ControllerError> {
        let mut s = self.lock()?;
        s.held = Held::Cmd(NormalizedCommand::new(cmd.linear, cmd.angular));
        s.last_command_time_s = Some(timestamp_s);
        Ok(())
    }

    /// Set a raw signal, received at the given simulation time.
    ///
    /// The signal is checked against the configured family and rejected if it doesn't match,
    /// leaving the held input unchanged.
    pub fn set_raw_signal(&self, signal: RawSignal, timestamp_s: f64) -> Result<(), ControllerError> {
        let mut s = self.lock()?;

        match s.processor {
            Some(ref p) => p.check(&signal)?,
            None => return Err(ControllerError::NoFamily),
        }

        s.held = Held::Signal(signal);
        s.last_command_time_s = Some(timestamp_s);
        Ok(())
    }

    /// Change the controller family. Any held raw signal is replaced by the stop command.
    pub fn set_controller_family(&self, family: Option<ControllerFamily>) -> Result<(), ControllerError> {
        let mut s = self.lock()?;

        s.processor = family.map(SignalProcessor::new);
        if let Held::Signal(_) = s.held {
            s.held = Held::default();
        }

        debug!("Interactive controller family set to {:?}", family);
        Ok(())
    }

    /// Family currently configured.
    pub fn controller_family(&self) -> Result<Option<ControllerFamily>, ControllerError> {
        Ok(self.lock()?.processor.map(|p| p.family()))
    }

    fn zero(&self) -> Result<(), ControllerError> {
        self.lock()?.held = Held::default();
        Ok(())
    }
}

impl Controller for InteractiveController {
    fn connect(&mut self) -> Result<(), ControllerError> {
        if !self.connected {
            info!("Interactive controller connected");
            self.connected = true;
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn read_input(&mut self, now_s: f64) -> Result<ControllerInput, ControllerError> {
        if !self.connected {
            return Err(ControllerError::NotConnected);
        }

        // Copy out under the lock so a concurrent write is never seen half done
        let (held, processor) = {
            let mut s = self.handle.lock()?;

            // A command can't have been received after now, so a stamp ahead of the loop clock
            // is pulled back to it and ages from there
            if let Some(t) = s.last_command_time_s {
                if t > now_s {
                    s.last_command_time_s = Some(now_s);
                }
            }

            (s.held, s.processor)
        };

        match held {
            Held::Cmd(c) => Ok(ControllerInput::from_command(c)),
            Held::Signal(sig) => match processor {
                Some(p) => Ok(p.process(&sig)?),
                None => Err(ControllerError::NoFamily),
            },
        }
    }

    fn disconnect(&mut self) {
        if self.connected {
            info!("Interactive controller disconnected");
        }
        self.connected = false;

        // Nothing to do if the lock is poisoned, reads will fail anyway
        self.handle.zero().ok();
    }

    fn last_command_time_s(&self) -> Option<f64> {
        self.handle.lock().ok().and_then(|s| s.last_command_time_s)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use comms_if::eqpt::{AnalogSignal, BusSignal};
    use std::thread;

    #[test]
    fn test_hold() {
        let mut c = InteractiveController::new(None);
        let h = c.handle();

        assert!(matches!(c.read_input(0.0), Err(ControllerError::NotConnected)));
        c.connect().unwrap();

        assert!(c.read_input(0.0).unwrap().command.is_zero());
        assert_eq!(c.last_command_time_s(), None);

        h.set_command(NormalizedCommand::new(0.4, -0.1), 1.5).unwrap();
        for _ in 0..3 {
            assert_eq!(c.read_input(2.0).unwrap().command, NormalizedCommand::new(0.4, -0.1));
        }
        assert_eq!(c.last_command_time_s(), Some(1.5));

        c.disconnect();
        c.connect().unwrap();
        assert!(c.read_input(3.0).unwrap().command.is_zero());
    }

    #[test]
    fn test_future_stamp_pulled_back() {
        let mut c = InteractiveController::new(None);
        let h = c.handle();
        c.connect().unwrap();

        h.set_command(NormalizedCommand::new(1.0, 0.0), 1.7e9).unwrap();
        c.read_input(2.0).unwrap();
        assert_eq!(c.last_command_time_s(), Some(2.0));

        // Ages from the first read
        c.read_input(3.0).unwrap();
        assert_eq!(c.last_command_time_s(), Some(2.0));
    }

    #[test]
    fn test_raw_signal() {
        let mut c = InteractiveController::new(Some(ControllerFamily::Rnet));
        let h = c.handle();
        c.connect().unwrap();

        h.set_raw_signal(AnalogSignal::new(2.5, 5.0, true).into(), 0.0).unwrap();
        assert_eq!(c.read_input(0.0).unwrap().command.linear, 1.0);

        // Mismatch is reported and the held signal is kept
        assert!(matches!(
            h.set_raw_signal(BusSignal::new(1.0, 0.0, true).into(), 0.1),
            Err(ControllerError::Signal(_))
        ));
        assert_eq!(c.read_input(0.1).unwrap().command.linear, 1.0);
        assert_eq!(c.last_command_time_s(), Some(0.0));

        // Changing family drops the held signal
        h.set_controller_family(Some(ControllerFamily::LinxDx)).unwrap();
        assert!(c.read_input(0.2).unwrap().command.is_zero());
        assert_eq!(h.controller_family().unwrap(), Some(ControllerFamily::LinxDx));
        h.set_raw_signal(BusSignal::new(1.0, 0.0, true).into(), 0.3).unwrap();
        assert_eq!(c.read_input(0.3).unwrap().command.linear, 1.0);
    }

    #[test]
    fn test_no_family() {
        let c = InteractiveController::new(None);
        let r = c.handle().set_raw_signal(AnalogSignal::new(2.5, 2.5, true).into(), 0.0);
        assert!(matches!(r, Err(ControllerError::NoFamily)));
    }

    #[test]
    fn test_concurrent_writes() {
        let mut c = InteractiveController::new(None);
        c.connect().unwrap();

        let writers: Vec<_> = (0..4)
            .map(|i| {
                let h = c.handle();
                thread::spawn(move || {
                    for j in 0..100 {
                        let v = if (i + j) % 2 == 0 { 0.5 } else { -0.5 };
                        h.set_command(NormalizedCommand::new(v, v), j as f64).unwrap();
                    }
                })
            })
            .collect();

        for _ in 0..100 {
            let cmd = c.read_input(0.0).unwrap().command;
            // Both axes always come from the same write
            assert_eq!(cmd.linear, cmd.angular);
        }

        for w in writers {
            w.join().unwrap();
        }
    }
}
