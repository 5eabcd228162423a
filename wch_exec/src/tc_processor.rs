//! # Telecommand processor module
//!
//! The telecommand processor handles the TCs relayed by the teleoperation daemon.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, warn};

// Internal
use comms_if::tc::{Tc, TcResponse};
use crate::{ctrl_family::NormalizedCommand, safety::ResetOutcome, sim_loop::SimLoop};

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Execute a telecommand.
///
/// Drive commands are written to the loop's interactive handle, stop and reset requests go to the
/// safety monitor.
pub(crate) fn exec(sl: &mut SimLoop, tc: &Tc) -> TcResponse {
    match tc {
        Tc::Heartbeat => {
            debug!("Received Heartbeat");
            TcResponse::Ok
        }
        Tc::Drive(d) => {
            if let Err(e) = d.validate() {
                warn!("Invalid drive command: {}", e);
                return TcResponse::Invalid;
            }

            let handle = match sl.tc_handle {
                Some(ref h) => h,
                None => {
                    warn!("Drive command received but the controller doesn't accept telecommands");
                    return TcResponse::CannotExecute;
                }
            };

            // The sender's clock may run ahead of the loop's, a stamp from the future would keep
            // the deadman from ever tripping
            let stamp_s = d.timestamp_s.min(sl.ds.stats.sim_time_s);

            match handle.set_command(NormalizedCommand::new(d.linear, d.angular), stamp_s) {
                Ok(()) => TcResponse::Ok,
                Err(e) => {
                    warn!("Could not set drive command: {}", e);
                    TcResponse::CannotExecute
                }
            }
        }
        Tc::EStop => {
            debug!("Received EStop command");
            sl.safety.request_estop();
            TcResponse::Ok
        }
        Tc::Reset => {
            debug!("Received Reset command");
            match sl.safety.request_reset(sl.ds.stats.sim_time_s) {
                ResetOutcome::Reset | ResetOutcome::AlreadyNormal => TcResponse::Ok,
                ResetOutcome::Rejected(causes) => {
                    warn!("Reset rejected, still active: {:?}", causes);
                    TcResponse::CannotExecute
                }
            }
        }
    }
}
