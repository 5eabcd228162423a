//! Wheelchair simulation executable entry point.
//!
//! # Architecture
//!
//! The executable builds a [`SimLoop`] from a parameter file and runs it:
//!
//!     - With `--script` the chair is driven by a scripted controller, and the loop runs for the
//!       script's duration (or `--duration`).
//!     - Otherwise the chair is driven by telecommands, read as JSON lines from stdin, until stdin
//!       is closed.
//!
//! A scenario and the wear of an aged chair can be applied on top of the parameters. Telemetry is
//! logged every second.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{eyre::WrapErr, Report};
use log::{info, warn};
use std::io::{self, BufRead};
use std::path::PathBuf;
use std::thread;
use structopt::StructOpt;

// Internal
use comms_if::tc::Tc;
use util::{
    logger::{logger_init, LevelFilter},
    session::Session,
};
use wch_lib::{
    controller::ScriptedController,
    ctrl_family::ControllerFamily,
    params::{Params, WheelchairModel},
    scenario::{Degradation, Scenario},
    sim_loop::{LogObserver, SimLoop},
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Powered wheelchair teleoperation simulator.
#[derive(Debug, StructOpt)]
#[structopt(name = "wch_exec")]
struct Opt {
    /// Path to the parameter file, the defaults are used if not given.
    #[structopt(short, long, parse(from_os_str))]
    params: Option<PathBuf>,

    /// Path to a drive script. Without one telecommands are read from stdin.
    #[structopt(short, long, parse(from_os_str))]
    script: Option<PathBuf>,

    /// Simulated duration in seconds.
    #[structopt(short, long)]
    duration: Option<f64>,

    /// Wheelchair model preset (standard, heavy_duty, lightweight, racing).
    #[structopt(short, long)]
    model: Option<WheelchairModel>,

    /// Controller family to emulate, overrides the parameter file.
    #[structopt(short, long)]
    family: Option<ControllerFamily>,

    /// Operating environment (default, urban, outdoor, testing, extreme).
    #[structopt(long)]
    scenario: Option<Scenario>,

    /// Motor wear in (0, 1], 1 for new motors.
    #[structopt(long)]
    wear: Option<f64>,

    /// Battery health in (0, 1], 1 for a new pack.
    #[structopt(long)]
    battery_health: Option<f64>,

    /// Log at debug level.
    #[structopt(short, long)]
    verbose: bool,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    let opt = Opt::from_args();

    // ---- EARLY INITIALISATION ----

    // Sessions go in the software root if it's set, or in the working directory otherwise
    let session = Session::new("wch_exec", "sessions")
        .or_else(|_| Session::in_dir("wch_exec", "sessions"))
        .wrap_err("Failed to create the session")?;

    let level = match opt.verbose {
        true => LevelFilter::Debug,
        false => LevelFilter::Info,
    };
    logger_init(level, Some(&session)).wrap_err("Failed to initialise logging")?;

    info!("Wheelchair Simulation Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let mut params: Params = match opt.params {
        Some(ref p) => util::params::load_from_path(p)
            .wrap_err_with(|| format!("Could not load params from {:?}", p))?,
        None => Params::load_or_default("wch_exec.toml")
            .wrap_err("Could not load params from the software root")?,
    };

    if let Some(m) = opt.model {
        params.apply_model(m);
    }
    if opt.family.is_some() {
        params.controller_family = opt.family;
    }
    if opt.wear.is_some() || opt.battery_health.is_some() {
        Degradation::new(opt.wear.unwrap_or(1.0), opt.battery_health.unwrap_or(1.0))
            .wrap_err("Invalid degradation")?
            .apply(&mut params);
    }

    params.are_valid().wrap_err("Invalid parameters")?;

    info!("Exec parameters loaded: {:#?}", params);

    // ---- INITIALISE LOOP ----

    let (mut sim_loop, script_duration_s) = match opt.script {
        Some(ref path) => {
            info!("Loading script from {:?}", path);

            let controller = ScriptedController::new(path, params.controller_family)
                .wrap_err("Failed to load script")?;
            let script_duration_s = controller.get_duration();

            let sl = SimLoop::new(params, Box::new(controller))
                .wrap_err("Failed to initialise the simulation")?;

            (sl, Some(script_duration_s))
        }
        None => {
            let (sl, _handle) = SimLoop::new_interactive(params)
                .wrap_err("Failed to initialise the simulation")?;

            spawn_stdin_reader(&sl);
            (sl, None)
        }
    };

    if let Some(s) = opt.scenario {
        s.apply(sim_loop.sensors_mut());
    }

    let decimation = sim_loop.params().update_rate.round().max(1.0) as u64;
    sim_loop.register_observer(LogObserver::new(decimation));

    sim_loop.connect().wrap_err("Failed to connect the controller")?;

    // ---- MAIN LOOP ----

    // A script runs until the deadman stops the chair after its last entry, unless told otherwise
    let duration = match (opt.duration, script_duration_s) {
        (Some(d), _) => Some(d),
        (None, Some(d)) => {
            let p = sim_loop.params();
            Some(d + p.deadman_timeout + 2.0 * p.period_s())
        }
        (None, None) => None,
    };

    let stats = sim_loop.run(duration).wrap_err("Simulation failed")?;
    sim_loop.controller_mut().disconnect();

    // ---- SHUTDOWN ----

    let tm = sim_loop.snapshot();
    info!("End of simulation\n");
    info!("Cycles: {} ({:.2} s simulated)", stats.num_cycles, stats.sim_time_s);
    info!("Cycle overruns: {}", stats.num_cycle_overruns);
    info!(
        "Final pose: ({:.3}, {:.3}, {:.3}), battery {:.1} %",
        tm.x, tm.y, tm.theta, tm.battery_percent
    );
    for alert in sim_loop.safety().alerts().iter() {
        info!("    [{:8.3}] {:?}: {}", alert.timestamp_s, alert.level, alert.message);
    }

    Ok(())
}

/// Read telecommands from stdin on another thread. The loop is cancelled when stdin closes.
fn spawn_stdin_reader(sim_loop: &SimLoop) {
    let tx = sim_loop.tc_sender();
    let cancel = sim_loop.cancel_handle();

    thread::spawn(move || {
        let stdin = io::stdin();

        for line in stdin.lock().lines() {
            let line = match line {
                Ok(l) => l,
                Err(e) => {
                    warn!("Could not read stdin: {}", e);
                    break;
                }
            };

            if line.trim().is_empty() {
                continue;
            }

            match Tc::from_json(&line) {
                Ok(tc) => {
                    if tx.send(tc).is_err() {
                        break;
                    }
                }
                Err(e) => warn!("Rejected telecommand: {}", e),
            }
        }

        info!("Stdin closed, stopping");
        cancel.cancel();
    });
}
