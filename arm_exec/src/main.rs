//! Main arm-side executable entry point.
//!
//! # Architecture
//!
//! The general execution methodology consists of:
//!
//!     - Initialise all modules
//!     - Main loop:
//!         - Telecommand processing and handling
//!         - Arm control processing:
//!             - Joint observation acquisition
//!             - Safety boundary evaluation
//!             - Demand dispatch
//!         - Cycle rate management
//!
//! # Modules
//!
//! All modules (e.g. `arm_ctrl`) shall meet the following requirements:
//!     1. Provide a public struct implementing the `util::module::State` trait.
//!

// ---------------------------------------------------------------------------
// USE MODULES FROM LIBRARY
// ---------------------------------------------------------------------------

#[cfg(feature = "sim")]
use arm_lib::sim_arm::SimArm;
use arm_lib::{
    *,
    arm_ctrl::ArmCtrl,
    arm_driver::{ArmDriver, ArmDriverError},
    data_store::{DataStore, SafeModeCause},
};

mod exec_params;
mod tc_processor;

use exec_params::ArmExecParams;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, error, info, warn};
use serde::Serialize;
use std::env;
use std::thread;
use std::time::{Duration, Instant};
use color_eyre::{Report, eyre::{WrapErr, eyre}};

// Internal
#[cfg(feature = "sim")]
use arm_if::svc::ObservationProvider;
use util::{
    raise_error,
    host,
    module::State,
    logger::{logger_init, LevelFilter},
    rate::Rate,
    session::Session,
    script_interpreter::{ScriptInterpreter, PendingTcs},
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Limit of the number of consecutive arm service errors before safe mode
/// will be engaged.
const MAX_SVC_ERROR_LIMIT: u64 = 5;

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new(
        "arm_exec",
        "sessions"
    ).wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Trace, &session)
        .wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Arm Control Executable\n");
    info!("Running on: {}", host::get_host_description());
    info!("Session directory: {:?}\n", session.session_root);

    // ---- INITIALISE TC SOURCE ----

    let mut tc_source = TcSource::None;

    // Collect all arguments
    let args: Vec<String> = env::args().collect();

    debug!("CLI arguments: {:?}", args);

    // A single argument is used as the script path
    if args.len() == 2 {

        info!("Loading script from \"{}\"", &args[1]);

        // Load the script interpreter
        let si = ScriptInterpreter::new(
            &args[1]).wrap_err("Failed to load script")?;

        // Display some info
        info!(
            "Loaded script lasts {:.02} s and contains {} TCs\n",
            si.get_duration(),
            si.get_num_tcs()
        );

        // Set the interpreter in the source
        tc_source = TcSource::Script(si);
    }
    else {
        return Err(eyre!(
            "Expected a TC script path as the only argument, found {} arguments",
            args.len() - 1
        ));
    }

    // ---- INITIALISE DATASTORE ----

    info!("Initialising modules...");

    let exec_params: ArmExecParams = util::params::load("arm_exec.toml")
        .wrap_err("Failed to load the exec parameters")?;

    let cycle_period_s = 1.0 / exec_params.cycle_rate_hz;

    let mut ds = DataStore::default();

    // ---- INITIALISE MODULES ----

    let mut arm_ctrl = ArmCtrl::default();
    arm_ctrl.init("arm_ctrl.toml", &session)
        .wrap_err("Failed to initialise ArmCtrl")?;
    info!("ArmCtrl init complete");

    info!("Module initialisation complete\n");

    // ---- INITIALISE EQUIPMENT ----

    info!("Initialising equipment");

    #[cfg(feature = "sim")]
    let mut arm = {
        let a = SimArm::new(arm_ctrl.arm_id(), arm_ctrl.link_names());
        info!("SimArm initialised");
        a
    };

    let rate = Rate::new(exec_params.cycle_rate_hz)
        .wrap_err("Failed to initialise the cycle rate")?;

    let mut arm_driver = ArmDriver::new(arm_ctrl, rate);

    info!("Equipment initialisation complete");

    // ---- MAIN LOOP ----

    info!("Begining main loop\n");

    loop {

        // Get cycle start time
        let cycle_start_instant = Instant::now();

        // Clear items that need wiping at the start of the cycle
        ds.cycle_start(exec_params.cycle_rate_hz);

        // ---- TELECOMMAND PROCESSING ----

        match tc_source {
            // If no source no point in continuing so break
            TcSource::None => raise_error!("No TC source present"),

            TcSource::Script(ref mut si) =>
                match si.get_pending_tcs() {
                    PendingTcs::None => (),
                    PendingTcs::Some(tc_vec) => {
                        for tc in tc_vec.iter() {
                            tc_processor::exec(&mut ds, tc);
                        }
                    }
                    // Exit if end of script reached
                    PendingTcs::EndOfScript => {
                        info!("End of TC script reached, stopping");
                        break
                    }
                }
        };

        // ---- ARM CONTROL PROCESSING ----

        #[cfg(feature = "sim")]
        let slept = if ds.safe {
            // No demands leave the executable while safe
            arm_driver.make_safe();

            // Probe the services so that service-caused safe mode clears
            // once the arm is responding again
            if arm.get_observation().is_ok() {
                ds.make_unsafe(SafeModeCause::ArmSvcNotResponding).ok();
            }

            false
        }
        else {
            match arm_driver.step(&mut arm, ds.arm_cmd.take()) {
                Ok(output) => {
                    ds.arm_dems = output.dems;
                    ds.arm_ctrl_status_rpt = output.report;

                    // A full step means the services are healthy
                    ds.num_consec_svc_errors = 0;
                    ds.make_unsafe(SafeModeCause::ArmSvcNotResponding).ok();

                    output.slept
                }
                Err(ArmDriverError::CtrlError(e)) => {
                    // ArmCtrl errors usually just mean you sent the wrong TC, so just issue the
                    // warning and continue.
                    warn!("Error during ArmCtrl processing: {}", e);
                    false
                }
                Err(e) => {
                    warn!("Arm service error: {}", e);
                    ds.num_consec_svc_errors += 1;

                    // If over the limit print error and enter safe mode
                    if ds.num_consec_svc_errors > MAX_SVC_ERROR_LIMIT {
                        if !ds.safe {
                            error!(
                                "Maximum number of consecutive arm service errors ({}) has \
                                been exceeded",
                                MAX_SVC_ERROR_LIMIT
                            );
                        }
                        ds.make_safe(SafeModeCause::ArmSvcNotResponding);
                    }

                    false
                }
            }
        };

        #[cfg(not(feature = "sim"))]
        let slept = false;

        // ---- WRITE ARCHIVES ----

        arm_driver.write_archives();

        // ---- TELEMETRY ----

        // Low rate summary into the log
        if ds.is_1_hz_cycle {
            debug!(
                "Cycle {}: safe = {}, dems = {:?}",
                ds.num_cycles, ds.safe, ds.arm_dems
            );
        }

        // ---- CYCLE MANAGEMENT ----

        // The torque dispatch path sleeps on the cycle rate itself, in which
        // case pacing here again would double the period
        if slept {
            ds.num_consec_cycle_overruns = 0;
        }
        else {
            let cycle_dur = Instant::now() - cycle_start_instant;

            // Get sleep duration
            match Duration::from_secs_f64(cycle_period_s)
                .checked_sub(cycle_dur)
            {
                Some(d) => {
                    ds.num_consec_cycle_overruns = 0;
                    thread::sleep(d);
                },
                None => {
                    warn!(
                        "Cycle overran by {:.06} s",
                        cycle_dur.as_secs_f64() - cycle_period_s
                    );
                    ds.num_consec_cycle_overruns += 1;
                }
            }
        }

        // Increment cycle counter
        ds.num_cycles += 1;
    }

    // ---- SHUTDOWN ----

    info!("End of execution");

    session.save("run_summary.json", RunSummary {
        num_cycles: ds.num_cycles as u64,
        ended_safe: ds.safe,
        elapsed_time_s: ds.elapsed_time_s,
    });
    session.exit();

    Ok(())
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Various sources for the telecommands incoming to the exec.
enum TcSource {
    None,
    Script(ScriptInterpreter)
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Summary of the execution, saved into the session at shutdown.
#[derive(Serialize)]
struct RunSummary {
    num_cycles: u64,
    ended_safe: bool,
    elapsed_time_s: f64,
}
