//! Main tracking executable entry point.
//!
//! # Architecture
//!
//! The general execution methodology consists of:
//!
//!     - Initialise the session, logging and parameters
//!     - Open the command and detection links, start the detection reader
//!     - Main loop:
//!         - Snapshot the latest detections
//!         - Poll for a TC
//!         - Tracking control processing
//!         - Actuation (serial demand packets or angle servos)
//!         - Status frame emission
//!
//! An actuation failure puts the exec into safe mode, in which nothing is actuated. Safe mode is
//! left on the next valid TC.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{Report, eyre::{WrapErr, eyre}};
use log::{debug, info, trace, warn};
use serialport::SerialPort;
use std::thread;
use std::time::Instant;
use structopt::StructOpt;

// Internal
use track_lib::{
    det::{DetectionSlot, SlidingFilter},
    params::{Actuation, TrackExecParams},
    serial_link::{DetectionReader, SerialLink},
    servo_ctrl::{rpi_pwm::RpiPwm, ServoChannel},
    track_ctrl::{InputData, OutputData, TrackCtrl},
};
use util::{
    logger::{logger_init, parse_level},
    module::State,
    session::Session,
    time::millis_to_std,
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Parameter file for tracking control.
const TRACK_CTRL_PARAMS: &str = "track_ctrl.toml";

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Command line options.
#[derive(Debug, StructOpt)]
#[structopt(name = "track_exec", about = "Visual-feedback spot tracking executable")]
struct Opt {
    /// Parameter file for the executable, relative to the params directory
    #[structopt(short, long, default_value = "track_exec.toml")]
    params: String,

    /// Minimum log level, one of info, debug or trace
    #[structopt(short, long, default_value = "debug")]
    log_level: String,
}

/// The actuation backend in use.
enum Actuator {
    SerialPacket,
    AngleServo {
        pwm: RpiPwm,
        pan: ServoChannel<u32>,
        tilt: ServoChannel<u32>,
    },
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {

    let opt = Opt::from_args();

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new(
        "track_exec",
        "sessions"
    ).wrap_err("Failed to create the session")?;

    // Initialise logger
    let log_level = parse_level(&opt.log_level)
        .ok_or_else(|| eyre!("Unknown log level {:?}", opt.log_level))?;
    logger_init(log_level, &session)
        .wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Spot Tracking Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let params: TrackExecParams = util::params::load(&opt.params)
        .wrap_err("Could not load exec params")?;
    let cycle_period = params.cycle_period()
        .wrap_err("Invalid exec params")?;

    info!("Exec parameters loaded");

    // ---- INITIALISE MODULES ----

    info!("Initialising modules...");

    let mut track_ctrl = TrackCtrl::default();
    track_ctrl.init(TRACK_CTRL_PARAMS, &session)
        .wrap_err("Failed to initialise TrackCtrl")?;
    info!("TrackCtrl init complete");

    let mut filter = SlidingFilter::new(&params.det_filter.weights);
    if params.det_filter.enabled {
        info!("Detection filter enabled, weights {:?}", params.det_filter.weights);
    }

    let mut actuator = init_actuator(&params.actuation)
        .wrap_err("Failed to initialise actuation")?;

    info!("Module initialisation complete\n");

    // ---- INITIALISE LINKS ----

    info!("Initialising serial links");

    let read_timeout = millis_to_std(params.port_read_timeout_ms);

    let mut link = SerialLink::open(
        &params.cmd_port,
        params.cmd_baud,
        read_timeout,
        millis_to_std(params.cmd_timeout_ms)
    ).wrap_err("Failed to open the command link")?;

    let det_slot = DetectionSlot::new();
    let _det_worker = DetectionReader::open(
        &params.det_port,
        params.det_baud,
        read_timeout,
        det_slot.clone()
    )
        .wrap_err("Failed to open the detection link")?
        .spawn()
        .wrap_err("Failed to start the detection reader")?;

    info!("Serial link initialisation complete");

    // ---- MAIN LOOP ----

    info!("Beginning main loop\n");

    let mut spot = None;
    let mut safe_mode = false;
    let mut num_cycles: u64 = 0;

    loop {

        // Get cycle start time
        let cycle_start_instant = Instant::now();

        // ---- DETECTION ----

        let snapshot = det_slot.snapshot();

        // Without a new detection the last spot stands, and the filter isn't fed it again
        if snapshot.fresh {
            spot = match snapshot.spot {
                Some(s) if params.det_filter.enabled => Some(filter.push(s)),
                s => s,
            };
        }

        // ---- TELECOMMANDS ----

        let cmd = match link.poll_cmd() {
            Ok(c) => c,
            Err(e) => {
                warn!("Command link error: {}", e);
                None
            }
        };

        if safe_mode && cmd.is_some() {
            info!("Received valid TC, exiting safe mode");
            safe_mode = false;
        }

        // ---- TRACKING CONTROL ----

        let input = InputData {
            spot,
            vertices: snapshot.vertices,
            cmd,
        };

        let output = match track_ctrl.proc(&input) {
            Ok((o, r)) => {
                trace!("TrackCtrl status: {:?}", r);
                Some(o)
            },
            Err(e) => {
                warn!("TrackCtrl processing error: {}", e);
                None
            }
        };

        // ---- ACTUATION ----

        if let Some(ref output) = output {
            if !safe_mode {
                if let Err(e) = actuate(&mut actuator, &mut link, output) {
                    warn!("Actuation failed, entering safe mode: {:#}", e);
                    safe_mode = true;
                    track_ctrl.make_safe();
                }
            }

            if let Some(ref polygon) = output.track_polygon {
                debug!("Closed track: {:?}", polygon);
            }

            // ---- STATUS ----

            if params.emit_status {
                if let Err(e) = link.send_status(&output.status) {
                    warn!("Could not send status: {}", e);
                }
            }
        }

        // ---- CYCLE MANAGEMENT ----

        let cycle_dur = Instant::now() - cycle_start_instant;

        // Get sleep duration
        match cycle_period.checked_sub(cycle_dur) {
            Some(d) => thread::sleep(d),
            None => warn!(
                "Cycle {} overran by {:.06} s",
                num_cycles,
                cycle_dur.as_secs_f64() - cycle_period.as_secs_f64()
            )
        }

        num_cycles += 1;
    }
}

/// Set up the actuation backend, moving any servos to their start angles.
fn init_actuator(actuation: &Actuation) -> Result<Actuator, Report> {
    match actuation {
        Actuation::SerialPacket => {
            info!("Actuation by servo demand packets on the command link");
            Ok(Actuator::SerialPacket)
        },
        Actuation::AngleServo(p) => {
            let mut pwm = RpiPwm::open(&[p.pan.channel, p.tilt.channel])
                .wrap_err("Failed to set up the PWM channels")?;

            let mut pan = ServoChannel::from_params(&p.pan, p.pan.channel);
            let mut tilt = ServoChannel::from_params(&p.tilt, p.tilt.channel);

            pan.hold(&mut pwm).wrap_err("Failed to move the pan servo to its start angle")?;
            tilt.hold(&mut pwm).wrap_err("Failed to move the tilt servo to its start angle")?;

            info!(
                "Actuation by angle servos, pan at {:.1} deg, tilt at {:.1} deg",
                pan.angle_deg(),
                tilt.angle_deg()
            );

            Ok(Actuator::AngleServo { pwm, pan, tilt })
        }
    }
}

/// Actuate the output of tracking control.
fn actuate(
    actuator: &mut Actuator,
    link: &mut SerialLink<Box<dyn SerialPort>>,
    output: &OutputData
) -> Result<(), Report> {
    match actuator {
        Actuator::SerialPacket => {
            if let Some(ref dems) = output.servo_dems {
                link.send_servo_dems(dems)?;
            }
        },
        Actuator::AngleServo { pwm, pan, tilt } => {
            if let Some((x, y)) = output.pid_output {
                pan.apply_pid_output(pwm, x).wrap_err("Pan servo")?;
                tilt.apply_pid_output(pwm, y).wrap_err("Tilt servo")?;
            }
        }
    }

    Ok(())
}
