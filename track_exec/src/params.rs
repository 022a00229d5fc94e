//! # Tracking Executable Parameters
//!
//! This module provides parameters for the tracking executable.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Deserialize;
use std::time::Duration;

use crate::{
    det::FilterParams,
    servo_ctrl::ServoChannelParams,
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct TrackExecParams {

    // ---- CYCLE ----

    /// Target period of one cycle.
    ///
    /// Units: seconds
    pub cycle_period_s: f64,

    // ---- COMMAND LINK ----

    /// Serial device carrying TCs in and servo demands and status out
    pub cmd_port: String,

    /// Baud rate of the command link
    pub cmd_baud: u32,

    /// Maximum time spent waiting for the rest of a partially received TC.
    ///
    /// Units: milliseconds
    pub cmd_timeout_ms: i64,

    /// Emit a status frame on the command link every cycle
    pub emit_status: bool,

    // ---- DETECTION LINK ----

    /// Serial device on which the vision collaborator sends detection frames
    pub det_port: String,

    /// Baud rate of the detection link
    pub det_baud: u32,

    /// Filter applied to spot detections
    pub det_filter: FilterParams,

    /// Timeout of a single read on either port.
    ///
    /// Units: milliseconds
    pub port_read_timeout_ms: i64,

    // ---- ACTUATION ----

    /// How the PID outputs are turned into motion
    pub actuation: Actuation,
}

/// Servo channels used by the [`Actuation::AngleServo`] backend.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct AngleServoParams {
    /// Pan servo, driven by the x axis controller
    pub pan: ServoChannelParams,

    /// Tilt servo, driven by the y axis controller
    pub tilt: ServoChannelParams,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Errors in the exec parameter values.
#[derive(Debug, thiserror::Error)]
pub enum TrackExecParamsError {
    #[error("Cycle period must be a positive number of seconds, got {0}")]
    InvalidCyclePeriod(f64),
}

/// The available actuation backends.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum Actuation {
    /// Send `0xFF x y 0xFE` demand packets on the command link
    SerialPacket,

    /// Drive pan/tilt angle servos directly
    AngleServo(AngleServoParams),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for TrackExecParams {
    fn default() -> Self {
        Self {
            cycle_period_s: 0.05,
            cmd_port: String::from("/dev/ttyS0"),
            cmd_baud: 9600,
            cmd_timeout_ms: 100,
            emit_status: true,
            det_port: String::from("/dev/ttyS1"),
            det_baud: 115200,
            det_filter: FilterParams::default(),
            port_read_timeout_ms: 5,
            actuation: Actuation::default(),
        }
    }
}

impl TrackExecParams {
    /// The target cycle period.
    pub fn cycle_period(&self) -> Result<Duration, TrackExecParamsError> {
        match Duration::try_from_secs_f64(self.cycle_period_s) {
            Ok(d) if d > Duration::ZERO => Ok(d),
            _ => Err(TrackExecParamsError::InvalidCyclePeriod(self.cycle_period_s)),
        }
    }
}

impl Default for Actuation {
    fn default() -> Self {
        Actuation::SerialPacket
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
