//! # Tracking library.
//!
//! This library allows other crates in the workspace, and the integration tests, to access items
//! defined inside the tracking crate.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Actuator mapper - converts PID outputs into servo demand packets
pub mod act_map;

/// Detection - spot and vertex detection capabilities and the detection handoff
pub mod det;

/// Parameters for the tracking executable
pub mod params;

/// Path planning - waypoint generation along edges, polygon sorting and closing
pub mod path;

/// PID controllers - positional and incremental variants
pub mod pid;

/// Serial link - TCs, servo demands and status frames over serial ports
pub mod serial_link;

/// Servo control - angle servos driven directly from the PID outputs
pub mod servo_ctrl;

/// Tracking control module - the tracking state machine
pub mod track_ctrl;
