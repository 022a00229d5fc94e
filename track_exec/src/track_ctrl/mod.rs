//! # Tracking control module
//!
//! Steers the detected spot along a waypoint path by driving two independent PID controllers, one
//! per image axis. The module owns the calibration points, the current path and its cursor, and
//! moves between modes in response to text commands or path completion.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod calib;
mod params;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Serialize;

// Internal
pub use calib::*;
pub use params::*;
pub use state::*;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// A waypoint is reached once the spot is strictly closer than this to it.
///
/// Units: pixels
pub const WAYPOINT_REACHED_PX: f64 = 6.0;

/// The maximum number of border calibration points.
pub const MAX_BORDER_POINTS: usize = 4;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The possible modes of execution of TrackCtrl.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize)]
pub enum Mode {
    /// Nothing to do, no actuator output.
    Idle,

    /// Capturing the origin point. Transient, returns to `Idle` in the same cycle.
    CalibrateOrigin,

    /// Capturing a border point. Transient, returns to `Idle` in the same cycle.
    CalibrateBorder,

    /// Following the densified border path.
    FollowBorder,

    /// Following the path back to the origin.
    ResetToOrigin,

    /// Publishing the detected polygon every cycle.
    ClosedTrack,
}

/// Possible errors that can occur during TrackCtrl operation.
#[derive(Debug, thiserror::Error)]
pub enum TrackCtrlError {
    #[error("Could not load parameters: {0}")]
    ParamLoadError(util::params::LoadError),

    #[error("The border already holds {0} points")]
    BorderFull(usize),
}

impl Default for Mode {
    fn default() -> Self {
        Mode::Idle
    }
}
