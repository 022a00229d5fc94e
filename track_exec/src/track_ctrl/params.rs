//! Parameters structure for TrackCtrl

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

use crate::{path::ResetPathKind, pid::PidParams};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for tracking control.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Params {

    // ---- PATHS ----

    /// Number of waypoints generated along each path edge.
    pub segments_per_edge: usize,

    /// Shape of the path back to the origin.
    pub reset_path: ResetPathKind,

    // ---- CONTROL ----

    /// Controller for the image x axis.
    pub pid_x: PidParams,

    /// Controller for the image y axis.
    pub pid_y: PidParams,

    // ---- MONITORING ----

    /// Maximum number of cycles spent on a single waypoint before the path is abandoned.
    ///
    /// `None` disables the watchdog.
    pub max_ticks_per_waypoint: Option<u64>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Params {
    fn default() -> Self {
        Self {
            segments_per_edge: 20,
            reset_path: ResetPathKind::default(),
            pid_x: PidParams::default(),
            pid_y: PidParams::default(),
            max_ticks_per_waypoint: None,
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_partial_file_uses_defaults() {
        let params: Params = toml::from_str(
            r#"
            reset_path = "closed_loop"
            max_ticks_per_waypoint = 300
            "#,
        )
        .unwrap();

        assert_eq!(params.segments_per_edge, 20);
        assert_eq!(params.reset_path, ResetPathKind::ClosedLoop);
        assert_eq!(params.max_ticks_per_waypoint, Some(300));
        assert_eq!(params.pid_x, PidParams::default());
    }
}
