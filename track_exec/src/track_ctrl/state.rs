//! Implementations for the TrackCtrl state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info, trace, warn};
use serde::Serialize;

// Internal
use super::{CalibrationSet, Mode, Params, TrackCtrlError, WAYPOINT_REACHED_PX};
use crate::{
    act_map::ActuatorMapper,
    path::{self, Point2D},
    pid::{AxisPid, PidController},
};
use comms_if::{
    eqpt::{coords::CoordQuad, servo::ServoDems},
    tc::Tc,
};
use util::{module::State, params, session::Session};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Tracking control module state
pub struct TrackCtrl {
    params: Params,

    mode: Mode,

    calib: CalibrationSet,

    /// The path currently being followed.
    waypoints: Vec<Point2D>,

    /// Index of the current target within `waypoints`.
    cursor: usize,

    /// Waypoints reached on the current path, in order.
    completed: Vec<Point2D>,

    /// Last known position of the spot, kept through detection dropouts.
    last_spot: Point2D,

    /// Number of cycles spent on the current waypoint.
    ticks_on_waypoint: u64,

    /// The polygon published in closed track mode.
    track_polygon: Vec<Point2D>,

    pid_x: AxisPid,
    pid_y: AxisPid,

    report: StatusReport,
}

/// Input data to Tracking Control.
#[derive(Debug, Default, Clone)]
pub struct InputData {
    /// The spot position detected on this cycle, or `None` if it wasn't found.
    pub spot: Option<Point2D>,

    /// Polygon vertex markers detected on this cycle, in no particular order.
    pub vertices: Vec<Point2D>,

    /// The command received on this cycle, if any.
    pub cmd: Option<Tc>,
}

/// Output from TrackCtrl.
#[derive(Debug, Clone, Serialize)]
pub struct OutputData {
    /// Raw controller outputs `(x, y)`, present while a waypoint is being tracked.
    pub pid_output: Option<(f64, f64)>,

    /// Actuator demands built from `pid_output`.
    pub servo_dems: Option<ServoDems>,

    /// Spot position and current target. The target is the spot itself when there is no target.
    pub status: CoordQuad,

    /// The closed polygon, only published in closed track mode. Empty when fewer than three
    /// vertices were detected.
    pub track_polygon: Option<Vec<Point2D>>,
}

/// Status report for TrackCtrl processing.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct StatusReport {
    /// Mode at the end of the cycle.
    pub mode: Mode,

    /// Index of the current target.
    pub cursor: usize,

    /// Length of the current path.
    pub num_waypoints: usize,

    /// A save command was received but no spot was detected.
    pub spot_not_found: bool,

    /// A border point was rejected as the border is full.
    pub border_full: bool,

    /// A reset was requested before an origin was saved.
    pub origin_not_set: bool,

    /// The waypoint watchdog expired and the path was abandoned.
    pub watchdog_tripped: bool,

    /// A waypoint was reached on this cycle.
    pub waypoint_reached: bool,

    /// The last waypoint of the path was reached on this cycle.
    pub path_complete: bool,

    /// The path back to the origin was completed on this cycle.
    pub reset_complete: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for TrackCtrl {
    fn default() -> Self {
        Self::new(Params::default())
    }
}

impl State for TrackCtrl {
    type InitData = &'static str;
    type InitError = TrackCtrlError;

    type InputData = InputData;
    type OutputData = OutputData;
    type StatusReport = StatusReport;
    type ProcError = TrackCtrlError;

    /// Initialise the TrackCtrl module.
    ///
    /// Expected init data is the path to the parameter file
    fn init(&mut self, init_data: Self::InitData, session: &Session)
        -> Result<(), Self::InitError>
    {
        // Load the parameters
        let params: Params = match params::load(init_data) {
            Ok(p) => p,
            Err(e) => return Err(TrackCtrlError::ParamLoadError(e))
        };

        debug!(
            "TrackCtrl parameters for session {:?}: {:#?}",
            session.session_root, params
        );

        *self = Self::new(params);

        Ok(())
    }

    /// Perform cyclic processing of Tracking Control.
    fn proc(&mut self, input_data: &Self::InputData)
        -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>
    {
        // Clear the status report
        self.report = StatusReport::default();

        // Keep the last known position through detection dropouts
        if let Some(spot) = input_data.spot {
            self.last_spot = spot;
        }

        // Commands override whatever is in progress
        if let Some(cmd) = input_data.cmd {
            self.handle_cmd(cmd, input_data.spot);
        }

        let mut output = OutputData {
            pid_output: None,
            servo_dems: None,
            status: CoordQuad::default(),
            track_polygon: None,
        };

        // Mode execution
        match self.mode {
            Mode::FollowBorder | Mode::ResetToOrigin => self.mode_follow(&mut output),
            Mode::ClosedTrack => self.mode_closed_track(&input_data.vertices, &mut output),
            Mode::Idle | Mode::CalibrateOrigin | Mode::CalibrateBorder => (),
        }

        // Status is the spot and the current target
        let target = self.current_target().unwrap_or(self.last_spot);
        output.status = CoordQuad::new(to_pixel(&self.last_spot), to_pixel(&target));

        self.report.mode = self.mode;
        self.report.cursor = self.cursor;
        self.report.num_waypoints = self.waypoints.len();

        trace!("TrackCtrl output: {:?}", output);

        Ok((output, self.report))
    }

    /// Abandon any path and go to `Idle`.
    ///
    /// Calibration points are kept.
    fn make_safe(&mut self) {
        if self.mode != Mode::Idle {
            warn!("TrackCtrl made safe while in {:?}", self.mode);
        }
        self.clear_path();
        self.set_mode(Mode::Idle);
    }
}

impl TrackCtrl {

    /// Create a new instance from the given parameters, starting in `Idle`.
    pub fn new(params: Params) -> Self {
        let pid_x = params.pid_x.build();
        let pid_y = params.pid_y.build();

        Self {
            params,
            mode: Mode::Idle,
            calib: CalibrationSet::default(),
            waypoints: Vec::new(),
            cursor: 0,
            completed: Vec::new(),
            last_spot: Point2D::origin(),
            ticks_on_waypoint: 0,
            track_polygon: Vec::new(),
            pid_x,
            pid_y,
            report: StatusReport::default(),
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn calibration(&self) -> &CalibrationSet {
        &self.calib
    }

    pub fn waypoints(&self) -> &[Point2D] {
        &self.waypoints
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn completed(&self) -> &[Point2D] {
        &self.completed
    }

    pub fn last_spot(&self) -> Point2D {
        self.last_spot
    }

    /// The waypoint currently being tracked, if any.
    pub fn current_target(&self) -> Option<Point2D> {
        match self.mode {
            Mode::FollowBorder | Mode::ResetToOrigin => self.waypoints.get(self.cursor).copied(),
            _ => None,
        }
    }

    // ---- COMMANDS ----

    fn handle_cmd(&mut self, cmd: Tc, spot: Option<Point2D>) {
        info!("TrackCtrl command: {}", cmd.token());

        match cmd {
            Tc::SaveOrigin => {
                self.clear_path();
                self.set_mode(Mode::CalibrateOrigin);

                match spot {
                    Some(p) => {
                        self.calib.set_origin(p);
                        info!("Origin saved at ({:.1}, {:.1})", p.x, p.y);
                    }
                    None => {
                        warn!("Cannot save origin, spot not found");
                        self.report.spot_not_found = true;
                    }
                }

                self.set_mode(Mode::Idle);
            }
            Tc::SaveBorder => {
                self.clear_path();
                self.set_mode(Mode::CalibrateBorder);

                match spot {
                    Some(p) => match self.calib.add_border(p) {
                        Ok(n) => info!("Border point {} saved at ({:.1}, {:.1})", n, p.x, p.y),
                        Err(e) => {
                            warn!("Border point rejected: {}", e);
                            self.report.border_full = true;
                        }
                    },
                    None => {
                        warn!("Cannot save border point, spot not found");
                        self.report.spot_not_found = true;
                    }
                }

                self.set_mode(Mode::Idle);
            }
            Tc::StartBorder => {
                let path = path::generate(self.calib.border(), self.params.segments_per_edge);
                if path.is_empty() {
                    warn!(
                        "Border path is empty ({} border points saved), nothing to follow",
                        self.calib.border().len()
                    );
                }
                self.load_path(path);
                self.set_mode(Mode::FollowBorder);
            }
            Tc::StartReset => match self.calib.origin() {
                Some(origin) => {
                    let path = path::reset_path(
                        self.last_spot,
                        origin,
                        self.params.reset_path,
                        self.params.segments_per_edge,
                    );
                    self.load_path(path);
                    self.set_mode(Mode::ResetToOrigin);
                }
                None => {
                    warn!("Cannot reset, no origin saved");
                    self.report.origin_not_set = true;
                    self.clear_path();
                    self.set_mode(Mode::Idle);
                }
            },
            Tc::StartClosedTrack => {
                self.clear_path();
                self.set_mode(Mode::ClosedTrack);
            }
        }
    }

    // ---- MODES ----

    /// Track the current waypoint and advance the cursor once it's reached.
    fn mode_follow(&mut self, output: &mut OutputData) {
        let target = match self.waypoints.get(self.cursor) {
            Some(t) => *t,
            // Finished or empty path, hold with no output
            None => return,
        };

        // Run the controllers
        self.pid_x.set_target(target.x);
        self.pid_y.set_target(target.y);
        let out_x = self.pid_x.update(self.last_spot.x);
        let out_y = self.pid_y.update(self.last_spot.y);

        output.pid_output = Some((out_x, out_y));
        output.servo_dems = Some(ActuatorMapper::to_command(out_x, out_y));

        let dist = path::distance(&target, &self.last_spot);

        debug!(
            "Target {}/{} ({:.1}, {:.1}), distance {:.2} px, output ({:.3}, {:.3})",
            self.cursor + 1,
            self.waypoints.len(),
            target.x,
            target.y,
            dist,
            out_x,
            out_y
        );

        if dist < WAYPOINT_REACHED_PX {
            self.completed.push(target);
            self.cursor += 1;
            self.ticks_on_waypoint = 0;
            self.report.waypoint_reached = true;

            if self.cursor >= self.waypoints.len() {
                self.report.path_complete = true;

                if self.mode == Mode::ResetToOrigin {
                    self.finish_reset();
                } else {
                    info!("Path complete, {} waypoints reached", self.completed.len());
                }
            }

            return;
        }

        // Waypoint watchdog
        self.ticks_on_waypoint += 1;
        if let Some(max) = self.params.max_ticks_per_waypoint {
            if self.ticks_on_waypoint > max {
                warn!(
                    "Waypoint {} not reached within {} cycles, abandoning path",
                    self.cursor, max
                );
                self.report.watchdog_tripped = true;
                self.clear_path();
                self.set_mode(Mode::Idle);
            }
        }
    }

    /// Publish the polygon through the detected vertices.
    fn mode_closed_track(&mut self, vertices: &[Point2D], output: &mut OutputData) {
        self.track_polygon = path::close_polygon(vertices);

        if self.track_polygon.is_empty() {
            trace!("Only {} polygon vertices detected", vertices.len());
        }

        output.track_polygon = Some(self.track_polygon.clone());
    }

    // ---- HELPERS ----

    /// Return to following the border once the origin has been reached.
    fn finish_reset(&mut self) {
        info!("Reset complete, resuming border path");
        self.report.reset_complete = true;

        let path = path::generate(self.calib.border(), self.params.segments_per_edge);
        self.load_path(path);
        self.set_mode(Mode::FollowBorder);
    }

    /// Replace the current path, restarting the cursor and the controllers.
    fn load_path(&mut self, waypoints: Vec<Point2D>) {
        self.clear_path();
        self.waypoints = waypoints;
    }

    fn clear_path(&mut self) {
        self.waypoints.clear();
        self.completed.clear();
        self.track_polygon.clear();
        self.cursor = 0;
        self.ticks_on_waypoint = 0;
        self.pid_x.reset();
        self.pid_y.reset();
    }

    fn set_mode(&mut self, mode: Mode) {
        if self.mode != mode {
            info!("TrackCtrl mode {:?} -> {:?}", self.mode, mode);
            self.mode = mode;
        }
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Truncate a position to whole pixels.
fn to_pixel(p: &Point2D) -> (i32, i32) {
    (p.x as i32, p.y as i32)
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
