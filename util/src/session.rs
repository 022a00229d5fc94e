//! Session management
//!
//! A session is one run of an executable. It owns a timestamped directory under
//! `<sw_root>/<sessions_dir>` holding the log file, and fixes the epoch that
//! all log timestamps are measured from.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use chrono::{DateTime, Utc};
use conquer_once::OnceCell;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

// Internal imports
use crate::time;

// ---------------------------------------------------------------------------
// STATICS
// ---------------------------------------------------------------------------

static SESSION_EPOCH: OnceCell<DateTime<Utc>> = OnceCell::uninit();

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Format of the timestamp in session directory names, e.g. `20240131_174502`.
const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Paths belonging to the current session
#[derive(Clone, Debug)]
pub struct Session {
    /// Directory holding everything written during this session
    pub session_root: PathBuf,

    /// The session's log file
    pub log_file_path: PathBuf,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors associated with the session module.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("The software root environment variable (SPOT_TRACK_SW_ROOT) is not set")]
    SwRootNotSet,

    #[error("Cannot create the session directory: {0}")]
    CannotCreateDir(std::io::Error),

    #[error("A session has already been started by this process ({0})")]
    CannotInitEpoch(conquer_once::TryInitError),

    #[error("Cannot get the epoch time, did you forget to initialise the session?")]
    CannotGetEpoch,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Session {
    /// Start the session for `exec_name` under `<sw_root>/<sessions_dir>`.
    ///
    /// Only one session may be started per process, the epoch is fixed by
    /// the first call.
    pub fn new(exec_name: &str, sessions_dir: &str) -> Result<Self, SessionError> {
        let mut sessions_root = crate::host::get_sw_root()
            .map_err(|_| SessionError::SwRootNotSet)?;
        sessions_root.push(sessions_dir);

        Self::new_in(exec_name, sessions_root)
    }

    /// Start the session in an explicit sessions directory.
    pub fn new_in<P: AsRef<Path>>(exec_name: &str, sessions_root: P)
        -> Result<Self, SessionError>
    {
        SESSION_EPOCH.try_init_once(Utc::now)
            .map_err(SessionError::CannotInitEpoch)?;

        let epoch = SESSION_EPOCH.get().ok_or(SessionError::CannotGetEpoch)?;

        let session_root = sessions_root.as_ref().join(format!(
            "{}_{}",
            exec_name,
            epoch.format(TIMESTAMP_FORMAT)
        ));

        fs::create_dir_all(&session_root).map_err(SessionError::CannotCreateDir)?;

        Ok(Session {
            log_file_path: session_root.join(format!("{}.log", exec_name)),
            session_root,
        })
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Seconds since the session was started, `NaN` if the clock has gone wrong.
///
/// # Panics
/// - If no session has been started.
pub fn get_elapsed_seconds() -> f64 {
    time::duration_to_seconds(Utc::now() - *get_epoch()).unwrap_or(std::f64::NAN)
}

/// Return a reference to the session's epoch.
///
/// # Panics
/// - If no session has been started.
pub fn get_epoch() -> &'static DateTime<Utc> {
    match SESSION_EPOCH.get() {
        Some(e) => e,
        None => panic!("Cannot get the session epoch!"),
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    // The epoch is process wide so everything is checked in one test
    #[test]
    fn test_session_lifecycle() {
        let mut root = std::env::temp_dir();
        root.push(format!("util_session_{}", std::process::id()));

        let session = Session::new_in("test_exec", &root).unwrap();

        assert!(session.session_root.is_dir());
        assert!(session.session_root.starts_with(&root));
        assert_eq!(
            session.log_file_path,
            session.session_root.join("test_exec.log")
        );

        let elapsed = get_elapsed_seconds();
        assert!(elapsed >= 0.0 && elapsed < 60.0);

        // A second session in the same process is refused
        assert!(matches!(
            Session::new_in("test_exec", &root),
            Err(SessionError::CannotInitEpoch(_))
        ));

        fs::remove_dir_all(root).ok();
    }
}
