//! Logging setup
//!
//! Records are written to stdout and to the session log file, prefixed by
//! the seconds elapsed in the session and a short coloured level tag:
//!
//! ```text
//! [  12.345678 INF] TrackCtrl mode Idle -> FollowBorder
//! [  12.395012 DBG] track_lib::track_ctrl::state: Target 2/80 ...
//! ```

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use colored::{ColoredString, Colorize};
use log::{info, Level, Record};
use std::fmt;
use thiserror::Error;

// Internal imports
use crate::session::{self, Session};

// Re-exports
pub use log::LevelFilter;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Crates whose records are capped at `Warn`, the serial port crate logs
/// every read at trace.
const QUIET_CRATES: [&str; 1] = ["serialport"];

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors associated with initialising the logger.
#[derive(Debug, Error)]
pub enum LoggerInitError {
    #[error("Expected a log level of at least `INFO`, found `{0}`")]
    InvalidMinLogLevel(LevelFilter),

    #[error("Error opening the log file: {0}")]
    LogFileInitError(std::io::Error),

    #[error("A logger has already been set: {0}")]
    FernInitError(log::SetLoggerError)
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Initialise the logger for this execution.
///
/// `min_level` must be `Info` or more verbose, mode changes of the tracking
/// loop are logged at `Info` and must always be recorded.
///
/// Must only be called once per process, after the session has been started.
pub fn logger_init(
    min_level: LevelFilter,
    session: &Session
) -> Result<(), LoggerInitError> {

    if min_level < Level::Info {
        return Err(LoggerInitError::InvalidMinLogLevel(min_level))
    }

    let log_file = fern::log_file(&session.log_file_path)
        .map_err(LoggerInitError::LogFileInitError)?;

    let mut dispatch = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{:10.6} {}] {}",
                session::get_elapsed_seconds(),
                level_tag(record.level()),
                Message { record, message }
            ))
        })
        .level(min_level);

    for name in QUIET_CRATES.iter() {
        dispatch = dispatch.level_for(*name, LevelFilter::Warn);
    }

    dispatch
        .chain(std::io::stdout())
        .chain(log_file)
        .apply()
        .map_err(LoggerInitError::FernInitError)?;

    info!("Logging initialised");
    info!("    Session epoch: {}", session::get_epoch());
    info!("    Log level: {:?}", min_level);
    info!("    Log file path: {:?}", session.log_file_path);

    Ok(())
}

/// Parse a log level name as given on the command line.
///
/// Accepts the `log` crate names case-insensitively (`info`, `DEBUG`, ...).
pub fn parse_level(name: &str) -> Option<LevelFilter> {
    name.trim().parse().ok()
}

// ---------------------------------------------------------------------------
// PRIVATE ITEMS
// ---------------------------------------------------------------------------

/// Message body, prefixed with the target for debug and trace records.
struct Message<'a, 'b> {
    record: &'a Record<'b>,
    message: &'a fmt::Arguments<'a>,
}

impl<'a, 'b> fmt::Display for Message<'a, 'b> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.record.level() > Level::Info {
            write!(f, "{}: {}", self.record.target(), self.message)
        }
        else {
            write!(f, "{}", self.message)
        }
    }
}

/// Three letter, coloured level tag
fn level_tag(level: Level) -> ColoredString {
    match level {
        Level::Trace => "TRC".dimmed().italic(),
        Level::Debug => "DBG".dimmed(),
        Level::Info  => "INF".normal(),
        Level::Warn  => "WRN".yellow(),
        Level::Error => "ERR".red().bold()
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("info"), Some(LevelFilter::Info));
        assert_eq!(parse_level(" TRACE "), Some(LevelFilter::Trace));
        assert_eq!(parse_level("loud"), None);
    }

    #[test]
    fn test_level_tags() {
        colored::control::set_override(false);
        assert_eq!(level_tag(Level::Warn).to_string(), "WRN");
        assert_eq!(level_tag(Level::Trace).to_string(), "TRC");
    }
}
