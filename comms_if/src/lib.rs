//! # Communications interface crate.
//!
//! Provides all common communications interfaces for the software.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Framed binary protocol (header, length, checksum, tail)
pub mod frame;

/// Text telecommands delimited by `$` and `#`
pub mod tc;

/// Command and data definitions for equipment (servos, detectors)
pub mod eqpt;
