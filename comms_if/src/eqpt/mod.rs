//! # Equipment Interface
//!
//! This module defines the interface structures which will be sent to equipment (servo drivers,
//! vision detectors) or received from them.

// -----------------------------------------------------------------------------------------------
// MODULES
// -----------------------------------------------------------------------------------------------

/// Servo demand packets sent to the actuator driver
pub mod servo;

/// Packed coordinate tuples carried in frames
pub mod coords;

/// Detection messages sent by the vision collaborator
pub mod det;
