//! # Actuator mapping
//!
//! Converts the signed PID outputs into the unsigned pan/tilt demands carried by the actuator
//! packet.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::eqpt::servo::{ServoDems, SERVO_DEM_NEUTRAL};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Largest magnitude of a signed demand.
pub const MAX_SIGNED_DEM: i32 = 127;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Maps PID outputs onto actuator demands.
#[derive(Debug, Default, Clone, Copy)]
pub struct ActuatorMapper;

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ActuatorMapper {
    /// Build the actuator demands for the given PID outputs.
    ///
    /// Each output is truncated toward zero, clamped to `[-127, 127]` and offset by 127, giving a
    /// demand in `[0, 254]` with 127 as neutral.
    pub fn to_command(out_x: f64, out_y: f64) -> ServoDems {
        ServoDems {
            x: Self::map_axis(out_x),
            y: Self::map_axis(out_y),
        }
    }

    fn map_axis(output: f64) -> u8 {
        // Float to int casts saturate and send NaN to zero
        let signed = (output.trunc() as i32).clamp(-MAX_SIGNED_DEM, MAX_SIGNED_DEM);
        (signed + SERVO_DEM_NEUTRAL as i32) as u8
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_neutral_and_truncation() {
        assert_eq!(ActuatorMapper::to_command(0.0, 0.0), ServoDems { x: 127, y: 127 });
        assert_eq!(ActuatorMapper::to_command(1.9, -1.9), ServoDems { x: 128, y: 126 });
        assert_eq!(ActuatorMapper::to_command(-0.5, 0.99), ServoDems { x: 127, y: 127 });
    }

    #[test]
    fn test_clamped_range() {
        assert_eq!(ActuatorMapper::to_command(500.0, -500.0), ServoDems { x: 254, y: 0 });
        assert_eq!(ActuatorMapper::to_command(127.0, -127.0), ServoDems { x: 254, y: 0 });
        assert_eq!(
            ActuatorMapper::to_command(f64::INFINITY, f64::NAN),
            ServoDems { x: 254, y: 127 }
        );
    }
}
