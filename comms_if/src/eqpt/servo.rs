//! # Servo Equipment Demands

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// First byte of a servo demand packet.
pub const SERVO_PKT_START: u8 = 0xFF;

/// Last byte of a servo demand packet.
pub const SERVO_PKT_END: u8 = 0xFE;

/// Length of a servo demand packet in bytes.
pub const SERVO_PKT_LEN: usize = 4;

/// Demand byte corresponding to zero controller output.
pub const SERVO_DEM_NEUTRAL: u8 = 127;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Demands sent to the pan/tilt actuator driver.
///
/// Each axis is a single unsigned byte in the range `[0, 254]`, with 127 meaning no motion.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct ServoDems {
    /// Pan (horizontal) axis demand
    pub x: u8,

    /// Tilt (vertical) axis demand
    pub y: u8,
}

// -----------------------------------------------------------------------------------------------
// IMPLS
// -----------------------------------------------------------------------------------------------

impl Default for ServoDems {
    fn default() -> Self {
        Self {
            x: SERVO_DEM_NEUTRAL,
            y: SERVO_DEM_NEUTRAL,
        }
    }
}

impl ServoDems {
    /// Serialise the demands as `0xFF x y 0xFE`.
    pub fn to_packet(&self) -> [u8; SERVO_PKT_LEN] {
        [SERVO_PKT_START, self.x, self.y, SERVO_PKT_END]
    }

    /// Parse demands from a packet, returning `None` if the packet is not delimited correctly.
    pub fn from_packet(packet: &[u8]) -> Option<Self> {
        match packet {
            [SERVO_PKT_START, x, y, SERVO_PKT_END] => Some(Self { x: *x, y: *y }),
            _ => None,
        }
    }
}

// -----------------------------------------------------------------------------------------------
// TESTS
// -----------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_packet_layout() {
        let dems = ServoDems { x: 0, y: 254 };
        assert_eq!(dems.to_packet(), [0xFF, 0x00, 0xFE, 0xFE]);
        assert_eq!(ServoDems::from_packet(&dems.to_packet()), Some(dems));
    }

    #[test]
    fn test_bad_packets() {
        assert_eq!(ServoDems::from_packet(&[0xFF, 1, 2]), None);
        assert_eq!(ServoDems::from_packet(&[0x00, 1, 2, 0xFE]), None);
        assert_eq!(ServoDems::from_packet(&[0xFF, 1, 2, 0xFE, 0x00]), None);
    }

    #[test]
    fn test_default_is_neutral() {
        assert_eq!(ServoDems::default().to_packet(), [0xFF, 127, 127, 0xFE]);
    }
}
