//! # Packed coordinate payloads
//!
//! Coordinates travel inside frames as little-endian `i32` values.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use byteorder::{ByteOrder, LittleEndian};
use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Size of a packed [`CoordQuad`] in bytes.
pub const COORD_QUAD_LEN: usize = 16;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Two pixel coordinates packed as `<iiii`.
///
/// Used for status frames, where the first pair is the current spot position and the second pair
/// the current target.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, Eq, PartialEq)]
pub struct CoordQuad {
    pub x0: i32,
    pub y0: i32,
    pub x1: i32,
    pub y1: i32,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl CoordQuad {
    /// Create a new quad from two coordinate pairs.
    pub fn new(first: (i32, i32), second: (i32, i32)) -> Self {
        Self {
            x0: first.0,
            y0: first.1,
            x1: second.0,
            y1: second.1,
        }
    }

    /// Pack into a frame payload.
    pub fn to_payload(&self) -> [u8; COORD_QUAD_LEN] {
        let mut buf = [0u8; COORD_QUAD_LEN];
        LittleEndian::write_i32_into(&[self.x0, self.y0, self.x1, self.y1], &mut buf);
        buf
    }

    /// Unpack from a frame payload, which must be exactly 16 bytes long.
    pub fn from_payload(payload: &[u8]) -> Option<Self> {
        if payload.len() != COORD_QUAD_LEN {
            return None;
        }

        let mut vals = [0i32; 4];
        LittleEndian::read_i32_into(payload, &mut vals);

        Some(Self {
            x0: vals[0],
            y0: vals[1],
            x1: vals[2],
            y1: vals[3],
        })
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
