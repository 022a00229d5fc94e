//! # Detection messages
//!
//! Messages produced by the vision collaborator once per camera frame, carried as frame payloads.
//! The first payload byte identifies the message, coordinates follow as little-endian `i32`
//! pairs.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use byteorder::{ByteOrder, LittleEndian};
use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

const TAG_NO_SPOT: u8 = 0x00;
const TAG_SPOT: u8 = 0x01;
const TAG_VERTICES: u8 = 0x02;

/// Size of one packed coordinate pair.
const PAIR_LEN: usize = 8;

/// Maximum number of vertex markers carried by one message.
pub const MAX_VERTICES: usize = 64;

/// Payload length of the longest valid detection message.
pub const MAX_DETECTION_PAYLOAD_LEN: usize = 1 + MAX_VERTICES * PAIR_LEN;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// A detection result from the vision collaborator.
#[derive(Serialize, Deserialize, Debug, Clone, Eq, PartialEq)]
pub enum DetectionMsg {
    /// No spot was found in the frame
    NoSpot,

    /// The spot centre in pixels
    Spot { x: i32, y: i32 },

    /// Centres of the polygon vertex markers found in the frame, in no particular order
    Vertices(Vec<(i32, i32)>),
}

/// Errors which can occur when parsing a detection payload.
#[derive(Debug, thiserror::Error, Eq, PartialEq)]
pub enum DetectionMsgError {
    #[error("Detection payload is empty")]
    Empty,

    #[error("Unknown detection message tag 0x{0:02X}")]
    UnknownTag(u8),

    #[error("Detection payload has invalid length {0} for its tag")]
    InvalidLength(usize),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl DetectionMsg {
    /// Pack the message into a frame payload.
    pub fn to_payload(&self) -> Vec<u8> {
        match self {
            DetectionMsg::NoSpot => vec![TAG_NO_SPOT],
            DetectionMsg::Spot { x, y } => {
                let mut buf = vec![0u8; 1 + PAIR_LEN];
                buf[0] = TAG_SPOT;
                LittleEndian::write_i32_into(&[*x, *y], &mut buf[1..]);
                buf
            }
            DetectionMsg::Vertices(verts) => {
                let mut buf = vec![0u8; 1 + verts.len() * PAIR_LEN];
                buf[0] = TAG_VERTICES;
                for (i, (x, y)) in verts.iter().enumerate() {
                    let start = 1 + i * PAIR_LEN;
                    LittleEndian::write_i32_into(&[*x, *y], &mut buf[start..start + PAIR_LEN]);
                }
                buf
            }
        }
    }

    /// Parse a message from a frame payload.
    ///
    /// Vertex lists longer than [`MAX_VERTICES`] are rejected.
    pub fn from_payload(payload: &[u8]) -> Result<Self, DetectionMsgError> {
        let (tag, body) = match payload.split_first() {
            Some(s) => s,
            None => return Err(DetectionMsgError::Empty),
        };

        match *tag {
            TAG_NO_SPOT if body.is_empty() => Ok(DetectionMsg::NoSpot),
            TAG_SPOT if body.len() == PAIR_LEN => {
                let (x, y) = read_pair(body);
                Ok(DetectionMsg::Spot { x, y })
            }
            TAG_VERTICES
                if body.len() % PAIR_LEN == 0 && body.len() <= MAX_VERTICES * PAIR_LEN =>
            {
                Ok(DetectionMsg::Vertices(
                    body.chunks_exact(PAIR_LEN).map(read_pair).collect(),
                ))
            }
            TAG_NO_SPOT | TAG_SPOT | TAG_VERTICES => {
                Err(DetectionMsgError::InvalidLength(payload.len()))
            }
            t => Err(DetectionMsgError::UnknownTag(t)),
        }
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn read_pair(bytes: &[u8]) -> (i32, i32) {
    (
        LittleEndian::read_i32(&bytes[0..4]),
        LittleEndian::read_i32(&bytes[4..8]),
    )
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_spot_payload() {
        let msg = DetectionMsg::Spot { x: 160, y: -3 };
        let payload = msg.to_payload();

        assert_eq!(payload.len(), 9);
        assert_eq!(payload[0], TAG_SPOT);
        assert_eq!(DetectionMsg::from_payload(&payload), Ok(msg));
    }

    #[test]
    fn test_vertices_payload() {
        let msg = DetectionMsg::Vertices(vec![(0, 0), (10, 0), (10, 10)]);
        let payload = msg.to_payload();

        assert_eq!(payload.len(), 1 + 3 * 8);
        assert_eq!(DetectionMsg::from_payload(&payload), Ok(msg));
        assert_eq!(
            DetectionMsg::from_payload(&[TAG_VERTICES]),
            Ok(DetectionMsg::Vertices(vec![]))
        );
    }

    #[test]
    fn test_invalid_payloads() {
        assert_eq!(DetectionMsg::from_payload(&[]), Err(DetectionMsgError::Empty));
        assert_eq!(
            DetectionMsg::from_payload(&[0x7F]),
            Err(DetectionMsgError::UnknownTag(0x7F))
        );
        assert_eq!(
            DetectionMsg::from_payload(&[TAG_SPOT, 1, 2, 3]),
            Err(DetectionMsgError::InvalidLength(4))
        );
        assert_eq!(
            DetectionMsg::from_payload(&[TAG_NO_SPOT, 0]),
            Err(DetectionMsgError::InvalidLength(2))
        );
    }

    #[test]
    fn test_vertex_count_limit() {
        let most = DetectionMsg::Vertices(vec![(1, 2); MAX_VERTICES]);
        let payload = most.to_payload();
        assert_eq!(payload.len(), MAX_DETECTION_PAYLOAD_LEN);
        assert_eq!(DetectionMsg::from_payload(&payload), Ok(most));

        let too_many = DetectionMsg::Vertices(vec![(1, 2); MAX_VERTICES + 1]).to_payload();
        assert_eq!(
            DetectionMsg::from_payload(&too_many),
            Err(DetectionMsgError::InvalidLength(too_many.len()))
        );
    }
}
