//! # Frame Module
//!
//! Framed binary protocol used to exchange fixed-size numeric payloads over a byte stream.
//!
//! A frame is laid out as:
//!
//! ```text
//! | HEAD (0xAA) | LEN (u16 LE) | PAYLOAD (LEN bytes) | CHECKSUM (u8) | TAIL (0x55) |
//! ```
//!
//! The checksum is the sum of the two length bytes and all payload bytes, truncated to 8 bits.
//! Receivers recover alignment after noise by discarding everything before the next `HEAD` byte,
//! and by dropping a `HEAD` byte whose frame turns out to be corrupt.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use byteorder::{ByteOrder, LittleEndian};
use log::{debug, trace};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// First byte of every frame.
pub const HEAD: u8 = 0xAA;

/// Last byte of every frame.
pub const TAIL: u8 = 0x55;

/// Number of bytes the frame adds around its payload (head, length, checksum, tail).
pub const FRAME_OVERHEAD: usize = 5;

/// Largest payload a frame can carry, limited by the 16 bit length field.
pub const MAX_PAYLOAD_LEN: usize = u16::MAX as usize;

/// Offset of the first payload byte from the head.
const PAYLOAD_OFFSET: usize = 3;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Result of checking a buffer for a frame.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct FrameCheck {
    /// Status of the frame found after `skip` bytes.
    pub status: FrameStatus,

    /// Number of bytes preceding the first `HEAD` byte. The caller must discard these bytes
    /// regardless of the status.
    pub skip: usize,
}

/// Accumulates bytes from a stream and extracts complete frame payloads.
///
/// Noise before a frame is discarded, and a corrupt frame causes only its head byte to be dropped
/// before the buffer is rescanned, so a valid frame hidden behind a garbage length field is never
/// lost.
#[derive(Debug)]
pub struct FrameReceiver {
    buffer: Vec<u8>,

    /// Declared payload lengths above this are treated as corrupt instead of incomplete.
    max_payload_len: usize,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Validity status of a frame.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum FrameStatus {
    /// A complete, valid frame starts at `skip`.
    Valid,

    /// Not enough bytes after the head to read the length field.
    ShortHeader,

    /// The declared frame is longer than the bytes available, wait for more.
    Incomplete,

    /// The tail byte or the checksum does not match.
    Corrupt,
}

/// Errors which can occur while building frames.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("Payload of {0} bytes is longer than the maximum frame payload (65535 bytes)")]
    PayloadTooLong(usize),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl FrameStatus {
    /// Numeric status code used on the wire and in logs.
    ///
    /// `0` valid, `-1` short header, `-2` incomplete, `-3` corrupt.
    pub fn code(&self) -> i8 {
        match self {
            FrameStatus::Valid => 0,
            FrameStatus::ShortHeader => -1,
            FrameStatus::Incomplete => -2,
            FrameStatus::Corrupt => -3,
        }
    }
}

impl FrameCheck {
    /// The check as a `(status code, skip)` pair.
    pub fn as_tuple(&self) -> (i8, usize) {
        (self.status.code(), self.skip)
    }
}

impl Default for FrameReceiver {
    fn default() -> Self {
        Self::new(MAX_PAYLOAD_LEN)
    }
}

impl FrameReceiver {
    /// Create a new receiver which accepts payloads of at most `max_payload_len` bytes.
    pub fn new(max_payload_len: usize) -> Self {
        Self {
            buffer: Vec::new(),
            max_payload_len: max_payload_len.min(MAX_PAYLOAD_LEN),
        }
    }

    /// Append bytes read from the stream.
    pub fn push(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Number of bytes waiting in the buffer.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Drop all buffered bytes.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Extract the payload of the next complete frame, if there is one.
    ///
    /// Call in a loop until `None` is returned to drain every frame in the buffer.
    pub fn next_payload(&mut self) -> Option<Vec<u8>> {
        loop {
            let check = is_valid(&self.buffer);

            if check.skip > 0 {
                trace!("Discarding {} bytes before frame head", check.skip);
                self.buffer.drain(..check.skip);
            }

            let status = match check.status {
                FrameStatus::Incomplete if self.declared_payload_len() > self.max_payload_len => {
                    FrameStatus::Corrupt
                }
                s => s,
            };

            match status {
                FrameStatus::Valid => {
                    let len = self.declared_payload_len() + FRAME_OVERHEAD;
                    let payload = self.buffer[PAYLOAD_OFFSET..len - 2].to_vec();
                    self.buffer.drain(..len);
                    return Some(payload);
                }
                FrameStatus::Corrupt => {
                    debug!("Corrupt frame in stream, resynchronising");
                    self.buffer.drain(..1);
                }
                FrameStatus::ShortHeader | FrameStatus::Incomplete => return None,
            }
        }
    }

    /// Payload length declared by the frame at the start of the buffer, or 0 if it can't be read.
    fn declared_payload_len(&self) -> usize {
        if self.buffer.len() < PAYLOAD_OFFSET {
            return 0;
        }
        LittleEndian::read_u16(&self.buffer[1..PAYLOAD_OFFSET]) as usize
    }
}

// ------------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Sum of all bytes truncated to 8 bits.
pub fn checksum(data: &[u8]) -> u8 {
    data.iter().fold(0u8, |acc, b| acc.wrapping_add(*b))
}

/// Wrap a payload into a frame.
pub fn encode(payload: &[u8]) -> Result<Vec<u8>, FrameError> {
    if payload.len() > MAX_PAYLOAD_LEN {
        return Err(FrameError::PayloadTooLong(payload.len()));
    }

    let mut frame = Vec::with_capacity(payload.len() + FRAME_OVERHEAD);
    frame.push(HEAD);

    let mut len = [0u8; 2];
    LittleEndian::write_u16(&mut len, payload.len() as u16);
    frame.extend_from_slice(&len);
    frame.extend_from_slice(payload);

    // Checksum covers everything after the head
    let sum = checksum(&frame[1..]);
    frame.push(sum);
    frame.push(TAIL);

    Ok(frame)
}

/// Check a buffer for a frame.
///
/// The buffer is scanned for the first `HEAD` byte, everything before it is reported in `skip`.
/// Bytes following a complete frame are ignored.
pub fn is_valid(buffer: &[u8]) -> FrameCheck {
    let skip = buffer
        .iter()
        .position(|b| *b == HEAD)
        .unwrap_or(buffer.len());
    let frame = &buffer[skip..];

    let status = if frame.len() < PAYLOAD_OFFSET {
        FrameStatus::ShortHeader
    } else {
        let payload_len = LittleEndian::read_u16(&frame[1..PAYLOAD_OFFSET]) as usize;
        let sum_idx = PAYLOAD_OFFSET + payload_len;

        if frame.len() < payload_len + FRAME_OVERHEAD {
            FrameStatus::Incomplete
        } else if frame[sum_idx + 1] != TAIL || checksum(&frame[1..sum_idx]) != frame[sum_idx] {
            FrameStatus::Corrupt
        } else {
            FrameStatus::Valid
        }
    };

    FrameCheck { status, skip }
}

/// Get the payload of a frame which starts at the beginning of `frame`.
///
/// Only the head, declared length and tail are checked, call [`is_valid`] first to verify the
/// checksum. `None` is returned if the frame is truncated or not delimited correctly.
pub fn decode(frame: &[u8]) -> Option<&[u8]> {
    let len = frame_length(frame)?;

    if frame.len() < len || frame[len - 1] != TAIL {
        return None;
    }

    Some(&frame[PAYLOAD_OFFSET..len - 2])
}

/// Total length (including overhead) of the frame starting at the beginning of `buffer`.
pub fn frame_length(buffer: &[u8]) -> Option<usize> {
    if buffer.len() < PAYLOAD_OFFSET || buffer[0] != HEAD {
        return None;
    }

    Some(LittleEndian::read_u16(&buffer[1..PAYLOAD_OFFSET]) as usize + FRAME_OVERHEAD)
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    fn payload_of_len(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 7 + 3) as u8).collect()
    }

    #[test]
    fn test_encode_layout() {
        let frame = encode(b"hello").unwrap();

        assert_eq!(frame[0], HEAD);
        assert_eq!(&frame[1..3], &[5, 0]);
        assert_eq!(&frame[3..8], b"hello");
        assert_eq!(frame[8], checksum(&frame[1..8]));
        assert_eq!(frame[9], TAIL);
        assert_eq!(frame.len(), 5 + FRAME_OVERHEAD);
    }

    #[test]
    fn test_encode_rejects_oversized_payload() {
        let payload = vec![0u8; MAX_PAYLOAD_LEN + 1];
        assert!(matches!(
            encode(&payload),
            Err(FrameError::PayloadTooLong(l)) if l == MAX_PAYLOAD_LEN + 1
        ));
    }

    #[test]
    fn test_round_trip() {
        for len in [0usize, 1, 16, 255, 256, MAX_PAYLOAD_LEN].iter() {
            let payload = payload_of_len(*len);
            let frame = encode(&payload).unwrap();

            assert_eq!(is_valid(&frame).as_tuple(), (0, 0), "len {}", len);
            assert_eq!(decode(&frame), Some(&payload[..]), "len {}", len);
            assert_eq!(frame_length(&frame), Some(len + FRAME_OVERHEAD));
        }
    }

    #[test]
    fn test_resync_skip() {
        let frame = encode(b"spot").unwrap();

        for n in 0..12 {
            let mut buf: Vec<u8> = (0..n).map(|i| (i as u8).wrapping_mul(13) | 0x01).collect();
            assert!(!buf.contains(&HEAD));
            buf.extend_from_slice(&frame);

            let check = is_valid(&buf);
            assert_eq!(check.status, FrameStatus::Valid);
            assert_eq!(check.skip, n);
            assert_eq!(decode(&buf[check.skip..]), Some(&b"spot"[..]));
        }
    }

    #[test]
    fn test_resync_skip_for_every_status() {
        let valid = encode(b"spot").unwrap();
        let mut corrupt = valid.clone();
        corrupt[valid.len() - 2] ^= 0xFF;

        let cases: [(&[u8], FrameStatus); 4] = [
            (&valid, FrameStatus::Valid),
            (&[HEAD, 0x04], FrameStatus::ShortHeader),
            (&valid[..6], FrameStatus::Incomplete),
            (&corrupt, FrameStatus::Corrupt),
        ];

        for (frame, status) in cases.iter() {
            let unprefixed = is_valid(frame);
            assert_eq!(unprefixed.status, *status);
            assert_eq!(unprefixed.skip, 0);

            for n in 1..8 {
                let mut buf: Vec<u8> = (0..n).map(|i| (i as u8).wrapping_mul(29) | 0x01).collect();
                assert!(!buf.contains(&HEAD));
                buf.extend_from_slice(frame);

                let check = is_valid(&buf);
                assert_eq!(check.status, *status, "{:?} after {} bytes", status, n);
                assert_eq!(check.skip, n, "{:?} after {} bytes", status, n);
            }
        }
    }

    #[test]
    fn test_resync_keeps_partial_status() {
        let frame = encode(b"partial").unwrap();
        let mut buf = vec![0x01, 0x02, 0x03];
        buf.extend_from_slice(&frame[..6]);

        let check = is_valid(&buf);
        assert_eq!(check.as_tuple(), (-2, 3));
    }

    #[test]
    fn test_single_byte_corruption() {
        let payload = payload_of_len(12);
        let frame = encode(&payload).unwrap();

        // Every byte after the length field: payload, checksum, tail
        for i in 3..frame.len() {
            let mut corrupt = frame.clone();
            corrupt[i] ^= 0x5A;

            assert_eq!(is_valid(&corrupt).status, FrameStatus::Corrupt, "byte {}", i);
        }
    }

    #[test]
    fn test_short_and_incomplete() {
        assert_eq!(is_valid(&[]).as_tuple(), (-1, 0));
        assert_eq!(is_valid(&[0x10, 0x20]).as_tuple(), (-1, 2));
        assert_eq!(is_valid(&[HEAD, 0x01]).as_tuple(), (-1, 0));
        assert_eq!(is_valid(&[HEAD, 0x04, 0x00, 0x01]).as_tuple(), (-2, 0));
    }

    #[test]
    fn test_trailing_bytes_allowed() {
        let mut buf = encode(&[1, 2, 3]).unwrap();
        buf.extend_from_slice(&[HEAD, 0x09]);

        assert_eq!(is_valid(&buf).status, FrameStatus::Valid);
        assert_eq!(decode(&buf), Some(&[1u8, 2, 3][..]));
    }

    #[test]
    fn test_decode_rejects_bad_delimiters() {
        let mut frame = encode(&[9, 9]).unwrap();
        assert_eq!(decode(&frame[1..]), None);
        assert_eq!(decode(&frame[..frame.len() - 1]), None);

        let last = frame.len() - 1;
        frame[last] = 0x00;
        assert_eq!(decode(&frame), None);
    }

    #[test]
    fn test_receiver_extracts_frames_across_pushes() {
        let mut rx = FrameReceiver::default();
        let first = encode(&[1, 2, 3, 4]).unwrap();
        let second = encode(&[5, 6]).unwrap();

        let mut stream = vec![0x00, 0x13];
        stream.extend_from_slice(&first);
        stream.extend_from_slice(&second);

        rx.push(&stream[..5]);
        assert_eq!(rx.next_payload(), None);

        rx.push(&stream[5..]);
        assert_eq!(rx.next_payload(), Some(vec![1, 2, 3, 4]));
        assert_eq!(rx.next_payload(), Some(vec![5, 6]));
        assert_eq!(rx.next_payload(), None);
        assert_eq!(rx.pending(), 0);
    }

    #[test]
    fn test_receiver_recovers_after_corrupt_frame() {
        let mut rx = FrameReceiver::default();
        let mut corrupt = encode(&[7, 7, 7]).unwrap();
        corrupt[4] ^= 0xFF;

        rx.push(&corrupt);
        rx.push(&encode(&[8]).unwrap());

        assert_eq!(rx.next_payload(), Some(vec![8]));
        assert_eq!(rx.next_payload(), None);
    }

    #[test]
    fn test_receiver_rejects_implausible_length() {
        let mut rx = FrameReceiver::new(16);

        // A stray head with a huge declared length, followed by a real frame
        rx.push(&[HEAD, 0xFF, 0x7F]);
        rx.push(&encode(&[1, 2]).unwrap());

        assert_eq!(rx.next_payload(), Some(vec![1, 2]));
    }
}
