//! # Telecommand module
//!
//! This module provides telecommand functionality to the communications
//! interface.
//!
//! Telecommands are short text tokens sent over a byte stream, each delimited
//! by a `$` start marker and a `#` end marker, for example `$START_BORDER#`.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{trace, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Marker preceding a telecommand token.
pub const TC_START: u8 = b'$';

/// Marker following a telecommand token.
pub const TC_END: u8 = b'#';

/// Default maximum number of unterminated bytes held by a [`TcAssembler`].
pub const DEFAULT_MAX_PENDING: usize = 64;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Assembles telecommands from bytes arriving in arbitrary chunks.
///
/// Partial packets are kept between calls so a command split across several
/// reads is completed once its end marker arrives.
#[derive(Debug)]
pub struct TcAssembler {
    buffer: Vec<u8>,
    max_pending: usize,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// A telecommand, i.e. an instruction sent to the tracker by the operator.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Hash)]
pub enum Tc {
    /// Capture the current spot position as the origin.
    SaveOrigin,

    /// Append the current spot position to the border points.
    SaveBorder,

    /// Follow the path through the saved border points.
    StartBorder,

    /// Return from the current position to the saved origin.
    StartReset,

    /// Publish the closed polygon through the detected vertices.
    StartClosedTrack,
}

/// Possible parsing errors.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum TcParseError {
    #[error("TC packet is not valid UTF-8")]
    InvalidUtf8,

    #[error("TC packet contains no token")]
    Empty,

    #[error("{0:?} is not a recognised TC token")]
    UnknownToken(String),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Tc {
    /// Parse a TC from its token, surrounding whitespace is ignored.
    pub fn from_token(token: &str) -> Result<Self, TcParseError> {
        match token.trim() {
            "" => Err(TcParseError::Empty),
            "SAVE_ORIGIN" => Ok(Tc::SaveOrigin),
            "SAVE_BORDER" => Ok(Tc::SaveBorder),
            "START_BORDER" => Ok(Tc::StartBorder),
            "START_RESET" => Ok(Tc::StartReset),
            "START_CLOSED_TRACK" => Ok(Tc::StartClosedTrack),
            t => Err(TcParseError::UnknownToken(String::from(t))),
        }
    }

    /// Parse a TC from the raw bytes found between the markers.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TcParseError> {
        let token = std::str::from_utf8(bytes).map_err(|_| TcParseError::InvalidUtf8)?;
        Self::from_token(token)
    }

    /// The token identifying this TC.
    pub fn token(&self) -> &'static str {
        match self {
            Tc::SaveOrigin => "SAVE_ORIGIN",
            Tc::SaveBorder => "SAVE_BORDER",
            Tc::StartBorder => "START_BORDER",
            Tc::StartReset => "START_RESET",
            Tc::StartClosedTrack => "START_CLOSED_TRACK",
        }
    }

    /// The TC wrapped in its start and end markers, ready to be sent.
    pub fn to_packet(&self) -> Vec<u8> {
        let mut packet = Vec::with_capacity(self.token().len() + 2);
        packet.push(TC_START);
        packet.extend_from_slice(self.token().as_bytes());
        packet.push(TC_END);
        packet
    }
}

impl Default for TcAssembler {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PENDING)
    }
}

impl TcAssembler {
    /// Create a new assembler holding at most `max_pending` unterminated bytes.
    pub fn new(max_pending: usize) -> Self {
        Self {
            buffer: Vec::new(),
            max_pending,
        }
    }

    /// Append bytes read from the stream.
    pub fn push(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Number of bytes held while waiting for an end marker.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Get the next complete TC from the buffer.
    ///
    /// Packets with no token are skipped. `Some(Err(_))` is returned for a
    /// delimited packet which isn't a valid TC, the packet is consumed so
    /// further calls carry on with the following bytes. `None` means no
    /// complete packet is buffered.
    pub fn next_tc(&mut self) -> Option<Result<Tc, TcParseError>> {
        loop {
            let end = match self.buffer.iter().position(|b| *b == TC_END) {
                Some(e) => e,
                None => {
                    self.trim_unterminated();
                    return None;
                }
            };

            // The last start marker before the end wins, earlier ones belong
            // to packets which were cut short.
            let start = self.buffer[..end].iter().rposition(|b| *b == TC_START);

            let packet: Vec<u8> = match start {
                Some(s) => self.buffer[s + 1..end].to_vec(),
                None => {
                    trace!("Discarding {} bytes with no TC start marker", end + 1);
                    self.buffer.drain(..=end);
                    continue;
                }
            };
            self.buffer.drain(..=end);

            match Tc::from_bytes(&packet) {
                Err(TcParseError::Empty) => continue,
                res => return Some(res),
            }
        }
    }

    /// Keep only the unterminated packet which could still be completed.
    fn trim_unterminated(&mut self) {
        match self.buffer.iter().rposition(|b| *b == TC_START) {
            Some(s) => {
                self.buffer.drain(..s);
            }
            None => self.buffer.clear(),
        }

        if self.buffer.len() > self.max_pending {
            warn!(
                "Unterminated TC longer than {} bytes, discarding",
                self.max_pending
            );
            self.buffer.clear();
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_token_parsing() {
        assert_eq!(Tc::from_token("SAVE_ORIGIN"), Ok(Tc::SaveOrigin));
        assert_eq!(Tc::from_token(" START_CLOSED_TRACK\r\n"), Ok(Tc::StartClosedTrack));
        assert_eq!(Tc::from_token(""), Err(TcParseError::Empty));
        assert_eq!(
            Tc::from_token("START_NOWHERE"),
            Err(TcParseError::UnknownToken(String::from("START_NOWHERE")))
        );
        assert_eq!(Tc::from_bytes(&[0xFF, 0xFE]), Err(TcParseError::InvalidUtf8));
    }

    #[test]
    fn test_packet_matches_token() {
        for tc in [
            Tc::SaveOrigin,
            Tc::SaveBorder,
            Tc::StartBorder,
            Tc::StartReset,
            Tc::StartClosedTrack,
        ]
        .iter()
        {
            let mut asm = TcAssembler::default();
            asm.push(&tc.to_packet());
            assert_eq!(asm.next_tc(), Some(Ok(*tc)));
        }
    }

    #[test]
    fn test_assembler_split_packet() {
        let mut asm = TcAssembler::default();

        asm.push(b"$START_");
        assert_eq!(asm.next_tc(), None);
        assert_eq!(asm.pending(), 7);

        asm.push(b"RESET#$SAVE_BORDER#");
        assert_eq!(asm.next_tc(), Some(Ok(Tc::StartReset)));
        assert_eq!(asm.next_tc(), Some(Ok(Tc::SaveBorder)));
        assert_eq!(asm.next_tc(), None);
    }

    #[test]
    fn test_assembler_skips_noise_and_empty() {
        let mut asm = TcAssembler::default();

        asm.push(b"noise#$#xx$SAVE_$SAVE_ORIGIN#");
        assert_eq!(asm.next_tc(), Some(Ok(Tc::SaveOrigin)));
        assert_eq!(asm.next_tc(), None);
        assert_eq!(asm.pending(), 0);
    }

    #[test]
    fn test_assembler_reports_unknown_and_continues() {
        let mut asm = TcAssembler::default();

        asm.push(b"$JUMP#$START_BORDER#");
        assert_eq!(
            asm.next_tc(),
            Some(Err(TcParseError::UnknownToken(String::from("JUMP"))))
        );
        assert_eq!(asm.next_tc(), Some(Ok(Tc::StartBorder)));
    }

    #[test]
    fn test_assembler_bounds_unterminated_input() {
        let mut asm = TcAssembler::new(8);

        asm.push(b"no markers at all");
        assert_eq!(asm.next_tc(), None);
        assert_eq!(asm.pending(), 0);

        asm.push(b"$THIS_NEVER_ENDS");
        assert_eq!(asm.next_tc(), None);
        assert_eq!(asm.pending(), 0);
    }
}
