//! # Serial link
//!
//! The tracker talks to the outside world over two serial links:
//!
//! - The command link, which carries operator TCs in and servo demand packets and status frames
//!   out.
//! - The detection link, on which the vision collaborator streams framed [`DetectionMsg`]s. This
//!   is read on a worker thread which publishes into a [`DetectionSlot`].
//!
//! Both are generic over `Read`/`Write` so they can be driven from memory in tests.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::{
    eqpt::{
        coords::CoordQuad,
        det::{DetectionMsg, MAX_DETECTION_PAYLOAD_LEN},
        servo::ServoDems,
    },
    frame::{self, FrameError, FrameReceiver},
    tc::{Tc, TcAssembler},
};
use log::{debug, error, info, trace, warn};
use serialport::SerialPort;
use std::{
    io::{self, ErrorKind, Read, Write},
    thread,
    time::{Duration, Instant},
};

use crate::det::DetectionSlot;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Size of the buffer used for a single read from a port.
const READ_CHUNK_LEN: usize = 64;

/// Time to wait before reading again when a partial TC is buffered but no bytes arrived.
const PARTIAL_TC_BACKOFF: Duration = Duration::from_millis(1);

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// The command link: TCs in, servo demands and status out.
pub struct SerialLink<P> {
    port: P,
    tc_asm: TcAssembler,

    /// Maximum time spent waiting for the rest of a partially received TC
    cmd_timeout: Duration,
}

/// Reads detection frames from the vision collaborator and publishes them.
pub struct DetectionReader<R> {
    port: R,
    rx: FrameReceiver,
    slot: DetectionSlot,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SerialLinkError {
    #[error("Could not open serial port {0}: {1}")]
    OpenError(String, serialport::Error),

    #[error("Could not read from the command channel: {0}")]
    CommandChannel(io::Error),

    #[error("Could not write to the actuator channel: {0}")]
    ActuatorChannel(io::Error),

    #[error("Could not write to the status channel: {0}")]
    StatusChannel(io::Error),

    #[error("Could not read from the detection channel: {0}")]
    DetectionChannel(io::Error),

    #[error("Could not build a frame: {0}")]
    FrameError(#[from] FrameError),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SerialLink<Box<dyn SerialPort>> {
    /// Open the command link on a serial device.
    ///
    /// `read_timeout` is the timeout of a single read on the port, `cmd_timeout` bounds how long
    /// a poll waits for the rest of a partially received TC.
    pub fn open(
        path: &str,
        baud: u32,
        read_timeout: Duration,
        cmd_timeout: Duration,
    ) -> Result<Self, SerialLinkError> {
        let port = open_port(path, baud, read_timeout)?;

        info!("Command link open on {} at {} baud", path, baud);

        Ok(Self::new(port, cmd_timeout))
    }
}

impl<P: Read + Write> SerialLink<P> {
    /// Create a link over an already open port.
    pub fn new(port: P, cmd_timeout: Duration) -> Self {
        Self {
            port,
            tc_asm: TcAssembler::default(),
            cmd_timeout,
        }
    }

    /// Get a reference to the underlying port.
    pub fn port(&self) -> &P {
        &self.port
    }

    /// Poll the link for a TC.
    ///
    /// Returns immediately with `None` if nothing is waiting. Once part of a TC has arrived the
    /// rest is waited for, up to the command timeout. Anything still incomplete is kept for the
    /// next poll. Malformed TCs are logged and skipped.
    pub fn poll_cmd(&mut self) -> Result<Option<Tc>, SerialLinkError> {
        // A previous read may have brought in more than one TC
        if let Some(tc) = self.next_buffered_tc() {
            return Ok(Some(tc));
        }

        let deadline = Instant::now() + self.cmd_timeout;

        loop {
            let num_read = self.read_chunk()?;

            if let Some(tc) = self.next_buffered_tc() {
                return Ok(Some(tc));
            }

            if self.tc_asm.pending() == 0 {
                return Ok(None);
            }

            if Instant::now() >= deadline {
                trace!("{} bytes of an incomplete TC buffered", self.tc_asm.pending());
                return Ok(None);
            }

            if num_read == 0 {
                thread::sleep(PARTIAL_TC_BACKOFF);
            }
        }
    }

    /// Send a servo demand packet.
    pub fn send_servo_dems(&mut self, dems: &ServoDems) -> Result<(), SerialLinkError> {
        self.port
            .write_all(&dems.to_packet())
            .and_then(|_| self.port.flush())
            .map_err(SerialLinkError::ActuatorChannel)
    }

    /// Send a status frame holding the spot and target positions.
    pub fn send_status(&mut self, status: &CoordQuad) -> Result<(), SerialLinkError> {
        let frame = frame::encode(&status.to_payload())?;

        self.port
            .write_all(&frame)
            .and_then(|_| self.port.flush())
            .map_err(SerialLinkError::StatusChannel)
    }

    /// Get the next valid TC already in the assembler, skipping malformed ones.
    fn next_buffered_tc(&mut self) -> Option<Tc> {
        while let Some(res) = self.tc_asm.next_tc() {
            match res {
                Ok(tc) => {
                    debug!("Received TC {}", tc.token());
                    return Some(tc);
                }
                Err(e) => warn!("Discarding malformed TC: {}", e),
            }
        }

        None
    }

    /// Read whatever is available into the TC assembler, returning the number of bytes read.
    fn read_chunk(&mut self) -> Result<usize, SerialLinkError> {
        let mut buf = [0u8; READ_CHUNK_LEN];

        match self.port.read(&mut buf) {
            Ok(n) => {
                self.tc_asm.push(&buf[..n]);
                Ok(n)
            }
            Err(e) if is_no_data(&e) => Ok(0),
            Err(e) => Err(SerialLinkError::CommandChannel(e)),
        }
    }
}

impl DetectionReader<Box<dyn SerialPort>> {
    /// Open the detection link on a serial device.
    pub fn open(
        path: &str,
        baud: u32,
        read_timeout: Duration,
        slot: DetectionSlot,
    ) -> Result<Self, SerialLinkError> {
        let port = open_port(path, baud, read_timeout)?;

        info!("Detection link open on {} at {} baud", path, baud);

        Ok(Self::new(port, slot))
    }
}

impl<R: Read> DetectionReader<R> {
    /// Create a reader over an already open port.
    ///
    /// Frames declaring a payload longer than any detection message are dropped as noise rather
    /// than waited for.
    pub fn new(port: R, slot: DetectionSlot) -> Self {
        Self {
            port,
            rx: FrameReceiver::new(MAX_DETECTION_PAYLOAD_LEN),
            slot,
        }
    }

    /// Read once from the port and publish every complete detection. Returns the number of
    /// messages published.
    pub fn poll(&mut self) -> Result<usize, SerialLinkError> {
        let mut buf = [0u8; READ_CHUNK_LEN];

        match self.port.read(&mut buf) {
            Ok(n) => self.rx.push(&buf[..n]),
            Err(e) if is_no_data(&e) => (),
            Err(e) => return Err(SerialLinkError::DetectionChannel(e)),
        }

        let mut num_published = 0;

        while let Some(payload) = self.rx.next_payload() {
            match DetectionMsg::from_payload(&payload) {
                Ok(msg) => {
                    trace!("Detection: {:?}", msg);
                    self.slot.publish_msg(msg);
                    num_published += 1;
                }
                Err(e) => warn!("Discarding invalid detection message: {}", e),
            }
        }

        Ok(num_published)
    }
}

impl<R: Read + Send + 'static> DetectionReader<R> {
    /// Run the reader on its own thread until the port fails.
    pub fn spawn(mut self) -> io::Result<thread::JoinHandle<()>> {
        thread::Builder::new()
            .name(String::from("det_reader"))
            .spawn(move || loop {
                if let Err(e) = self.poll() {
                    error!("Detection reader stopped: {}", e);
                    break;
                }
            })
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn open_port(
    path: &str,
    baud: u32,
    read_timeout: Duration,
) -> Result<Box<dyn SerialPort>, SerialLinkError> {
    serialport::new(path, baud)
        .timeout(read_timeout)
        .open()
        .map_err(|e| SerialLinkError::OpenError(String::from(path), e))
}

/// A read which returned no data because none was waiting.
fn is_no_data(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        ErrorKind::TimedOut | ErrorKind::WouldBlock | ErrorKind::Interrupted
    )
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
