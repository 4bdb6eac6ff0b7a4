//! Transport layer for the stopwatch link
//!
//! The relay only needs two things from a transport: a way to open the
//! device, and a line-oriented view of the opened handle. Both are traits
//! so the connection state machine can be driven without hardware.

mod serial;

pub use serial::{list_ports, read_line_from, SerialLinePort, SerialPortOpener, MAX_LINE_LEN};

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Transport error types
#[derive(Error, Debug)]
pub enum TransportError {
    /// Port not found
    #[error("Port not found: {0}")]
    PortNotFound(String),

    /// Permission denied
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Port could not be opened for another reason (busy, bad settings, ...)
    #[error("Failed to open port: {0}")]
    OpenFailed(String),

    /// I/O error on an open handle
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Device went away (end of stream)
    #[error("Disconnected")]
    Disconnected,

    /// Operation needs an open handle
    #[error("Not connected")]
    NotConnected,
}

/// Serial link parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialConfig {
    /// Port name (e.g., COM3, /dev/ttyACM0)
    pub port: String,
    /// Baud rate
    pub baud_rate: u32,
    /// Upper bound on a single read call
    pub read_timeout: Duration,
}

impl SerialConfig {
    /// Create a new serial configuration with the default read timeout
    pub fn new(port: &str, baud_rate: u32) -> Self {
        Self {
            port: port.to_string(),
            baud_rate,
            read_timeout: Duration::from_secs(1),
        }
    }

    /// Set read timeout
    #[must_use]
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }
}

impl fmt::Display for SerialConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ {} baud", self.port, self.baud_rate)
    }
}

/// An open, line-oriented device handle
///
/// Dropping the handle closes the underlying device.
#[cfg_attr(test, mockall::automock)]
pub trait LinePort {
    /// Number of bytes waiting to be read, without blocking
    fn bytes_available(&mut self) -> Result<u32, TransportError>;

    /// Read up to and including the next `\n`, or whatever arrived before
    /// the read timeout expired
    fn read_line(&mut self) -> Result<Vec<u8>, TransportError>;
}

/// Opens device handles
#[cfg_attr(test, mockall::automock)]
pub trait PortOpener {
    /// Open the device described by `config`
    fn open(&mut self, config: &SerialConfig) -> Result<Box<dyn LinePort>, TransportError>;
}
