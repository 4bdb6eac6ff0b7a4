//! Serial connection lifecycle
//!
//! Owns the single device handle for the life of the process and moves it
//! through `Disconnected -> Connecting -> Connected`, dropping back to
//! `Disconnected` on any read fault. Opening retries with a fixed delay and,
//! by default, never gives up.

use super::parser::decode_line;
use super::transport::{LinePort, PortOpener, SerialConfig, TransportError};
use crate::utils::shutdown::Shutdown;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No handle open
    Disconnected,
    /// Opening the device or waiting for it to settle
    Connecting,
    /// Handle open and readable
    Connected,
    /// Last open attempt failed; waiting to retry
    Faulted,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Connected => write!(f, "Connected"),
            Self::Faulted => write!(f, "Faulted"),
        }
    }
}

/// Result of a non-blocking read
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// Nothing waiting on the link
    NoData,
    /// One decoded line, terminator included
    Line(String),
}

/// How `connect` retries failed opens
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Wait between failed attempts
    pub delay: Duration,
    /// Total attempts before giving up (`None` = unlimited)
    pub max_attempts: Option<u32>,
}

impl RetryPolicy {
    /// Retry forever with the given delay
    pub fn unlimited(delay: Duration) -> Self {
        Self {
            delay,
            max_attempts: None,
        }
    }

    /// Give up after `max_attempts` attempts
    #[must_use]
    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::unlimited(Duration::from_secs(5))
    }
}

/// Why `connect` returned without a handle
#[derive(Error, Debug)]
pub enum ConnectError {
    /// Operator asked to stop
    #[error("Connection cancelled")]
    Cancelled,

    /// Bounded retry policy ran out of attempts
    #[error("Gave up after {attempts} attempts: {last}")]
    Exhausted {
        /// Attempts made
        attempts: u32,
        /// Error from the final attempt
        last: TransportError,
    },
}

/// Lifecycle owner of the serial device handle
pub struct SerialConnection<O: PortOpener> {
    config: SerialConfig,
    opener: O,
    retry: RetryPolicy,
    settle_delay: Duration,
    port: Option<Box<dyn LinePort>>,
    state: ConnectionState,
}

impl<O: PortOpener> SerialConnection<O> {
    /// Create a disconnected connection
    pub fn new(config: SerialConfig, opener: O) -> Self {
        Self {
            config,
            opener,
            retry: RetryPolicy::default(),
            settle_delay: Duration::from_secs(2),
            port: None,
            state: ConnectionState::Disconnected,
        }
    }

    /// Set retry policy
    #[must_use]
    pub fn retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Set the pause after a successful open
    #[must_use]
    pub fn settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Current state
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Is a handle open and ready?
    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected && self.port.is_some()
    }

    /// Serial link parameters
    pub fn config(&self) -> &SerialConfig {
        &self.config
    }

    /// Open the device, retrying until it succeeds
    ///
    /// Any handle still held is closed first. Returns the number of attempts
    /// it took. Only fails on cancellation or when a bounded retry policy
    /// runs out.
    pub fn connect(&mut self, shutdown: &Shutdown) -> Result<u32, ConnectError> {
        self.close();

        let mut attempts = 0u32;
        loop {
            if shutdown.is_requested() {
                self.state = ConnectionState::Disconnected;
                return Err(ConnectError::Cancelled);
            }

            attempts += 1;
            self.state = ConnectionState::Connecting;
            info!(attempt = attempts, "Connecting to serial port {}", self.config);

            match self.opener.open(&self.config) {
                Ok(port) => {
                    self.port = Some(port);
                    info!("Connected to serial port {}", self.config.port);

                    if !shutdown.sleep(self.settle_delay) {
                        self.close();
                        return Err(ConnectError::Cancelled);
                    }

                    self.state = ConnectionState::Connected;
                    info!("Waiting for data from the stopwatch");
                    return Ok(attempts);
                }
                Err(e) => {
                    self.state = ConnectionState::Faulted;

                    if let Some(max) = self.retry.max_attempts {
                        if attempts >= max {
                            warn!("Cannot open serial port {}: {}; giving up", self.config.port, e);
                            self.state = ConnectionState::Disconnected;
                            return Err(ConnectError::Exhausted { attempts, last: e });
                        }
                    }

                    warn!(
                        "Cannot open serial port {}: {}; retrying in {:?}",
                        self.config.port, e, self.retry.delay
                    );
                    if !shutdown.sleep(self.retry.delay) {
                        self.state = ConnectionState::Disconnected;
                        return Err(ConnectError::Cancelled);
                    }
                }
            }
        }
    }

    /// Read the next line if one is waiting
    ///
    /// Returns [`ReadOutcome::NoData`] immediately when the link is idle.
    /// Any I/O fault closes the handle and leaves the connection
    /// `Disconnected`; the error is returned for the caller to log.
    pub fn read_line(&mut self) -> Result<ReadOutcome, TransportError> {
        let result = {
            let Some(port) = self.port.as_mut() else {
                return Err(TransportError::NotConnected);
            };

            match port.bytes_available() {
                Ok(0) => return Ok(ReadOutcome::NoData),
                Ok(_) => port.read_line(),
                Err(e) => Err(e),
            }
        };

        match result {
            Ok(bytes) => {
                let line = decode_line(&bytes);
                debug!(bytes = bytes.len(), "Received line {:?}", line);
                Ok(ReadOutcome::Line(line))
            }
            Err(e) => {
                self.state = ConnectionState::Faulted;
                self.close();
                Err(e)
            }
        }
    }

    /// Close the handle; safe to call any number of times
    pub fn close(&mut self) {
        if self.port.take().is_some() {
            info!("Serial port {} closed", self.config.port);
        }
        self.state = ConnectionState::Disconnected;
    }
}
