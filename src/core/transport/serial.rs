//! Serial port transport implementation

use super::{LinePort, PortOpener, SerialConfig, TransportError};
use serialport::SerialPort;
use std::io::{ErrorKind, Read};

/// Longest line accepted before it is handed to the parser as-is
pub const MAX_LINE_LEN: usize = 4096;

/// Opens real serial ports through the `serialport` crate
#[derive(Debug, Default, Clone, Copy)]
pub struct SerialPortOpener;

impl PortOpener for SerialPortOpener {
    fn open(&mut self, config: &SerialConfig) -> Result<Box<dyn LinePort>, TransportError> {
        let port = serialport::new(&config.port, config.baud_rate)
            .timeout(config.read_timeout)
            .open()
            .map_err(|e| match e.kind() {
                serialport::ErrorKind::NoDevice => TransportError::PortNotFound(config.port.clone()),
                serialport::ErrorKind::Io(io_kind) => match io_kind {
                    ErrorKind::NotFound => TransportError::PortNotFound(config.port.clone()),
                    ErrorKind::PermissionDenied => {
                        TransportError::PermissionDenied(config.port.clone())
                    }
                    _ => TransportError::OpenFailed(e.to_string()),
                },
                _ => TransportError::OpenFailed(e.to_string()),
            })?;

        Ok(Box::new(SerialLinePort::new(port)))
    }
}

/// Line reader over an open serial port
pub struct SerialLinePort {
    port: Box<dyn SerialPort>,
}

impl SerialLinePort {
    /// Wrap an already opened port
    pub fn new(port: Box<dyn SerialPort>) -> Self {
        Self { port }
    }
}

impl LinePort for SerialLinePort {
    fn bytes_available(&mut self) -> Result<u32, TransportError> {
        self.port
            .bytes_to_read()
            .map_err(|e| TransportError::Io(e.into()))
    }

    fn read_line(&mut self) -> Result<Vec<u8>, TransportError> {
        read_line_from(&mut self.port)
    }
}

/// Read bytes until `\n`, a read timeout, or [`MAX_LINE_LEN`] bytes
///
/// Reads one byte at a time so nothing past the terminator is consumed.
/// A timeout returns the partial line. End of stream means the device is
/// gone.
pub fn read_line_from<R: Read + ?Sized>(reader: &mut R) -> Result<Vec<u8>, TransportError> {
    let mut line = Vec::new();
    let mut byte = [0u8; 1];

    while line.len() < MAX_LINE_LEN {
        match reader.read(&mut byte) {
            Ok(0) => return Err(TransportError::Disconnected),
            Ok(_) => {
                line.push(byte[0]);
                if byte[0] == b'\n' {
                    break;
                }
            }
            Err(ref e) if e.kind() == ErrorKind::Interrupted => {}
            Err(ref e) if e.kind() == ErrorKind::TimedOut => break,
            Err(e) => return Err(TransportError::Io(e)),
        }
    }

    Ok(line)
}

/// List available serial ports
pub fn list_ports() -> Result<Vec<serialport::SerialPortInfo>, TransportError> {
    serialport::available_ports().map_err(|e| TransportError::Io(e.into()))
}
