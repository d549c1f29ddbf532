//! Transport abstraction
//!
//! The prober and session only see these traits, so the same code runs
//! against a real serial port or the simulated module in [`crate::demo`].

use std::io::ErrorKind;
use std::time::Duration;

use super::{PortInfo, ProtocolError, ACK_TOKEN, MAX_LINE_LEN};

/// A byte stream to a single open port
pub trait Transport {
    /// Write all bytes to the port
    fn write_all(&mut self, data: &[u8]) -> Result<(), ProtocolError>;

    /// Discard anything waiting in the receive buffer
    fn clear_input(&mut self) -> Result<(), ProtocolError>;

    /// Number of bytes waiting in the receive buffer
    fn bytes_available(&mut self) -> Result<usize, ProtocolError>;

    /// Read up to `buf.len()` bytes, blocking for at most the read timeout.
    ///
    /// Returns `Ok(0)` when nothing arrived before the timeout.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, ProtocolError>;

    /// Read one line terminated by `\n`, or whatever arrived before the read
    /// timeout. The terminator is kept in the returned bytes.
    fn read_line(&mut self) -> Result<Vec<u8>, ProtocolError> {
        let mut line = Vec::new();
        let mut byte = [0u8; 1];

        while line.len() < MAX_LINE_LEN {
            match self.read(&mut byte)? {
                0 => break,
                _ => {
                    line.push(byte[0]);
                    if byte[0] == b'\n' {
                        break;
                    }
                }
            }
        }

        Ok(line)
    }
}

/// Source of ports: enumeration and opening
pub trait SerialBackend {
    /// List ports the operator can choose from
    fn list_ports(&mut self) -> Vec<PortInfo>;

    /// Open `port` at `baud` with the given read timeout
    fn open(
        &mut self,
        port: &str,
        baud: u32,
        read_timeout: Duration,
    ) -> Result<Box<dyn Transport>, ProtocolError>;
}

impl<B: SerialBackend + ?Sized> SerialBackend for &mut B {
    fn list_ports(&mut self) -> Vec<PortInfo> {
        (**self).list_ports()
    }

    fn open(
        &mut self,
        port: &str,
        baud: u32,
        read_timeout: Duration,
    ) -> Result<Box<dyn Transport>, ProtocolError> {
        (**self).open(port, baud, read_timeout)
    }
}

/// Map a timed-out read into "no bytes" so callers see an empty response
pub(crate) fn timeout_as_empty(result: std::io::Result<usize>) -> Result<usize, ProtocolError> {
    match result {
        Ok(n) => Ok(n),
        Err(ref e) if e.kind() == ErrorKind::TimedOut || e.kind() == ErrorKind::WouldBlock => {
            Ok(0)
        }
        Err(e) => Err(ProtocolError::IoError(e)),
    }
}

/// Decode bytes as UTF-8, replacing invalid sequences, and trim whitespace
pub fn decode_lossy(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).trim().to_string()
}

/// Lowercase hex rendering of raw bytes, no separators
pub fn hex_dump(raw: &[u8]) -> String {
    raw.iter().map(|b| format!("{:02x}", b)).collect()
}

/// True when the response contains the acknowledgement token anywhere
pub fn is_acknowledged(response: &str) -> bool {
    response.trim().contains(ACK_TOKEN)
}
