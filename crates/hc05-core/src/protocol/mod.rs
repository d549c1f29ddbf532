//! AT-mode Protocol Communication
//!
//! Implements the HC-05 AT command protocol: baud rate probing, line-oriented
//! command/response exchanges and the serial transport underneath them.

pub mod commands;
mod error;
pub mod prober;
pub mod serial;
mod session;
pub mod transport;

pub use commands::AtCommand;
pub use error::ProtocolError;
pub use prober::{BaudProber, ProbeReport, ProberConfig};
pub use serial::{format_port_line, list_ports, open_port, PortInfo, SerialTransport, SystemSerial};
pub use session::{ApplyOutcome, AtSession, CurrentConfig, Exchange, SessionTiming};
pub use transport::{decode_lossy, hex_dump, is_acknowledged, SerialBackend, Transport};

/// Baud rates tried during AT-mode detection, in order
pub const CANDIDATE_BAUDS: [u32; 5] = [9600, 19200, 38400, 57600, 115200];

/// Line terminator appended to every AT command
pub const LINE_TERMINATOR: &str = "\r\n";

/// Token whose presence anywhere in a trimmed response means success
pub const ACK_TOKEN: &str = "OK";

/// Default read timeout for an open port in milliseconds
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 1000;

/// Default delay after opening a port, before the first write
pub const DEFAULT_OPEN_SETTLE_MS: u64 = 1000;

/// Default delay between writing a command and reading its response
pub const DEFAULT_COMMAND_SETTLE_MS: u64 = 500;

/// Maximum bytes accepted for a single response line
pub const MAX_LINE_LEN: usize = 256;
