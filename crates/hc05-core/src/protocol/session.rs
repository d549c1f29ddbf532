//! AT session management
//!
//! Handles the command/response exchange with a module that is already in
//! AT mode at a known baud rate.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{
    decode_lossy, is_acknowledged, AtCommand, ProtocolError, SerialBackend, Transport,
    DEFAULT_COMMAND_SETTLE_MS, DEFAULT_OPEN_SETTLE_MS, DEFAULT_READ_TIMEOUT_MS, LINE_TERMINATOR,
};
use crate::module_config::ModuleConfig;

/// Placeholder shown when a query returns an empty line
pub const UNKNOWN: &str = "Unknown";

/// Timing used for every serial exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTiming {
    /// Read timeout set when the port is opened
    pub read_timeout: Duration,
    /// Wait after opening, before the first write
    pub open_settle: Duration,
    /// Wait between writing a command and reading its response
    pub command_settle: Duration,
}

impl SessionTiming {
    /// No delays and a short read timeout, for simulated modules
    pub fn immediate() -> Self {
        Self {
            read_timeout: Duration::from_millis(10),
            open_settle: Duration::ZERO,
            command_settle: Duration::ZERO,
        }
    }
}

impl Default for SessionTiming {
    fn default() -> Self {
        Self {
            read_timeout: Duration::from_millis(DEFAULT_READ_TIMEOUT_MS),
            open_settle: Duration::from_millis(DEFAULT_OPEN_SETTLE_MS),
            command_settle: Duration::from_millis(DEFAULT_COMMAND_SETTLE_MS),
        }
    }
}

/// Configuration reported by the module before changes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentConfig {
    /// Response to `AT+NAME?`
    pub name: String,
    /// Response to `AT+ROLE?`
    pub role: String,
    /// Response to `AT+UART?`
    pub uart: String,
}

/// One command and the response it got
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exchange {
    /// Command text without terminator
    pub command: String,
    /// Trimmed response
    pub response: String,
}

/// Result of applying a configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Every command was acknowledged
    Applied(Vec<Exchange>),
    /// A command lacked the acknowledgement; later commands were not sent
    Rejected {
        /// Exchanges before and including the rejected one
        exchanges: Vec<Exchange>,
        /// The rejected command text
        command: String,
        /// What the module answered
        response: String,
    },
}

impl ApplyOutcome {
    /// True when every command was acknowledged
    pub fn is_applied(&self) -> bool {
        matches!(self, ApplyOutcome::Applied(_))
    }

    /// Exchanges performed, in order
    pub fn exchanges(&self) -> &[Exchange] {
        match self {
            ApplyOutcome::Applied(exchanges) => exchanges,
            ApplyOutcome::Rejected { exchanges, .. } => exchanges,
        }
    }
}

/// An open AT-mode connection to one module. Dropping it closes the port.
pub struct AtSession {
    /// Port handle
    transport: Box<dyn Transport>,
    /// Timing parameters
    timing: SessionTiming,
    /// Baud the port was opened at
    baud: u32,
}

impl AtSession {
    /// Wrap an already opened transport
    pub fn new(transport: Box<dyn Transport>, baud: u32, timing: SessionTiming) -> Self {
        Self {
            transport,
            timing,
            baud,
        }
    }

    /// Open `port` at `baud` and wait for the module to settle
    pub fn open<B: SerialBackend + ?Sized>(
        backend: &mut B,
        port: &str,
        baud: u32,
        timing: SessionTiming,
    ) -> Result<Self, ProtocolError> {
        let transport = backend.open(port, baud, timing.read_timeout)?;
        std::thread::sleep(timing.open_settle);
        tracing::debug!("session open on {} at {} baud", port, baud);
        Ok(Self::new(transport, baud, timing))
    }

    /// Baud rate of this session
    pub fn baud(&self) -> u32 {
        self.baud
    }

    /// Send one command line and return the trimmed response line.
    ///
    /// Stale input is discarded first. The terminator is appended unless the
    /// text already ends with it. A silent or garbled module yields an empty
    /// or unacknowledged string; only transport failures are errors.
    pub fn send_command(&mut self, command: &str) -> Result<String, ProtocolError> {
        let mut line = command.to_string();
        if !line.ends_with(LINE_TERMINATOR) {
            line.push_str(LINE_TERMINATOR);
        }

        // Leftover lines from a previous reply must not answer this command
        if let Err(e) = self.transport.clear_input() {
            tracing::warn!("send_command: clearing input failed: {} (continuing)", e);
        }

        tracing::debug!("send_command: {:?}", line);
        self.transport.write_all(line.as_bytes())?;

        std::thread::sleep(self.timing.command_settle);

        let raw = self.transport.read_line()?;
        let response = decode_lossy(&raw);
        tracing::debug!(
            "send_command: {} bytes back: {:?}",
            raw.len(),
            response
        );
        Ok(response)
    }

    /// Send a typed command
    pub fn send(&mut self, command: &AtCommand) -> Result<String, ProtocolError> {
        self.send_command(&command.to_string())
    }

    /// Check the module acknowledges a bare `AT`
    pub fn is_at_mode(&mut self) -> Result<bool, ProtocolError> {
        let response = self.send(&AtCommand::Test)?;
        Ok(is_acknowledged(&response))
    }

    /// Query name, role and UART settings, in that order
    pub fn query_current_config(&mut self) -> Result<CurrentConfig, ProtocolError> {
        let name = self.query(&AtCommand::QueryName)?;
        let role = self.query(&AtCommand::QueryRole)?;
        let uart = self.query(&AtCommand::QueryUart)?;
        Ok(CurrentConfig { name, role, uart })
    }

    fn query(&mut self, command: &AtCommand) -> Result<String, ProtocolError> {
        let response = self.send(command)?;
        if response.is_empty() {
            Ok(UNKNOWN.to_string())
        } else {
            Ok(response)
        }
    }

    /// Write name, password, role and UART, stopping at the first command
    /// the module does not acknowledge
    pub fn apply_config(&mut self, cfg: &ModuleConfig) -> Result<ApplyOutcome, ProtocolError> {
        let mut exchanges = Vec::with_capacity(4);

        for command in AtCommand::apply_sequence(cfg) {
            let text = command.to_string();
            let response = self.send_command(&text)?;
            let acknowledged = is_acknowledged(&response);
            exchanges.push(Exchange {
                command: text.clone(),
                response: response.clone(),
            });

            if !acknowledged {
                tracing::warn!("module rejected {}: {:?}", text, response);
                return Ok(ApplyOutcome::Rejected {
                    exchanges,
                    command: text,
                    response,
                });
            }
        }

        Ok(ApplyOutcome::Applied(exchanges))
    }

    /// Re-read the module name for the operator to inspect
    pub fn verify_config(&mut self) -> Result<String, ProtocolError> {
        self.send(&AtCommand::QueryName)
    }
}
