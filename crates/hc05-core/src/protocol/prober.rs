//! AT-mode baud rate detection
//!
//! Tries each candidate baud in order with a bare `AT` probe and stops at the
//! first one whose reply contains `OK`. When every candidate fails the
//! operator may supply one more rate by hand.

use super::{
    decode_lossy, hex_dump, is_acknowledged, AtCommand, ProtocolError, SerialBackend,
    SessionTiming, CANDIDATE_BAUDS,
};
use crate::console::{confirm, Console};

/// Prober configuration. The candidate list itself is fixed to
/// [`CANDIDATE_BAUDS`].
#[derive(Debug, Clone, Default)]
pub struct ProberConfig {
    /// Port timing for each probe
    pub timing: SessionTiming,
    /// Show per-candidate diagnostics to the operator
    pub verbose: bool,
}

/// What came back from a single probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeReport {
    /// Baud the port was opened at
    pub baud: u32,
    /// Raw bytes read
    pub raw: Vec<u8>,
    /// Lossily decoded, trimmed text
    pub response: String,
}

impl ProbeReport {
    /// True when the reply contains the acknowledgement token
    pub fn acknowledged(&self) -> bool {
        is_acknowledged(&self.response)
    }

    /// Diagnostic line: byte count, hex dump and decoded text
    pub fn describe(&self) -> String {
        format!(
            "Received {} bytes: {} | Decoded: '{}'",
            self.raw.len(),
            hex_dump(&self.raw),
            self.response
        )
    }
}

/// Finds the baud rate a module answers AT commands at
pub struct BaudProber<B: SerialBackend> {
    backend: B,
    config: ProberConfig,
}

impl<B: SerialBackend> BaudProber<B> {
    /// Create a prober over `backend`
    pub fn new(backend: B, config: ProberConfig) -> Self {
        Self { backend, config }
    }

    /// Open `port` at `baud`, send `AT` and collect whatever is waiting.
    ///
    /// The port is closed before returning, on success or error.
    pub fn probe_baud(&mut self, port: &str, baud: u32) -> Result<ProbeReport, ProtocolError> {
        let timing = self.config.timing;
        let mut transport = self.backend.open(port, baud, timing.read_timeout)?;

        std::thread::sleep(timing.open_settle);
        transport.write_all(&AtCommand::Test.to_bytes())?;
        std::thread::sleep(timing.command_settle);

        let available = transport.bytes_available()?.max(1);
        let mut raw = vec![0u8; available];
        let n = transport.read(&mut raw)?;
        raw.truncate(n);

        drop(transport);

        let response = decode_lossy(&raw);
        Ok(ProbeReport {
            baud,
            raw,
            response,
        })
    }

    /// Try every candidate in order, returning the first acknowledged baud.
    ///
    /// Transport errors only fail the candidate they happened on.
    pub fn detect_candidates(&mut self, port: &str, console: &mut dyn Console) -> Option<u32> {
        console.say("Auto-detecting AT mode baud rate...");

        for baud in CANDIDATE_BAUDS {
            match self.probe_baud(port, baud) {
                Ok(report) => {
                    tracing::debug!("probe {} at {}: {}", port, baud, report.describe());
                    if self.config.verbose {
                        console.say(&format!("Baud {}: {}", baud, report.describe()));
                    }
                    if report.acknowledged() {
                        tracing::info!("AT mode detected on {} at {} baud", port, baud);
                        console.say(&format!("AT mode detected at {} baud.", baud));
                        return Some(baud);
                    }
                }
                Err(e) => {
                    tracing::debug!("probe {} at {} failed: {}", port, baud, e);
                    if self.config.verbose {
                        console.say(&format!("Error at {} baud: {}", baud, e));
                    }
                }
            }
        }

        tracing::warn!("no candidate baud acknowledged AT on {}", port);
        console.say("Auto-detection failed.");
        None
    }

    /// Candidate detection followed by the manual fallback.
    ///
    /// Errors are console failures only; transport problems end in `Ok(None)`.
    pub fn detect(
        &mut self,
        port: &str,
        console: &mut dyn Console,
    ) -> std::io::Result<Option<u32>> {
        if let Some(baud) = self.detect_candidates(port, console) {
            return Ok(Some(baud));
        }

        if !confirm(console, "Manually enter AT mode baud rate?")? {
            return Ok(None);
        }

        let entry = console.ask("Enter baud rate: ")?;
        let baud = match parse_baud(&entry) {
            Ok(baud) => baud,
            Err(e) => {
                console.say(&format!("Error with manual baud rate: {}", e));
                return Ok(None);
            }
        };

        match self.probe_baud(port, baud) {
            Ok(report) => {
                if self.config.verbose {
                    console.say(&format!("Manual baud {}: {}", baud, report.describe()));
                }
                if report.acknowledged() {
                    tracing::info!("AT mode confirmed on {} at manual baud {}", port, baud);
                    console.say(&format!("AT mode confirmed at {} baud.", baud));
                    Ok(Some(baud))
                } else {
                    console.say("Manual baud rate did not confirm AT mode.");
                    Ok(None)
                }
            }
            Err(e) => {
                tracing::warn!("manual probe of {} at {} failed: {}", port, baud, e);
                console.say(&format!("Error with manual baud rate: {}", e));
                Ok(None)
            }
        }
    }
}

/// Parse an operator-entered baud rate
pub fn parse_baud(entry: &str) -> Result<u32, ProtocolError> {
    match entry.trim().parse::<u32>() {
        Ok(baud) if baud > 0 => Ok(baud),
        _ => Err(ProtocolError::InvalidBaud(entry.trim().to_string())),
    }
}
