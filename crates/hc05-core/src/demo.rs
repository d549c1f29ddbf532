//! Demo Mode - Simulated HC-05 module
//!
//! A [`SerialBackend`] that behaves like an HC-05 held in AT mode behind a
//! single USB-TTL adapter. It answers only at its AT baud rate; at any other
//! rate it replies with framing garbage, the way a real module does.
//!
//! Clones share state, so a test can hand one clone to the code under test
//! and inspect the traffic through another.

use rand::seq::SliceRandom;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::protocol::{PortInfo, ProtocolError, SerialBackend, Transport, CANDIDATE_BAUDS};

/// Device path of the simulated adapter
pub const DEMO_PORT: &str = "/dev/ttyDEMO0";

/// Bytes a module emits when the host reads it at the wrong rate
const GARBAGE: &[u8] = &[0x80, 0xf8, 0x00, 0xfe];

/// Reply to unknown or refused commands
const ERROR_REPLY: &str = "ERROR:(0)\r\n";

/// Write failure injected for lines starting with `prefix`, after
/// `passes` matching lines went through
#[derive(Debug, Clone)]
struct WriteFault {
    prefix: String,
    passes: usize,
}

/// Settings held by the simulated module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemoSettings {
    /// Device name
    pub name: String,
    /// Pairing password
    pub pswd: String,
    /// Role code
    pub role: String,
    /// UART triple
    pub uart: String,
}

impl Default for DemoSettings {
    fn default() -> Self {
        Self {
            name: "HC-05".to_string(),
            pswd: "1234".to_string(),
            role: "0".to_string(),
            uart: "9600,0,0".to_string(),
        }
    }
}

#[derive(Debug)]
struct DemoState {
    at_baud: u32,
    ports: Vec<PortInfo>,
    settings: DemoSettings,
    silent: bool,
    reject_prefix: Option<String>,
    busy_bauds: Vec<u32>,
    busy_after: Option<usize>,
    write_fault: Option<WriteFault>,
    opened: Vec<u32>,
    written: Vec<String>,
    open_handles: usize,
}

/// Simulated HC-05 backend
#[derive(Debug, Clone)]
pub struct DemoModule {
    state: Arc<Mutex<DemoState>>,
}

impl DemoModule {
    /// A module answering AT commands at `at_baud`
    pub fn new(at_baud: u32) -> Self {
        let port = PortInfo {
            description: "Simulated HC-05 (demo)".to_string(),
            ..PortInfo::bare(DEMO_PORT)
        };
        Self {
            state: Arc::new(Mutex::new(DemoState {
                at_baud,
                ports: vec![port],
                settings: DemoSettings::default(),
                silent: false,
                reject_prefix: None,
                busy_bauds: Vec::new(),
                busy_after: None,
                write_fault: None,
                opened: Vec::new(),
                written: Vec::new(),
                open_handles: 0,
            })),
        }
    }

    /// A module at a randomly chosen candidate baud
    pub fn random() -> Self {
        let mut rng = rand::thread_rng();
        let baud = CANDIDATE_BAUDS
            .choose(&mut rng)
            .copied()
            .unwrap_or(CANDIDATE_BAUDS[0]);
        Self::new(baud)
    }

    /// Never answer anything
    pub fn silent(self) -> Self {
        self.state().silent = true;
        self
    }

    /// Answer `ERROR` to commands starting with `prefix`
    pub fn rejecting(self, prefix: &str) -> Self {
        self.state().reject_prefix = Some(prefix.to_string());
        self
    }

    /// Fail to open at `baud`, as if the port were busy
    pub fn busy_at(self, baud: u32) -> Self {
        self.state().busy_bauds.push(baud);
        self
    }

    /// Fail every open after the first `opens` succeed, as if another
    /// program grabbed the port
    pub fn busy_after(self, opens: usize) -> Self {
        self.state().busy_after = Some(opens);
        self
    }

    /// Fail writes of lines starting with `prefix`, as if the adapter
    /// was unplugged mid-session
    pub fn failing_write(self, prefix: &str) -> Self {
        self.failing_write_after(prefix, 0)
    }

    /// Like [`DemoModule::failing_write`], but let the first `passes`
    /// matching lines through
    pub fn failing_write_after(self, prefix: &str, passes: usize) -> Self {
        self.state().write_fault = Some(WriteFault {
            prefix: prefix.to_string(),
            passes,
        });
        self
    }

    /// Replace the advertised port list
    pub fn with_ports(self, ports: Vec<PortInfo>) -> Self {
        self.state().ports = ports;
        self
    }

    /// The baud rate AT commands are answered at
    pub fn at_baud(&self) -> u32 {
        self.state().at_baud
    }

    /// Baud rates ports were opened at, in order
    pub fn opened(&self) -> Vec<u32> {
        self.state().opened.clone()
    }

    /// Lines written by the host, terminators included
    pub fn written(&self) -> Vec<String> {
        self.state().written.clone()
    }

    /// Lines written by the host, terminators stripped
    pub fn commands(&self) -> Vec<String> {
        self.written()
            .into_iter()
            .map(|line| line.trim_end_matches(['\r', '\n']).to_string())
            .collect()
    }

    /// Current module settings
    pub fn settings(&self) -> DemoSettings {
        self.state().settings.clone()
    }

    /// Transports currently open
    pub fn open_handles(&self) -> usize {
        self.state().open_handles
    }

    fn state(&self) -> MutexGuard<'_, DemoState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for DemoModule {
    fn default() -> Self {
        Self::random()
    }
}

impl SerialBackend for DemoModule {
    fn list_ports(&mut self) -> Vec<PortInfo> {
        self.state().ports.clone()
    }

    fn open(
        &mut self,
        port: &str,
        baud: u32,
        _read_timeout: Duration,
    ) -> Result<Box<dyn Transport>, ProtocolError> {
        let mut state = self.state();
        if !state.ports.iter().any(|p| p.name == port) {
            return Err(ProtocolError::PortNotFound(port.to_string()));
        }
        let exhausted = state
            .busy_after
            .is_some_and(|limit| state.opened.len() >= limit);
        if exhausted || state.busy_bauds.contains(&baud) {
            return Err(ProtocolError::SerialError(format!(
                "{}: Device or resource busy",
                port
            )));
        }
        state.opened.push(baud);
        state.open_handles += 1;
        drop(state);

        Ok(Box::new(DemoTransport {
            state: Arc::clone(&self.state),
            baud,
            pending: Vec::new(),
            rx: VecDeque::new(),
        }))
    }
}

struct DemoTransport {
    state: Arc<Mutex<DemoState>>,
    baud: u32,
    pending: Vec<u8>,
    rx: VecDeque<u8>,
}

impl DemoTransport {
    fn state(&self) -> MutexGuard<'_, DemoState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn handle_line(&mut self, line: &[u8]) -> Result<(), ProtocolError> {
        let text = String::from_utf8_lossy(line).to_string();
        let reply = {
            let mut state = self.state();
            if let Some(fault) = state.write_fault.as_mut() {
                if text.starts_with(fault.prefix.as_str()) {
                    if fault.passes == 0 {
                        return Err(ProtocolError::SerialError(format!(
                            "{}: device unplugged",
                            DEMO_PORT
                        )));
                    }
                    fault.passes -= 1;
                }
            }
            state.written.push(text.clone());

            if state.silent {
                return Ok(());
            }
            if self.baud != state.at_baud {
                GARBAGE.to_vec()
            } else {
                respond(&mut state, text.trim_end()).into_bytes()
            }
        };
        self.rx.extend(reply);
        Ok(())
    }
}

fn respond(state: &mut DemoState, command: &str) -> String {
    if let Some(prefix) = &state.reject_prefix {
        if command.starts_with(prefix.as_str()) {
            return ERROR_REPLY.to_string();
        }
    }

    let settings = &mut state.settings;
    match command {
        "AT" => "OK\r\n".to_string(),
        "AT+NAME?" => format!("+NAME:{}\r\nOK\r\n", settings.name),
        "AT+ROLE?" => format!("+ROLE:{}\r\nOK\r\n", settings.role),
        "AT+UART?" => format!("+UART:{}\r\nOK\r\n", settings.uart),
        _ => {
            let Some((key, value)) = command.split_once('=') else {
                return ERROR_REPLY.to_string();
            };
            let field = match key {
                "AT+NAME" => &mut settings.name,
                "AT+PSWD" => &mut settings.pswd,
                "AT+ROLE" => &mut settings.role,
                "AT+UART" => &mut settings.uart,
                _ => return ERROR_REPLY.to_string(),
            };
            *field = value.to_string();
            "OK\r\n".to_string()
        }
    }
}

impl Transport for DemoTransport {
    fn write_all(&mut self, data: &[u8]) -> Result<(), ProtocolError> {
        for &byte in data {
            self.pending.push(byte);
            if byte == b'\n' {
                let line = std::mem::take(&mut self.pending);
                self.handle_line(&line)?;
            }
        }
        Ok(())
    }

    fn clear_input(&mut self) -> Result<(), ProtocolError> {
        self.rx.clear();
        Ok(())
    }

    fn bytes_available(&mut self) -> Result<usize, ProtocolError> {
        Ok(self.rx.len())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, ProtocolError> {
        let n = buf.len().min(self.rx.len());
        for (slot, byte) in buf.iter_mut().zip(self.rx.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }
}

impl Drop for DemoTransport {
    fn drop(&mut self) {
        let mut state = self.state();
        state.open_handles = state.open_handles.saturating_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open(module: &DemoModule, baud: u32) -> Box<dyn Transport> {
        module
            .clone()
            .open(DEMO_PORT, baud, Duration::from_millis(10))
            .unwrap()
    }

    #[test]
    fn test_random_baud_is_candidate() {
        for _ in 0..20 {
            assert!(CANDIDATE_BAUDS.contains(&DemoModule::random().at_baud()));
        }
    }

    #[test]
    fn test_answers_at_its_baud() {
        let module = DemoModule::new(38400);
        let mut t = open(&module, 38400);
        t.write_all(b"AT\r\n").unwrap();
        assert_eq!(t.read_line().unwrap(), b"OK\r\n".to_vec());
    }

    #[test]
    fn test_garbage_at_other_baud() {
        let module = DemoModule::new(38400);
        let mut t = open(&module, 9600);
        t.write_all(b"AT\r\n").unwrap();
        assert_eq!(t.bytes_available().unwrap(), GARBAGE.len());
    }

    #[test]
    fn test_set_then_query() {
        let module = DemoModule::new(9600);
        let mut t = open(&module, 9600);
        t.write_all(b"AT+NAME=Beacon\r\n").unwrap();
        assert_eq!(t.read_line().unwrap(), b"OK\r\n".to_vec());
        t.write_all(b"AT+NAME?\r\n").unwrap();
        assert_eq!(t.read_line().unwrap(), b"+NAME:Beacon\r\n".to_vec());
        assert_eq!(module.settings().name, "Beacon");
    }

    #[test]
    fn test_rejecting_prefix() {
        let module = DemoModule::new(9600).rejecting("AT+PSWD=");
        let mut t = open(&module, 9600);
        t.write_all(b"AT+PSWD=0000\r\n").unwrap();
        assert_eq!(t.read_line().unwrap(), b"ERROR:(0)\r\n".to_vec());
        assert_eq!(module.settings().pswd, "1234");
    }

    #[test]
    fn test_failing_write_after_passes() {
        let module = DemoModule::new(9600).failing_write_after("AT+NAME?", 1);
        let mut t = open(&module, 9600);
        t.write_all(b"AT+NAME?\r\n").unwrap();
        assert!(matches!(
            t.write_all(b"AT+NAME?\r\n"),
            Err(ProtocolError::SerialError(_))
        ));
        t.write_all(b"AT+NAME=Beacon\r\n").unwrap();
        assert_eq!(module.commands(), vec!["AT+NAME?", "AT+NAME=Beacon"]);
    }

    #[test]
    fn test_handles_are_counted() {
        let module = DemoModule::new(9600);
        let t = open(&module, 9600);
        assert_eq!(module.open_handles(), 1);
        drop(t);
        assert_eq!(module.open_handles(), 0);
        assert_eq!(module.opened(), vec![9600]);
    }

    #[test]
    fn test_unknown_port() {
        let mut module = DemoModule::new(9600);
        assert!(matches!(
            module.open("/dev/ttyUSB7", 9600, Duration::from_millis(10)),
            Err(ProtocolError::PortNotFound(_))
        ));
    }
}
