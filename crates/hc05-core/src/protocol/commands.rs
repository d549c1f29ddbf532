//! AT commands
//!
//! Defines the subset of the HC-05 AT command set used for commissioning.

use std::fmt;

use super::LINE_TERMINATOR;
use crate::module_config::{ModuleConfig, Role, UartSettings};

/// AT commands sent to the module
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AtCommand {
    /// Attention probe (`AT`)
    Test,

    /// Query the Bluetooth device name (`AT+NAME?`)
    QueryName,

    /// Query master/slave role (`AT+ROLE?`)
    QueryRole,

    /// Query UART parameters (`AT+UART?`)
    QueryUart,

    /// Set the device name (`AT+NAME=<name>`)
    SetName(String),

    /// Set the pairing password (`AT+PSWD=<pswd>`)
    SetPassword(String),

    /// Set the role (`AT+ROLE=<0|1>`)
    SetRole(Role),

    /// Set UART parameters (`AT+UART=<baud>,<stop>,<parity>`)
    SetUart(UartSettings),
}

impl AtCommand {
    /// The write commands for a configuration, in the order they must be sent
    pub fn apply_sequence(cfg: &ModuleConfig) -> [AtCommand; 4] {
        [
            AtCommand::SetName(cfg.name.clone()),
            AtCommand::SetPassword(cfg.pswd.clone()),
            AtCommand::SetRole(cfg.role),
            AtCommand::SetUart(cfg.uart),
        ]
    }

    /// Convert command to bytes, appending the line terminator for transmission
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = self.to_string().into_bytes();
        bytes.extend_from_slice(LINE_TERMINATOR.as_bytes());
        bytes
    }
}

impl fmt::Display for AtCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AtCommand::Test => write!(f, "AT"),
            AtCommand::QueryName => write!(f, "AT+NAME?"),
            AtCommand::QueryRole => write!(f, "AT+ROLE?"),
            AtCommand::QueryUart => write!(f, "AT+UART?"),
            AtCommand::SetName(name) => write!(f, "AT+NAME={}", name),
            AtCommand::SetPassword(pswd) => write!(f, "AT+PSWD={}", pswd),
            AtCommand::SetRole(role) => write!(f, "AT+ROLE={}", role),
            AtCommand::SetUart(uart) => write!(f, "AT+UART={}", uart),
        }
    }
}
