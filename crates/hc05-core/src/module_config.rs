//! Module configuration
//!
//! The settings written to a module during commissioning, with parsing and
//! validation of operator input.
//!
//! # Example
//!
//! ```
//! use hc05_core::module_config::{ModuleConfig, Role, UartSettings};
//!
//! let uart: UartSettings = "38400,0,0".parse().unwrap();
//! let cfg = ModuleConfig::new("Beacon-7", "4321", Role::Slave, uart).unwrap();
//! assert_eq!(cfg.uart.to_string(), "38400,0,0");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Default module name offered to the operator
pub const DEFAULT_NAME: &str = "HC-05";

/// Default pairing password offered to the operator
pub const DEFAULT_PSWD: &str = "1234";

/// Default role offered to the operator
pub const DEFAULT_ROLE: &str = "0";

/// Default UART settings offered to the operator
pub const DEFAULT_UART: &str = "9600,0,0";

/// Errors produced while parsing configuration input
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    #[error("{field} cannot contain line breaks")]
    LineBreak { field: &'static str },

    #[error("role must be 0 (slave) or 1 (master), got '{0}'")]
    InvalidRole(String),

    #[error("UART settings must be baud,stop,parity, got '{0}'")]
    InvalidUartFormat(String),

    #[error("invalid UART baud rate '{0}'")]
    InvalidUartBaud(String),

    #[error("stop bits code must be 0 or 1, got {0}")]
    InvalidStopBits(u8),

    #[error("parity code must be 0, 1 or 2, got {0}")]
    InvalidParity(u8),
}

/// Master/slave role of the module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Accepts incoming connections (`0`)
    Slave,
    /// Initiates connections (`1`)
    Master,
}

impl Role {
    /// Numeric code used on the wire
    pub fn code(self) -> u8 {
        match self {
            Role::Slave => 0,
            Role::Master => 1,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for Role {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "0" => Ok(Role::Slave),
            "1" => Ok(Role::Master),
            other => Err(ConfigError::InvalidRole(other.to_string())),
        }
    }
}

/// UART parameters: baud rate, stop bits code and parity code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UartSettings {
    /// Data baud rate
    pub baud: u32,
    /// 0 = one stop bit, 1 = two stop bits
    pub stop_bits: u8,
    /// 0 = none, 1 = odd, 2 = even
    pub parity: u8,
}

impl UartSettings {
    /// Create validated UART settings
    pub fn new(baud: u32, stop_bits: u8, parity: u8) -> Result<Self, ConfigError> {
        if baud == 0 {
            return Err(ConfigError::InvalidUartBaud(baud.to_string()));
        }
        if stop_bits > 1 {
            return Err(ConfigError::InvalidStopBits(stop_bits));
        }
        if parity > 2 {
            return Err(ConfigError::InvalidParity(parity));
        }
        Ok(Self {
            baud,
            stop_bits,
            parity,
        })
    }
}

impl Default for UartSettings {
    fn default() -> Self {
        Self {
            baud: 9600,
            stop_bits: 0,
            parity: 0,
        }
    }
}

impl fmt::Display for UartSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.baud, self.stop_bits, self.parity)
    }
}

impl FromStr for UartSettings {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        let [baud, stop, parity] = parts.as_slice() else {
            return Err(ConfigError::InvalidUartFormat(s.to_string()));
        };

        let baud: u32 = baud
            .parse()
            .map_err(|_| ConfigError::InvalidUartBaud(baud.to_string()))?;
        let stop: u8 = stop
            .parse()
            .map_err(|_| ConfigError::InvalidUartFormat(s.to_string()))?;
        let parity: u8 = parity
            .parse()
            .map_err(|_| ConfigError::InvalidUartFormat(s.to_string()))?;

        UartSettings::new(baud, stop, parity)
    }
}

/// Settings applied to a module
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleConfig {
    /// Bluetooth device name
    pub name: String,
    /// Pairing password
    pub pswd: String,
    /// Master/slave role
    pub role: Role,
    /// UART parameters
    pub uart: UartSettings,
}

impl ModuleConfig {
    /// Create a new validated configuration
    pub fn new(
        name: impl Into<String>,
        pswd: impl Into<String>,
        role: Role,
        uart: UartSettings,
    ) -> Result<Self, ConfigError> {
        let cfg = Self {
            name: name.into(),
            pswd: pswd.into(),
            role,
            uart,
        };
        cfg.validate()?;
        Ok(cfg)
    }

    /// Validate the free-text fields
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_text("name", &self.name)?;
        validate_text("password", &self.pswd)?;
        Ok(())
    }
}

impl Default for ModuleConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_NAME.to_string(),
            pswd: DEFAULT_PSWD.to_string(),
            role: Role::Slave,
            uart: UartSettings::default(),
        }
    }
}

/// Check a free-text field for emptiness and embedded line breaks
pub fn validate_text(field: &'static str, value: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Empty { field });
    }
    if value.contains(['\r', '\n']) {
        return Err(ConfigError::LineBreak { field });
    }
    Ok(())
}
