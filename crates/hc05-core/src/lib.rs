//! # HC-05 Core Library
//!
//! Core functionality for commissioning HC-05 Bluetooth serial modules.

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//!
//! This library provides:
//! - Serial port enumeration and opening
//! - AT-mode baud rate detection
//! - AT command/response sessions (query, apply, verify)
//! - Module configuration model with input validation
//! - An operator console seam with a scripted test double
//! - The interactive commissioning flow as an explicit state machine
//! - A simulated HC-05 for demo runs and tests
//!
//! ## Example
//!
//! ```rust,ignore
//! use hc05_core::protocol::{AtSession, BaudProber, ProberConfig, SystemSerial};
//! use hc05_core::wizard::ScriptedConsole;
//!
//! let mut backend = SystemSerial;
//! let mut console = ScriptedConsole::default();
//! let mut prober = BaudProber::new(&mut backend, ProberConfig::default());
//! if let Some(baud) = prober.detect_candidates("/dev/ttyUSB0", &mut console) {
//!     let mut session = AtSession::open(&mut backend, "/dev/ttyUSB0", baud, Default::default())?;
//!     println!("{:?}", session.query_current_config()?);
//! }
//! ```

pub mod console;
pub mod demo;
pub mod module_config;
pub mod protocol;
pub mod wizard;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::demo::DemoModule;
    pub use crate::module_config::{ConfigError, ModuleConfig, Role, UartSettings};
    pub use crate::protocol::{
        AtCommand, AtSession, BaudProber, PortInfo, ProberConfig, ProtocolError, SerialBackend,
        SessionTiming, SystemSerial, Transport,
    };
    pub use crate::console::Console;
    pub use crate::wizard::{ModuleOutcome, OutcomeKind, Wizard, WizardError};
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
