//! Commissioning flow
//!
//! Drives one module after another through port selection, baud detection,
//! AT-mode confirmation, configuration and verification. Each stage is a
//! [`Step`]; failures turn into an operator decision (retry, skip, stop)
//! instead of propagating.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::module_config::{
    validate_text, ModuleConfig, Role, UartSettings, DEFAULT_NAME, DEFAULT_PSWD, DEFAULT_ROLE,
    DEFAULT_UART,
};
use crate::protocol::{
    format_port_line, ApplyOutcome, AtSession, BaudProber, ProberConfig, SerialBackend,
};
pub use crate::console::{ask_with_default, confirm, Console, ScriptedConsole};

/// Errors that end a commissioning run
#[derive(Error, Debug)]
pub enum WizardError {
    #[error("No COM ports found. Connect a device and try again.")]
    NoPorts,

    #[error("Console error: {0}")]
    Console(#[from] std::io::Error),
}

/// Run options
#[derive(Debug, Clone, Default)]
pub struct WizardOptions {
    /// Probe and session timing and verbosity
    pub prober: ProberConfig,
    /// Use this port for every module instead of asking
    pub fixed_port: Option<String>,
}

/// How a module's pass ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum OutcomeKind {
    /// Configuration applied; `verification` is the name query reply
    Configured {
        /// The applied configuration
        config: ModuleConfig,
        /// Reply to the verification query, if it could be read
        verification: Option<String>,
    },
    /// The operator chose not to change the module
    LeftUnchanged,
    /// The operator skipped the module after a failure or refusal
    Skipped {
        /// What went wrong
        reason: String,
    },
}

/// Record of one module's pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleOutcome {
    /// Port the module was on
    pub port: String,
    /// AT-mode baud rate, when detected
    pub baud: Option<u32>,
    /// Result of the pass
    #[serde(flatten)]
    pub kind: OutcomeKind,
}

/// Stages of one module's pass
enum Step {
    SelectPort,
    DetectBaud {
        port: String,
    },
    Connect {
        port: String,
        baud: u32,
    },
    ConfirmAtMode {
        port: String,
        session: AtSession,
    },
    QueryConfig {
        port: String,
        session: AtSession,
    },
    ChooseConfig {
        port: String,
        session: AtSession,
    },
    Apply {
        port: String,
        session: AtSession,
        config: ModuleConfig,
    },
    Verify {
        port: String,
        session: AtSession,
        config: ModuleConfig,
    },
    Recover {
        port: String,
        baud: Option<u32>,
        retry_prompt: &'static str,
        reason: String,
    },
    FinishModule,
    Done,
}

impl Step {
    fn name(&self) -> &'static str {
        match self {
            Step::SelectPort => "select-port",
            Step::DetectBaud { .. } => "detect-baud",
            Step::Connect { .. } => "connect",
            Step::ConfirmAtMode { .. } => "confirm-at-mode",
            Step::QueryConfig { .. } => "query-config",
            Step::ChooseConfig { .. } => "choose-config",
            Step::Apply { .. } => "apply",
            Step::Verify { .. } => "verify",
            Step::Recover { .. } => "recover",
            Step::FinishModule => "finish-module",
            Step::Done => "done",
        }
    }
}

/// Interactive commissioning of a series of modules
pub struct Wizard<B: SerialBackend> {
    backend: B,
    options: WizardOptions,
    last_config: Option<ModuleConfig>,
    outcomes: Vec<ModuleOutcome>,
}

impl<B: SerialBackend> Wizard<B> {
    /// Create a wizard over `backend`
    pub fn new(backend: B, options: WizardOptions) -> Self {
        Self {
            backend,
            options,
            last_config: None,
            outcomes: Vec::new(),
        }
    }

    /// Outcomes recorded so far, one per finished module
    pub fn outcomes(&self) -> &[ModuleOutcome] {
        &self.outcomes
    }

    /// Last configuration the operator accepted
    pub fn last_config(&self) -> Option<&ModuleConfig> {
        self.last_config.as_ref()
    }

    /// Run until the operator stops. Outcomes stay available on error.
    pub fn run(&mut self, console: &mut dyn Console) -> Result<(), WizardError> {
        let mut step = Step::SelectPort;
        loop {
            tracing::debug!("wizard step: {}", step.name());
            step = match step {
                Step::Done => return Ok(()),
                other => self.advance(other, console)?,
            };
        }
    }

    fn advance(&mut self, step: Step, console: &mut dyn Console) -> Result<Step, WizardError> {
        let timing = self.options.prober.timing;

        let next = match step {
            Step::SelectPort => {
                let port = self.select_port(console)?;
                Step::DetectBaud { port }
            }

            Step::DetectBaud { port } => {
                let mut prober = BaudProber::new(&mut self.backend, self.options.prober.clone());
                match prober.detect(&port, console)? {
                    Some(baud) => Step::Connect { port, baud },
                    None => Step::Recover {
                        port,
                        baud: None,
                        retry_prompt: "Failed auto-detection. Retry?",
                        reason: "AT mode baud rate not detected".to_string(),
                    },
                }
            }

            Step::Connect { port, baud } => {
                match AtSession::open(&mut self.backend, &port, baud, timing) {
                    Ok(session) => Step::ConfirmAtMode { port, session },
                    Err(e) => {
                        console.say(&format!("Connection error: {}", e));
                        Step::Recover {
                            port,
                            baud: Some(baud),
                            retry_prompt: "Retry connection?",
                            reason: format!("connection error: {}", e),
                        }
                    }
                }
            }

            Step::ConfirmAtMode { port, mut session } => match session.is_at_mode() {
                Ok(true) => {
                    console.say("Module connected and in AT mode.");
                    Step::QueryConfig { port, session }
                }
                Ok(false) => {
                    console.say("Module not responding in AT mode.");
                    let baud = Some(session.baud());
                    drop(session);
                    Step::Recover {
                        port,
                        baud,
                        retry_prompt: "Retry module?",
                        reason: "module not responding in AT mode".to_string(),
                    }
                }
                Err(e) => self.transport_failure(console, port, session, "Retry module?", e),
            },

            Step::QueryConfig { port, mut session } => {
                console.say("Querying current configuration:");
                match session.query_current_config() {
                    Ok(current) => {
                        console.say(&format!("Current module name: {}", current.name));
                        console.say(&format!("Current role: {}", current.role));
                        console.say(&format!("Current UART settings: {}", current.uart));
                        Step::ChooseConfig { port, session }
                    }
                    Err(e) => self.transport_failure(console, port, session, "Retry module?", e),
                }
            }

            Step::ChooseConfig { port, session } => {
                if !confirm(console, "Apply new configuration?")? {
                    console.say("Leaving module unchanged.");
                    self.record(&port, Some(session.baud()), OutcomeKind::LeftUnchanged);
                    return Ok(Step::FinishModule);
                }

                let reuse = match &self.last_config {
                    Some(_) => confirm(console, "Reuse last new config?")?,
                    None => false,
                };
                let config = match (&self.last_config, reuse) {
                    (Some(last), true) => {
                        console.say("Reusing previous configuration settings.");
                        last.clone()
                    }
                    _ => prompt_new_config(console)?,
                };
                self.last_config = Some(config.clone());

                if confirm(console, "Proceed with configuration?")? {
                    Step::Apply {
                        port,
                        session,
                        config,
                    }
                } else {
                    let baud = Some(session.baud());
                    drop(session);
                    self.skip_or_restart(console, port, baud, "configuration declined".to_string())?
                }
            }

            Step::Apply {
                port,
                mut session,
                config,
            } => match session.apply_config(&config) {
                Ok(outcome) => {
                    for exchange in outcome.exchanges() {
                        console.say(&format!(
                            "Sent: {} | Response: {}",
                            exchange.command, exchange.response
                        ));
                    }
                    match outcome {
                        ApplyOutcome::Applied(_) => Step::Verify {
                            port,
                            session,
                            config,
                        },
                        ApplyOutcome::Rejected { command, .. } => {
                            console.say(&format!("Error applying command: {}", command));
                            console.say("Configuration failed. Please address the error.");
                            let baud = Some(session.baud());
                            drop(session);
                            Step::Recover {
                                port,
                                baud,
                                retry_prompt: "Retry configuration for this module?",
                                reason: format!("module rejected {}", command),
                            }
                        }
                    }
                }
                Err(e) => self.transport_failure(
                    console,
                    port,
                    session,
                    "Retry configuration for this module?",
                    e,
                ),
            },

            Step::Verify {
                port,
                mut session,
                config,
            } => {
                let verification = match session.verify_config() {
                    Ok(response) => {
                        console.say(&format!("Verification (Name): {}", response));
                        Some(response)
                    }
                    Err(e) => {
                        console.say(&format!("Verification failed: {}", e));
                        None
                    }
                };
                console.say("Configuration applied successfully.");
                let baud = Some(session.baud());
                drop(session);
                self.record(
                    &port,
                    baud,
                    OutcomeKind::Configured {
                        config,
                        verification,
                    },
                );
                Step::FinishModule
            }

            Step::Recover {
                port,
                baud,
                retry_prompt,
                reason,
            } => {
                if confirm(console, retry_prompt)? {
                    Step::SelectPort
                } else {
                    self.skip_or_restart(console, port, baud, reason)?
                }
            }

            Step::FinishModule => {
                if confirm(console, "Proceed with next module?")? {
                    Step::SelectPort
                } else {
                    Step::Done
                }
            }

            Step::Done => Step::Done,
        };

        Ok(next)
    }

    fn select_port(&mut self, console: &mut dyn Console) -> Result<String, WizardError> {
        if let Some(port) = &self.options.fixed_port {
            console.say(&format!("Using port {}", port));
            return Ok(port.clone());
        }

        let ports = self.backend.list_ports();
        if ports.is_empty() {
            return Err(WizardError::NoPorts);
        }

        console.say("Available COM ports:");
        for (i, port) in ports.iter().enumerate() {
            console.say(&format_port_line(i + 1, port));
        }

        loop {
            let entry = console.ask("Select port number: ")?;
            match entry.trim().parse::<usize>() {
                Ok(n) if (1..=ports.len()).contains(&n) => return Ok(ports[n - 1].name.clone()),
                Ok(_) => console.say("Invalid selection."),
                Err(_) => console.say("Please enter a valid number."),
            }
        }
    }

    fn transport_failure(
        &mut self,
        console: &mut dyn Console,
        port: String,
        session: AtSession,
        retry_prompt: &'static str,
        error: crate::protocol::ProtocolError,
    ) -> Step {
        tracing::warn!("transport failure on {}: {}", port, error);
        console.say(&format!("Connection error: {}", error));
        let baud = Some(session.baud());
        drop(session);
        Step::Recover {
            port,
            baud,
            retry_prompt,
            reason: format!("connection error: {}", error),
        }
    }

    fn skip_or_restart(
        &mut self,
        console: &mut dyn Console,
        port: String,
        baud: Option<u32>,
        reason: String,
    ) -> Result<Step, WizardError> {
        if !confirm(console, "Skip module?")? {
            return Ok(Step::SelectPort);
        }

        self.record(&port, baud, OutcomeKind::Skipped { reason });
        if confirm(console, "Proceed with next module?")? {
            Ok(Step::SelectPort)
        } else {
            Ok(Step::Done)
        }
    }

    fn record(&mut self, port: &str, baud: Option<u32>, kind: OutcomeKind) {
        tracing::info!("module on {} finished: {:?}", port, kind);
        self.outcomes.push(ModuleOutcome {
            port: port.to_string(),
            baud,
            kind,
        });
    }
}

/// Ask for each configuration field, repeating a field until it parses
pub fn prompt_new_config(console: &mut dyn Console) -> Result<ModuleConfig, WizardError> {
    console.say("Enter new configuration settings (press Enter to accept default):");

    let name = ask_valid(console, "New module name", DEFAULT_NAME, |s| {
        validate_text("name", s).map(|_| s.to_string())
    })?;
    let pswd = ask_valid(console, "New AT password", DEFAULT_PSWD, |s| {
        validate_text("password", s).map(|_| s.to_string())
    })?;
    let role = ask_valid(
        console,
        "New role (0=slave, 1=master)",
        DEFAULT_ROLE,
        |s| s.parse::<Role>(),
    )?;
    let uart = ask_valid(
        console,
        "New UART settings (baud,stop,parity)",
        DEFAULT_UART,
        |s| s.parse::<UartSettings>(),
    )?;

    Ok(ModuleConfig {
        name,
        pswd,
        role,
        uart,
    })
}

fn ask_valid<T, E: std::fmt::Display>(
    console: &mut dyn Console,
    label: &str,
    default: &str,
    parse: impl Fn(&str) -> Result<T, E>,
) -> Result<T, WizardError> {
    loop {
        let entry = ask_with_default(console, label, default)?;
        match parse(&entry) {
            Ok(value) => return Ok(value),
            Err(e) => console.say(&format!("Invalid value: {}", e)),
        }
    }
}
