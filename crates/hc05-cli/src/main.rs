//! HC-05 commissioning tool
//!
//! Walks an operator through putting a batch of HC-05 modules into a known
//! configuration over their AT-mode serial interface.
//!
//! Usage:
//!   hc05-commission [OPTIONS]
//!
//! Run with `--demo` to try the flow against a simulated module.

#![deny(missing_docs, unsafe_code)]

use std::time::Duration;

use anyhow::Context;
use clap::Parser as _;
use hc05_core::demo::DemoModule;
use hc05_core::protocol::{
    format_port_line, ProberConfig, SerialBackend, SessionTiming, SystemSerial,
    DEFAULT_COMMAND_SETTLE_MS, DEFAULT_OPEN_SETTLE_MS, DEFAULT_READ_TIMEOUT_MS,
};
use hc05_core::wizard::{Wizard, WizardOptions};
use tracing_subscriber::EnvFilter;

mod console;
mod summary;

use console::StdConsole;
use summary::Summary;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    tracing::info!("hc05-commission {}", hc05_core::VERSION);

    if cli.demo {
        run(DemoModule::random(), &cli)
    } else {
        run(SystemSerial, &cli)
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run<B: SerialBackend>(mut backend: B, cli: &Cli) -> anyhow::Result<()> {
    if cli.list_ports {
        let ports = backend.list_ports();
        if ports.is_empty() {
            println!("No COM ports found.");
        }
        for (i, port) in ports.iter().enumerate() {
            println!("{}", format_port_line(i + 1, port));
        }
        return Ok(());
    }

    let mut wizard = Wizard::new(backend, cli.wizard_options());
    let mut console = StdConsole::new();
    let result = wizard.run(&mut console);

    let summary = Summary::new(wizard.outcomes());
    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&summary).context("failed to serialize summary")?
        );
    } else {
        print!("{}", summary);
    }

    result.context("commissioning stopped")
}

/// Commission HC-05 Bluetooth modules over their AT-mode serial interface
#[derive(clap::Parser, Debug)]
#[command(name = "hc05-commission", version)]
struct Cli {
    /// Print per-candidate probe diagnostics and debug logs
    #[arg(short, long, default_value_t = false)]
    verbose: bool,

    /// Use this serial port for every module instead of asking
    #[arg(short, long)]
    port: Option<String>,

    /// List serial ports and exit
    #[arg(long, default_value_t = false)]
    list_ports: bool,

    /// Read timeout for each port open, in milliseconds
    #[arg(long, default_value_t = DEFAULT_READ_TIMEOUT_MS)]
    read_timeout_ms: u64,

    /// Wait after opening a port before the first write, in milliseconds
    #[arg(long, default_value_t = DEFAULT_OPEN_SETTLE_MS)]
    open_settle_ms: u64,

    /// Wait between a command and reading its response, in milliseconds
    #[arg(long, default_value_t = DEFAULT_COMMAND_SETTLE_MS)]
    command_settle_ms: u64,

    /// Run against a simulated HC-05 instead of real hardware.
    ///
    /// The simulated module answers at a random candidate baud with no
    /// settle delays.
    #[arg(long, default_value_t = false)]
    demo: bool,

    /// Print the end-of-run summary as JSON
    #[arg(long, default_value_t = false)]
    json: bool,
}

impl Cli {
    fn timing(&self) -> SessionTiming {
        if self.demo {
            return SessionTiming::immediate();
        }
        SessionTiming {
            read_timeout: Duration::from_millis(self.read_timeout_ms),
            open_settle: Duration::from_millis(self.open_settle_ms),
            command_settle: Duration::from_millis(self.command_settle_ms),
        }
    }

    fn wizard_options(&self) -> WizardOptions {
        WizardOptions {
            prober: ProberConfig {
                timing: self.timing(),
                verbose: self.verbose,
                ..ProberConfig::default()
            },
            fixed_port: self.port.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["hc05-commission"]).unwrap();
        assert!(!cli.verbose);
        assert!(!cli.demo);
        assert_eq!(cli.port, None);
        assert_eq!(cli.timing(), SessionTiming::default());
    }

    #[test]
    fn test_timing_flags() {
        let cli = Cli::try_parse_from([
            "hc05-commission",
            "--read-timeout-ms",
            "250",
            "--open-settle-ms",
            "2000",
            "--command-settle-ms",
            "0",
        ])
        .unwrap();
        assert_eq!(
            cli.timing(),
            SessionTiming {
                read_timeout: Duration::from_millis(250),
                open_settle: Duration::from_millis(2000),
                command_settle: Duration::ZERO,
            }
        );
    }

    #[test]
    fn test_demo_uses_immediate_timing() {
        let cli = Cli::try_parse_from(["hc05-commission", "--demo", "--open-settle-ms", "5000"])
            .unwrap();
        assert_eq!(cli.timing(), SessionTiming::immediate());
    }

    #[test]
    fn test_port_and_verbose() {
        let cli = Cli::try_parse_from(["hc05-commission", "-v", "-p", "/dev/ttyUSB1"]).unwrap();
        let options = cli.wizard_options();
        assert_eq!(options.fixed_port.as_deref(), Some("/dev/ttyUSB1"));
        assert!(options.prober.verbose);
    }

    #[test]
    fn test_rejects_non_numeric_timing() {
        assert!(Cli::try_parse_from(["hc05-commission", "--read-timeout-ms", "soon"]).is_err());
    }
}
