//! End-of-run summary

use std::fmt;

use hc05_core::wizard::{ModuleOutcome, OutcomeKind};
use serde::Serialize;

/// Per-module results of a run, with totals
#[derive(Debug, Serialize)]
pub struct Summary<'a> {
    pub configured: usize,
    pub left_unchanged: usize,
    pub skipped: usize,
    pub modules: &'a [ModuleOutcome],
}

impl<'a> Summary<'a> {
    pub fn new(modules: &'a [ModuleOutcome]) -> Self {
        let mut summary = Self {
            configured: 0,
            left_unchanged: 0,
            skipped: 0,
            modules,
        };
        for outcome in modules {
            match outcome.kind {
                OutcomeKind::Configured { .. } => summary.configured += 1,
                OutcomeKind::LeftUnchanged => summary.left_unchanged += 1,
                OutcomeKind::Skipped { .. } => summary.skipped += 1,
            }
        }
        summary
    }
}

impl fmt::Display for Summary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f)?;
        writeln!(f, "Summary:")?;
        if self.modules.is_empty() {
            return writeln!(f, "  No modules processed.");
        }

        for (i, outcome) in self.modules.iter().enumerate() {
            let baud = match outcome.baud {
                Some(baud) => format!("{} baud", baud),
                None => "baud unknown".to_string(),
            };
            write!(f, "  {}: {} ({}) - ", i + 1, outcome.port, baud)?;
            match &outcome.kind {
                OutcomeKind::Configured {
                    config,
                    verification,
                } => {
                    write!(
                        f,
                        "configured name={} role={} uart={}",
                        config.name, config.role, config.uart
                    )?;
                    match verification {
                        Some(reply) => writeln!(f, ", verified {}", reply)?,
                        None => writeln!(f, ", not verified")?,
                    }
                }
                OutcomeKind::LeftUnchanged => writeln!(f, "left unchanged")?,
                OutcomeKind::Skipped { reason } => writeln!(f, "skipped: {}", reason)?,
            }
        }

        writeln!(
            f,
            "{} configured, {} unchanged, {} skipped",
            self.configured, self.left_unchanged, self.skipped
        )
    }
}
