// src/engine/mod.rs

//! Scenario engine.
//!
//! Turns a validated [`ScenarioFile`](crate::config::ScenarioFile) into
//! running provider processes, waits for every result and checks it:
//!
//! - [`runtime`] launches processes in dependency order and collects
//!   results.
//! - [`expect`] evaluates `[process.<name>.expect]` blocks.

use std::fmt;
use std::sync::Arc;

use crate::exec::{CommandLine, ResultRecord};

pub mod expect;
pub mod runtime;

pub use expect::check_expectations;
pub use runtime::{build_spec, run_scenario};

/// Outcome of one process within a scenario.
#[derive(Debug, Clone)]
pub struct ProcessReport {
    pub name: String,
    pub cmd_line: CommandLine,
    /// `None` only if no result was published in time.
    pub record: Option<Arc<ResultRecord>>,
    pub violations: Vec<String>,
}

impl ProcessReport {
    pub fn passed(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Outcome of a whole scenario, in launch order.
#[derive(Debug, Clone)]
pub struct ScenarioReport {
    pub port: u16,
    pub processes: Vec<ProcessReport>,
}

impl ScenarioReport {
    pub fn passed(&self) -> bool {
        self.processes.iter().all(ProcessReport::passed)
    }

    pub fn process(&self, name: &str) -> Option<&ProcessReport> {
        self.processes.iter().find(|p| p.name == name)
    }
}

impl fmt::Display for ScenarioReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "scenario on port {}", self.port)?;
        for p in self.processes.iter() {
            let status = if p.passed() { "PASS" } else { "FAIL" };
            writeln!(f, "  [{status}] {}", p.name)?;
            writeln!(f, "      cmd: {}", p.cmd_line)?;
            if let Some(record) = &p.record {
                writeln!(f, "      exit code: {:?}", record.exit_code)?;
                if let Some(signal) = record.signal() {
                    writeln!(f, "      killed by signal {signal}")?;
                }
                if let Some(failure) = &record.failure {
                    writeln!(f, "      failure: {failure}")?;
                }
            }
            for v in p.violations.iter() {
                writeln!(f, "      - {v}")?;
            }
        }
        let verdict = if self.passed() { "passed" } else { "failed" };
        write!(f, "scenario {verdict}")
    }
}
