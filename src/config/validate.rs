// src/config/validate.rs

use std::time::Duration;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use regex::bytes::Regex;

use crate::config::model::{RawScenarioFile, ScenarioFile};
use crate::errors::{HarnessError, Result};
use crate::provider::provider_by_name;

/// Longest timeout or ready delay a scenario may ask for.
pub const MAX_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);

impl TryFrom<RawScenarioFile> for ScenarioFile {
    type Error = HarnessError;

    fn try_from(raw: RawScenarioFile) -> std::result::Result<Self, Self::Error> {
        let launch_order = validate_scenario(&raw)?;
        Ok(ScenarioFile::new_unchecked(raw.config, raw.process, launch_order))
    }
}

/// Validate a raw scenario and return its launch order.
pub fn validate_scenario(cfg: &RawScenarioFile) -> Result<Vec<String>> {
    ensure_has_processes(cfg)?;
    validate_global_config(cfg)?;
    validate_process_sources(cfg)?;
    validate_expectations(cfg)?;
    validate_process_dependencies(cfg)?;
    launch_order(cfg)
}

fn ensure_has_processes(cfg: &RawScenarioFile) -> Result<()> {
    if cfg.process.is_empty() {
        return Err(HarnessError::ConfigError(
            "scenario must contain at least one [process.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_global_config(cfg: &RawScenarioFile) -> Result<()> {
    if cfg.config.port_range_start >= cfg.config.port_range_end {
        return Err(HarnessError::ConfigError(format!(
            "[config] port range {}..{} is empty",
            cfg.config.port_range_start, cfg.config.port_range_end
        )));
    }
    if cfg.config.timeout.is_zero() {
        return Err(HarnessError::ConfigError(
            "[config].timeout must be greater than zero".to_string(),
        ));
    }
    if cfg.config.timeout > MAX_TIMEOUT {
        return Err(HarnessError::ConfigError(format!(
            "[config].timeout must not exceed {MAX_TIMEOUT:?}"
        )));
    }
    Ok(())
}

fn validate_process_sources(cfg: &RawScenarioFile) -> Result<()> {
    for (name, process) in cfg.process.iter() {
        match (&process.provider, &process.cmd) {
            (Some(_), Some(_)) => {
                return Err(HarnessError::ConfigError(format!(
                    "process '{name}' sets both `provider` and `cmd`"
                )));
            }
            (None, None) => {
                return Err(HarnessError::ConfigError(format!(
                    "process '{name}' needs either `provider` or `cmd`"
                )));
            }
            (Some(provider), None) => {
                if provider_by_name(provider).is_none() {
                    return Err(HarnessError::ConfigError(format!(
                        "process '{name}' uses unknown provider '{provider}'"
                    )));
                }
                if process.mode.is_none() {
                    return Err(HarnessError::ConfigError(format!(
                        "process '{name}' uses a provider but has no `mode`"
                    )));
                }
            }
            (None, Some(cmd)) => {
                if cmd.first().is_none_or(|program| program.is_empty()) {
                    return Err(HarnessError::ConfigError(format!(
                        "process '{name}' has an empty `cmd`"
                    )));
                }
            }
        }

        if process.timeout.is_some_and(|t| t.is_zero()) {
            return Err(HarnessError::ConfigError(format!(
                "process '{name}' timeout must be greater than zero"
            )));
        }
        if process.timeout.is_some_and(|t| t > MAX_TIMEOUT) {
            return Err(HarnessError::ConfigError(format!(
                "process '{name}' timeout must not exceed {MAX_TIMEOUT:?}"
            )));
        }
        if process.ready_delay.is_some_and(|d| d > MAX_TIMEOUT) {
            return Err(HarnessError::ConfigError(format!(
                "process '{name}' ready_delay must not exceed {MAX_TIMEOUT:?}"
            )));
        }

        if process.input.is_some() && process.input_hex.is_some() {
            return Err(HarnessError::ConfigError(format!(
                "process '{name}' sets both `input` and `input_hex`"
            )));
        }
        process.payload().map_err(|e| {
            HarnessError::ConfigError(format!("process '{name}' has invalid `input_hex`: {e}"))
        })?;
    }
    Ok(())
}

fn validate_expectations(cfg: &RawScenarioFile) -> Result<()> {
    for (name, process) in cfg.process.iter() {
        if let Some(pattern) = &process.expect.stdout_matches {
            Regex::new(pattern).map_err(|e| {
                HarnessError::ConfigError(format!(
                    "process '{name}' has an invalid `stdout_matches` regex: {e}"
                ))
            })?;
        }
        if process.expect.stdout_contains_input
            && process.input.is_none()
            && process.input_hex.is_none()
        {
            return Err(HarnessError::ConfigError(format!(
                "process '{name}' expects its input in stdout but has no `input`"
            )));
        }
    }
    Ok(())
}

fn validate_process_dependencies(cfg: &RawScenarioFile) -> Result<()> {
    for (name, process) in cfg.process.iter() {
        for dep in process.after.iter() {
            if !cfg.process.contains_key(dep) {
                return Err(HarnessError::ConfigError(format!(
                    "process '{}' has unknown dependency '{}' in `after`",
                    name, dep
                )));
            }
            if dep == name {
                return Err(HarnessError::ConfigError(format!(
                    "process '{}' cannot depend on itself in `after`",
                    name
                )));
            }
        }
    }
    Ok(())
}

fn launch_order(cfg: &RawScenarioFile) -> Result<Vec<String>> {
    // Edge direction: dep -> process, so `after = ["server"]` on the client
    // adds server -> client.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in cfg.process.keys() {
        graph.add_node(name.as_str());
    }

    for (name, process) in cfg.process.iter() {
        for dep in process.after.iter() {
            graph.add_edge(dep.as_str(), name.as_str(), ());
        }
    }

    match toposort(&graph, None) {
        Ok(order) => Ok(order.into_iter().map(str::to_string).collect()),
        Err(cycle) => Err(HarnessError::DependencyCycle(format!(
            "cycle detected in process dependencies involving '{}'",
            cycle.node_id()
        ))),
    }
}
