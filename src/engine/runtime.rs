// src/engine/runtime.rs

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::{ConfigSection, ProcessConfig, ScenarioFile};
use crate::errors::{HarnessError, Result};
use crate::exec::{CommandLine, ManagedProcess, ProcessSpec};
use crate::launcher::Launcher;
use crate::ports::PortAllocator;
use crate::provider::{ProviderOptions, provider_by_name};

use super::expect::check_expectations;
use super::{ProcessReport, ScenarioReport};

/// Run a validated scenario end to end.
///
/// One port is allocated for the whole scenario. Processes are launched in
/// dependency order; each launch waits for readiness, so everything listed
/// in a process's `after` is ready before it starts. Once all are running,
/// every result is collected and checked against its `expect` block.
pub async fn run_scenario(cfg: &ScenarioFile, ports: &PortAllocator) -> Result<ScenarioReport> {
    let port = ports.next_port()?;
    info!(port, order = ?cfg.launch_order(), "running scenario");

    let mut launcher = Launcher::new();
    let launched = match launch_all(cfg, port, &mut launcher).await {
        Ok(launched) => launched,
        Err(e) => {
            // Let whatever did start run to completion before bailing out.
            if let Err(join_err) = launcher.join_all().await {
                debug!(error = %join_err, "process failed while aborting the scenario");
            }
            return Err(e);
        }
    };

    let mut processes = Vec::with_capacity(launched.len());
    for (name, process) in launched {
        let process_cfg = &cfg.process[&name];
        let input = process.spec().exchange.payload.clone();

        let (record, violations) = match process.get_results().await {
            Ok(record) => {
                let violations =
                    check_expectations(&process_cfg.expect, input.as_deref(), &record);
                (Some(record), violations)
            }
            Err(e) => (None, vec![e.to_string()]),
        };

        if violations.is_empty() {
            info!(process = %name, "expectations met");
        } else {
            warn!(process = %name, ?violations, "expectations violated");
        }

        processes.push(ProcessReport {
            name,
            cmd_line: process.cmd_line().clone(),
            record,
            violations,
        });
    }

    // Spawn failures are already reported through each result record.
    if let Err(e) = launcher.join_all().await {
        warn!(error = %e, "scenario finished with an abnormally terminated process");
    }

    Ok(ScenarioReport { port, processes })
}

async fn launch_all(
    cfg: &ScenarioFile,
    port: u16,
    launcher: &mut Launcher,
) -> Result<Vec<(String, Arc<ManagedProcess>)>> {
    let mut launched = Vec::new();
    for name in cfg.launch_order() {
        let spec = build_spec(name, &cfg.process[name], &cfg.config, port)?;
        let process = launcher.launch_spec(spec).await?;
        launched.push((name.clone(), process));
    }
    Ok(launched)
}

/// Resolve one `[process.<name>]` section into a launchable spec.
pub fn build_spec(
    name: &str,
    process: &ProcessConfig,
    config: &ConfigSection,
    port: u16,
) -> Result<ProcessSpec> {
    let timeout = process.effective_timeout(config.timeout);

    let mut spec = match (&process.provider, &process.cmd) {
        (Some(provider_name), None) => {
            let provider = provider_by_name(provider_name).ok_or_else(|| {
                HarnessError::ConfigError(format!(
                    "process '{name}' uses unknown provider '{provider_name}'"
                ))
            })?;
            let options = provider_options(name, process, config, port)?;
            provider.process_spec(&options, timeout)?
        }
        (None, Some(cmd)) => {
            let port = port.to_string();
            let args = cmd
                .iter()
                .map(|arg| arg.replace("{host}", &config.host).replace("{port}", &port));
            let mut spec = ProcessSpec::new(CommandLine::new(args)?, timeout);
            if let Some(payload) = payload_of(name, process)? {
                spec = spec.with_payload(payload);
            }
            spec
        }
        _ => {
            return Err(HarnessError::ConfigError(format!(
                "process '{name}' needs exactly one of `provider` or `cmd`"
            )));
        }
    };

    if let Some(marker) = &process.ready_to_send {
        spec = spec.with_marker(marker.as_str());
    }
    if let Some(delay) = process.ready_delay {
        spec = spec.with_ready_delay(delay);
    }
    Ok(spec)
}

fn provider_options(
    name: &str,
    process: &ProcessConfig,
    config: &ConfigSection,
    port: u16,
) -> Result<ProviderOptions> {
    let mode = process.mode.ok_or_else(|| {
        HarnessError::ConfigError(format!("process '{name}' uses a provider but has no `mode`"))
    })?;

    let mut options = ProviderOptions::new(mode, config.host.clone(), port);
    options.cipher = process.cipher;
    options.curve = process.curve.clone();
    options.key = process.key.clone();
    options.cert = process.cert.clone();
    options.use_session_ticket = process.use_session_ticket;
    options.insecure = process.insecure;
    options.protocol = process.protocol;
    options.data_to_send = payload_of(name, process)?;
    options.extra_flags = process.extra_flags.clone();
    Ok(options)
}

fn payload_of(name: &str, process: &ProcessConfig) -> Result<Option<Vec<u8>>> {
    process.payload().map_err(|e| {
        HarnessError::ConfigError(format!("process '{name}' has invalid `input_hex`: {e}"))
    })
}
