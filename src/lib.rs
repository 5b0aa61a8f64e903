// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod launcher;
pub mod logging;
pub mod ports;
pub mod provider;
pub mod types;

use std::path::PathBuf;

use anyhow::Result;
use tracing::debug;

use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::config::ScenarioFile;
use crate::engine::{build_spec, run_scenario};
use crate::ports::PortAllocator;

/// High-level entry point used by `main.rs`.
///
/// Loads and validates the scenario, then either prints the launch plan
/// (`--dry-run`) or runs it and prints the report.
///
/// Returns whether every expectation held.
pub async fn run(args: CliArgs) -> Result<bool> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_and_validate(&config_path)?;
    let ports = PortAllocator::new(cfg.config.port_range());

    if args.dry_run {
        print_dry_run(&cfg, &ports)?;
        return Ok(true);
    }

    let report = run_scenario(&cfg, &ports).await?;
    println!("{report}");
    Ok(report.passed())
}

/// Print the resolved command lines in launch order, using the port the
/// scenario would get.
fn print_dry_run(cfg: &ScenarioFile, ports: &PortAllocator) -> Result<()> {
    let port = ports.next_port()?;

    println!("tlsharness dry-run");
    println!("  config.host = {}", cfg.config.host);
    println!("  config.timeout = {:?}", cfg.config.timeout);
    println!("  port = {port}");
    println!();

    println!("processes ({}), in launch order:", cfg.process.len());
    for name in cfg.launch_order() {
        let process = &cfg.process[name];
        let spec = build_spec(name, process, &cfg.config, port)?;
        println!("  - {name}");
        println!("      cmd: {}", spec.cmd_line);
        println!("      timeout: {:?}", spec.timeout);
        if !process.after.is_empty() {
            println!("      after: {:?}", process.after);
        }
        if !spec.ready_delay.is_zero() {
            println!("      ready_delay: {:?}", spec.ready_delay);
        }
        if let Some(payload) = &spec.exchange.payload {
            println!("      input: {} byte(s)", payload.len());
        }
        if let Some(marker) = &spec.exchange.marker {
            println!("      ready_to_send: {marker:?}");
        }
    }

    debug!("dry-run complete (nothing spawned)");
    Ok(())
}
