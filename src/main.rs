// src/main.rs

//! The entry point of the Sentinel provisioner.

use anyhow::{Context, Result};
use sentinel_provisioner::config::Config;
use sentinel_provisioner::core::Orchestrator;
use sentinel_provisioner::host::{DryRunHost, HostProvider, LocalHost};
use sentinel_provisioner::render::BuiltinRenderer;
use std::env;
use std::fs;
use tracing::{error, info};
use tracing_subscriber::{filter::EnvFilter, prelude::*};

const USAGE: &str =
    "Usage: sentinel-provisioner [--config <path>] [--dry-run] [--report <path>] [--version]";

fn main() -> Result<()> {
    const VERSION: &str = env!("CARGO_PKG_VERSION");

    let args: Vec<String> = env::args().collect();

    if args.contains(&"--version".to_string()) {
        println!("sentinel-provisioner version {VERSION}");
        return Ok(());
    }
    if args.contains(&"--help".to_string()) {
        println!("{USAGE}");
        return Ok(());
    }

    let config_path = flag_value(&args, "--config").unwrap_or("sentinels.toml");
    let report_path = flag_value(&args, "--report");
    let dry_run = args.contains(&"--dry-run".to_string());

    // The provisioner cannot do anything without a valid provisioning file.
    let config = match Config::from_file(config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to load provisioning file \"{config_path}\": {e:#}");
            std::process::exit(1);
        }
    };

    // RUST_LOG takes precedence over the file's log_level.
    let log_level = env::var("RUST_LOG").unwrap_or_else(|_| config.log_level.clone());
    tracing_subscriber::registry()
        .with(EnvFilter::new(log_level))
        .with(tracing_subscriber::fmt::layer().compact().with_ansi(true))
        .init();

    info!(
        "sentinel-provisioner {} converging {} instance(s){}.",
        VERSION,
        config.sentinels.len(),
        if dry_run { " (dry run)" } else { "" }
    );

    let local = LocalHost::default();
    let dry = DryRunHost::new(local.clone());
    let host: &dyn HostProvider = if dry_run { &dry } else { &local };
    let renderer = BuiltinRenderer;

    let report = Orchestrator::new(host, &renderer, &config.host)
        .run_entries(&config.sentinels, &config.defaults);

    if let Some(path) = report_path {
        let json = serde_json::to_string_pretty(&report)?;
        fs::write(path, json).with_context(|| format!("Failed to write report to '{path}'"))?;
        info!("Report written to {}.", path);
    }

    if !report.succeeded() {
        error!(
            "{} of {} instance(s) failed to converge.",
            report.failed_count(),
            report.instances.len()
        );
        std::process::exit(1);
    }
    Ok(())
}

/// Returns the value following `flag`, exiting with usage if it is missing.
fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    let index = args.iter().position(|arg| arg == flag)?;
    match args.get(index + 1) {
        Some(value) => Some(value.as_str()),
        None => {
            eprintln!("{flag} flag requires a value\n{USAGE}");
            std::process::exit(1);
        }
    }
}
