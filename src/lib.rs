// src/lib.rs

pub mod cli;
pub mod config;
pub mod errors;
pub mod logging;
pub mod service;
pub mod supervisor;
pub mod types;

use std::path::PathBuf;

use anyhow::anyhow;
use tracing::info;

use crate::cli::CliArgs;
use crate::errors::{DriverwatchError, Result};
use crate::service::ServiceOptions;
use crate::supervisor::ProcessSupervisor;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading (file, overridden by CLI flags)
/// - the process supervisor
/// - log mirroring
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = match &args.config {
        Some(path) => config::load_and_validate(path)?,
        None => config::load_if_present(config::default_config_path())?,
    };

    let mut options = cfg.service_options();
    if let Some(command) = &args.command {
        options.supervisor.command = PathBuf::from(command);
    }
    if !args.args.is_empty() {
        options.supervisor.args = args.args.clone();
    }
    if let Some(dir) = &args.log_dir {
        options.log_dir = Some(PathBuf::from(dir));
    }

    if args.dry_run {
        print_dry_run(&options);
        return Ok(());
    }

    let mut supervisor = ProcessSupervisor::new(options.supervisor.clone());
    supervisor.start().await.map_err(DriverwatchError::from)?;
    info!(pid = supervisor.pid(), "driver is ready");

    if let Some(dir) = &options.log_dir {
        supervisor.attach_log_file(dir.join(service::LOG_FILE_NAME))?;
    }

    let exit_code = tokio::select! {
        res = tokio::signal::ctrl_c() => {
            res.map_err(DriverwatchError::from)?;
            None
        }
        code = supervisor.wait_exited() => Some(code.unwrap_or(-1)),
    };

    match exit_code {
        None => {
            info!("shutdown requested; stopping driver");
            supervisor.stop();
            Ok(())
        }
        Some(code) => Err(DriverwatchError::Other(anyhow!(
            "driver exited unexpectedly (exit code: {code})"
        ))),
    }
}

/// Simple dry-run output: print the effective options.
fn print_dry_run(options: &ServiceOptions) {
    println!("driverwatch dry-run");
    println!("  command: {}", options.supervisor.command.display());
    if !options.supervisor.args.is_empty() {
        println!("  args: {:?}", options.supervisor.args);
    }
    if let Some(dir) = &options.log_dir {
        println!(
            "  log file: {}",
            dir.join(service::LOG_FILE_NAME).display()
        );
    }
    println!("  ready_marker: {}", options.supervisor.ready_marker);
    println!("  failure_marker: {}", options.supervisor.failure_marker);
    println!("  stdin: {:?}", options.supervisor.stdin);
    println!("  encoding: {:?}", options.supervisor.encoding);
    println!("  start_timeout: {:?}", options.supervisor.start_timeout);
}
