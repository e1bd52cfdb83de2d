// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `driverwatch`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "driverwatch",
    version,
    about = "Supervise a driver process: spawn it, wait for its readiness banner, mirror its logs.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// If omitted, `Driverwatch.toml` in the working directory is used when
    /// present, else built-in defaults (the well-known WinAppDriver install
    /// path, no log directory).
    #[arg(long, value_name = "PATH")]
    pub config: Option<String>,

    /// Driver executable to spawn; overrides the config file.
    #[arg(long, value_name = "PATH")]
    pub command: Option<String>,

    /// Directory the driver log file is created under; overrides the config.
    #[arg(long, value_name = "DIR")]
    pub log_dir: Option<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `DRIVERWATCH_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the effective options, but don't spawn
    /// anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Arguments passed verbatim to the driver executable.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "ARGS")]
    pub args: Vec<String>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
