// src/errors.rs

//! Crate-wide error types and aliases.

use std::time::Duration;

use thiserror::Error;

/// Why `ProcessSupervisor::start()` failed.
///
/// Every variant is terminal for the supervisor instance; a new supervisor
/// must be constructed to retry.
#[derive(Error, Debug)]
pub enum StartError {
    /// The driver binary could not be spawned at all (missing, not
    /// executable, ...).
    #[error("failed to spawn driver process: {0}")]
    Spawn(#[source] std::io::Error),

    /// The driver printed its failure marker during startup.
    #[error("driver reported an initialization failure: {0}")]
    InitializationFailed(String),

    /// The driver exited before printing either marker.
    #[error("driver exited before signalling readiness (exit code: {0})")]
    ExitedBeforeReady(i32),

    /// Neither marker nor an exit was observed within the deadline.
    #[error("driver did not become ready within {0:?}")]
    Timeout(Duration),

    /// `start()` was called on a supervisor that already left `Idle`.
    #[error("start() called more than once on the same supervisor")]
    AlreadyStarted,

    /// A marker pattern did not compile.
    #[error("invalid {which} marker pattern: {source}")]
    InvalidMarker {
        which: &'static str,
        #[source]
        source: regex::Error,
    },

    /// I/O failure while waiting on the driver process.
    #[error("I/O error while supervising driver process: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum DriverwatchError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    StartError(#[from] StartError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, DriverwatchError>;
