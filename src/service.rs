// src/service.rs

//! Host-facing lifecycle glue for the WinAppDriver supervisor.
//!
//! A test runner calls [`DriverService::on_prepare`] once before the
//! session and [`DriverService::on_complete`] once after it; everything in
//! between goes through the [`ProcessSupervisor`]. WinAppDriver only
//! exists on Windows, so on every other platform `on_prepare` logs one
//! informational notice and does nothing.

use std::path::PathBuf;

use tracing::info;

use crate::errors::{DriverwatchError, Result};
use crate::supervisor::{ProcessSupervisor, SupervisorOptions};

/// Default WinAppDriver install location.
pub const WINAPPDRIVER_BIN: &str =
    r"C:\Program Files (x86)\Windows Application Driver\WinAppDriver.exe";

/// Fixed log file name created under the configured log directory.
pub const LOG_FILE_NAME: &str = "winappdriver.log";

/// Options for the service layer: supervisor options plus where logs go.
#[derive(Debug, Clone, Default)]
pub struct ServiceOptions {
    pub supervisor: SupervisorOptions,

    /// Directory the `winappdriver.log` file is created under. Falls back
    /// to the host's output directory when unset.
    pub log_dir: Option<PathBuf>,
}

/// The slice of host configuration the service consumes.
#[derive(Debug, Clone, Default)]
pub struct HostConfig {
    /// The host test runner's output directory, used as the log directory
    /// fallback.
    pub output_dir: Option<PathBuf>,
}

/// Session-scoped driver service.
pub struct DriverService {
    options: ServiceOptions,
    supervisor: Option<ProcessSupervisor>,
}

impl DriverService {
    pub fn new(options: ServiceOptions) -> Self {
        Self {
            options,
            supervisor: None,
        }
    }

    /// Called by the host once before the session starts.
    ///
    /// Capabilities are accepted opaquely and not interpreted here. On
    /// non-Windows platforms this is a documented no-op.
    pub async fn on_prepare(
        &mut self,
        host: &HostConfig,
        _capabilities: &[serde_json::Value],
    ) -> Result<()> {
        if !cfg!(windows) {
            info!("driver service is ignored on non-Windows platforms");
            return Ok(());
        }
        let log_dir = self.resolve_log_dir(host);
        self.prepare_session(log_dir).await
    }

    /// Log directory precedence: service options first, then the host's
    /// output directory.
    pub fn resolve_log_dir(&self, host: &HostConfig) -> Option<PathBuf> {
        self.options
            .log_dir
            .clone()
            .or_else(|| host.output_dir.clone())
    }

    /// Platform-independent session bootstrap: start the supervisor, then
    /// attach the log file.
    ///
    /// A start failure aborts the bootstrap with no supervisor retained. A
    /// log attach failure is surfaced, but the driver keeps running and
    /// stays attached to the service, so the caller can decide whether to
    /// proceed without logging.
    pub async fn prepare_session(&mut self, log_dir: Option<PathBuf>) -> Result<()> {
        let mut supervisor = ProcessSupervisor::new(self.options.supervisor.clone());
        supervisor.start().await.map_err(DriverwatchError::from)?;

        let attach_result = match log_dir {
            Some(dir) => supervisor.attach_log_file(dir.join(LOG_FILE_NAME)),
            None => Ok(()),
        };
        self.supervisor = Some(supervisor);

        attach_result.map_err(DriverwatchError::from)
    }

    /// Called by the host once after the session ends.
    ///
    /// Safe to call repeatedly or without a prior `on_prepare`.
    pub fn on_complete(&mut self) {
        if let Some(supervisor) = self.supervisor.as_mut() {
            supervisor.stop();
        }
    }

    /// Access the supervisor started by this service, if any.
    pub fn supervisor_mut(&mut self) -> Option<&mut ProcessSupervisor> {
        self.supervisor.as_mut()
    }
}
