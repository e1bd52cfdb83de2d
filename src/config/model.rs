// src/config/model.rs

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::service::ServiceOptions;
use crate::supervisor::{
    DEFAULT_FAILURE_MARKER, DEFAULT_READY_MARKER, SupervisorOptions,
};
use crate::types::{OutputEncoding, StdinMode};

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [driver]
/// command = "C:\\tools\\WinAppDriver.exe"
/// args = ["--port", "4444"]
/// log_dir = "logs"
/// ready_marker = "listening for requests"
/// failure_marker = "Failed to initialize"
/// stdin = "ignore"
/// encoding = "auto"
/// start_timeout = "30s"
/// ```
///
/// All fields are optional and have defaults matching the stock
/// WinAppDriver install.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    /// The `[driver]` section.
    #[serde(default)]
    pub driver: DriverSection,
}

/// `[driver]` section, as deserialized (timeout still a string).
#[derive(Debug, Clone, Deserialize)]
pub struct DriverSection {
    /// Path of the driver binary to spawn.
    #[serde(default = "default_command")]
    pub command: String,

    /// Arguments passed verbatim to the binary.
    #[serde(default)]
    pub args: Vec<String>,

    /// Directory the log file is created under; no mirroring if unset.
    #[serde(default)]
    pub log_dir: Option<String>,

    /// Regex marking the driver as ready.
    #[serde(default = "default_ready_marker")]
    pub ready_marker: String,

    /// Regex marking a failed initialization.
    #[serde(default = "default_failure_marker")]
    pub failure_marker: String,

    /// `"ignore"` or `"pipe"`.
    #[serde(default)]
    pub stdin: StdinMode,

    /// `"auto"`, `"utf8"` or `"utf16le"`.
    #[serde(default)]
    pub encoding: OutputEncoding,

    /// Duration string, e.g. `"30s"` or `"500ms"`.
    #[serde(default = "default_start_timeout")]
    pub start_timeout: String,
}

fn default_command() -> String {
    crate::service::WINAPPDRIVER_BIN.to_string()
}

fn default_ready_marker() -> String {
    DEFAULT_READY_MARKER.to_string()
}

fn default_failure_marker() -> String {
    DEFAULT_FAILURE_MARKER.to_string()
}

fn default_start_timeout() -> String {
    "30s".to_string()
}

impl Default for DriverSection {
    fn default() -> Self {
        Self {
            command: default_command(),
            args: Vec::new(),
            log_dir: None,
            ready_marker: default_ready_marker(),
            failure_marker: default_failure_marker(),
            stdin: StdinMode::default(),
            encoding: OutputEncoding::default(),
            start_timeout: default_start_timeout(),
        }
    }
}

/// Validated configuration.
///
/// Produced from [`RawConfigFile`] via `TryFrom` (see `validate.rs`); by
/// then the markers are known to compile and the timeout has been parsed.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    driver: DriverSection,
    start_timeout: Duration,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(driver: DriverSection, start_timeout: Duration) -> Self {
        Self {
            driver,
            start_timeout,
        }
    }

    pub fn driver(&self) -> &DriverSection {
        &self.driver
    }

    pub fn start_timeout(&self) -> Duration {
        self.start_timeout
    }

    /// Effective options for the service layer.
    pub fn service_options(&self) -> ServiceOptions {
        ServiceOptions {
            supervisor: SupervisorOptions {
                command: PathBuf::from(&self.driver.command),
                args: self.driver.args.clone(),
                ready_marker: self.driver.ready_marker.clone(),
                failure_marker: self.driver.failure_marker.clone(),
                stdin: self.driver.stdin,
                encoding: self.driver.encoding,
                start_timeout: self.start_timeout,
            },
            log_dir: self.driver.log_dir.as_ref().map(PathBuf::from),
        }
    }
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self::new_unchecked(
            DriverSection::default(),
            crate::supervisor::DEFAULT_START_TIMEOUT,
        )
    }
}
