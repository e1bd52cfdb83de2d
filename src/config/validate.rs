// src/config/validate.rs

use std::time::Duration;

use regex::Regex;

use crate::config::model::{ConfigFile, DriverSection, RawConfigFile};
use crate::errors::{DriverwatchError, Result};
use crate::types::parse_duration;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = DriverwatchError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_driver_section(&raw.driver)?;
        let start_timeout = parse_start_timeout(&raw.driver.start_timeout)?;
        Ok(ConfigFile::new_unchecked(raw.driver, start_timeout))
    }
}

fn validate_driver_section(driver: &DriverSection) -> Result<()> {
    if driver.command.trim().is_empty() {
        return Err(DriverwatchError::ConfigError(
            "[driver].command must not be empty".to_string(),
        ));
    }

    validate_marker("ready_marker", &driver.ready_marker)?;
    validate_marker("failure_marker", &driver.failure_marker)?;

    Ok(())
}

fn validate_marker(field: &str, pattern: &str) -> Result<()> {
    if pattern.is_empty() {
        return Err(DriverwatchError::ConfigError(format!(
            "[driver].{field} must not be empty"
        )));
    }
    if let Err(e) = Regex::new(pattern) {
        return Err(DriverwatchError::ConfigError(format!(
            "[driver].{field} is not a valid regex ('{pattern}'): {e}"
        )));
    }
    Ok(())
}

fn parse_start_timeout(s: &str) -> Result<Duration> {
    let dur = parse_duration(s).map_err(|e| {
        DriverwatchError::ConfigError(format!("[driver].start_timeout: {e}"))
    })?;
    if dur.is_zero() {
        return Err(DriverwatchError::ConfigError(
            "[driver].start_timeout must be greater than zero".to_string(),
        ));
    }
    Ok(dur)
}
