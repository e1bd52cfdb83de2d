// tests/config_behaviour.rs

mod common;
use crate::common::init_tracing;

use std::error::Error;
use std::fs;
use std::time::Duration;

use driverwatch::config::{ConfigFile, RawConfigFile, load_and_validate, load_if_present};
use driverwatch::errors::DriverwatchError;
use driverwatch::service::WINAPPDRIVER_BIN;
use driverwatch::supervisor::{DEFAULT_FAILURE_MARKER, DEFAULT_READY_MARKER};
use driverwatch::types::{OutputEncoding, StdinMode, parse_duration};

type TestResult = Result<(), Box<dyn Error>>;

fn load_str(contents: &str) -> driverwatch::errors::Result<ConfigFile> {
    let raw: RawConfigFile = toml::from_str(contents).expect("test TOML must parse");
    ConfigFile::try_from(raw)
}

#[test]
fn empty_config_applies_defaults() -> TestResult {
    init_tracing();
    let cfg = load_str("")?;

    assert_eq!(cfg.driver().command, WINAPPDRIVER_BIN);
    assert!(cfg.driver().args.is_empty());
    assert!(cfg.driver().log_dir.is_none());
    assert_eq!(cfg.driver().ready_marker, DEFAULT_READY_MARKER);
    assert_eq!(cfg.driver().failure_marker, DEFAULT_FAILURE_MARKER);
    assert_eq!(cfg.driver().stdin, StdinMode::Ignore);
    assert_eq!(cfg.driver().encoding, OutputEncoding::Auto);
    assert_eq!(cfg.start_timeout(), Duration::from_secs(30));
    Ok(())
}

#[test]
fn full_config_parses() -> TestResult {
    init_tracing();
    let cfg = load_str(
        r#"
        [driver]
        command = "/opt/driver/bin/driverd"
        args = ["--port", "4444"]
        log_dir = "logs"
        ready_marker = "listening for requests"
        failure_marker = "cannot bind"
        stdin = "pipe"
        encoding = "utf16le"
        start_timeout = "250ms"
        "#,
    )?;

    assert_eq!(cfg.driver().command, "/opt/driver/bin/driverd");
    assert_eq!(cfg.driver().args, vec!["--port", "4444"]);
    assert_eq!(cfg.driver().log_dir.as_deref(), Some("logs"));
    assert_eq!(cfg.driver().stdin, StdinMode::Pipe);
    assert_eq!(cfg.driver().encoding, OutputEncoding::Utf16Le);
    assert_eq!(cfg.start_timeout(), Duration::from_millis(250));
    Ok(())
}

#[test]
fn service_options_reflect_the_config() -> TestResult {
    init_tracing();
    let cfg = load_str(
        r#"
        [driver]
        command = "driverd"
        args = ["--verbose"]
        log_dir = "out"
        start_timeout = "2s"
        "#,
    )?;

    let options = cfg.service_options();
    assert_eq!(options.supervisor.command.to_string_lossy(), "driverd");
    assert_eq!(options.supervisor.args, vec!["--verbose"]);
    assert_eq!(options.supervisor.start_timeout, Duration::from_secs(2));
    assert_eq!(options.log_dir.as_deref().map(|p| p.to_string_lossy().into_owned()),
        Some("out".to_string()));
    Ok(())
}

#[test]
fn empty_command_is_rejected() {
    init_tracing();
    let err = load_str("[driver]\ncommand = \"  \"\n").expect_err("empty command");
    assert!(matches!(err, DriverwatchError::ConfigError(_)), "got {err:?}");
}

#[test]
fn invalid_marker_regex_is_rejected() {
    init_tracing();
    let err = load_str("[driver]\nready_marker = \"[\"\n").expect_err("bad regex");
    assert!(matches!(err, DriverwatchError::ConfigError(_)), "got {err:?}");
}

#[test]
fn zero_timeout_is_rejected() {
    init_tracing();
    let err = load_str("[driver]\nstart_timeout = \"0s\"\n").expect_err("zero timeout");
    assert!(matches!(err, DriverwatchError::ConfigError(_)), "got {err:?}");
}

#[test]
fn malformed_timeout_is_rejected() {
    init_tracing();
    let err = load_str("[driver]\nstart_timeout = \"soon\"\n").expect_err("bad duration");
    assert!(matches!(err, DriverwatchError::ConfigError(_)), "got {err:?}");
}

#[test]
fn load_and_validate_reads_from_disk() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("Driverwatch.toml");
    fs::write(&path, "[driver]\ncommand = \"driverd\"\n")?;

    let cfg = load_and_validate(&path)?;
    assert_eq!(cfg.driver().command, "driverd");
    Ok(())
}

#[test]
fn load_if_present_prefers_an_existing_file() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("Driverwatch.toml");
    fs::write(&path, "[driver]\ncommand = \"driverd\"\n")?;

    let cfg = load_if_present(&path)?;
    assert_eq!(cfg.driver().command, "driverd");
    Ok(())
}

#[test]
fn load_if_present_falls_back_to_builtin_defaults() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;

    let cfg = load_if_present(dir.path().join("Driverwatch.toml"))?;
    assert_eq!(cfg.driver().command, WINAPPDRIVER_BIN);
    assert_eq!(cfg.start_timeout(), Duration::from_secs(30));
    Ok(())
}

#[test]
fn load_if_present_surfaces_errors_in_an_existing_file() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("Driverwatch.toml");
    fs::write(&path, "[driver]\nstart_timeout = \"soon\"\n")?;

    let err = load_if_present(&path).expect_err("a broken file must not be skipped");
    assert!(matches!(err, DriverwatchError::ConfigError(_)), "got {err:?}");
    Ok(())
}

#[test]
fn missing_config_file_is_an_io_error() {
    init_tracing();
    let err = load_and_validate("/definitely/not/here.toml").expect_err("missing file");
    assert!(matches!(err, DriverwatchError::IoError(_)), "got {err:?}");
}

#[test]
fn duration_strings_parse() {
    init_tracing();
    assert_eq!(parse_duration("250ms"), Ok(Duration::from_millis(250)));
    assert_eq!(parse_duration("3s"), Ok(Duration::from_secs(3)));
    assert_eq!(parse_duration("2m"), Ok(Duration::from_secs(120)));
    assert_eq!(parse_duration("1h"), Ok(Duration::from_secs(3600)));
    assert!(parse_duration("").is_err());
    assert!(parse_duration("10").is_err());
    assert!(parse_duration("10d").is_err());
}
