// tests/log_mirror.rs
#![cfg(unix)]

mod common;
use crate::common::{eventually, init_tracing};

use std::error::Error;
use std::fs;

use driverwatch::supervisor::{ProcessSupervisor, SupervisorState};
use driverwatch_test_utils::fake_driver;

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test]
async fn attach_creates_missing_directory_and_empty_file() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let log_file = dir.path().join("x").join("y.log");

    let mut sup = ProcessSupervisor::new(fake_driver::ready_driver(dir.path()));
    sup.attach_log_file(&log_file)?;

    assert!(log_file.parent().is_some_and(|p| p.is_dir()));
    assert!(log_file.is_file());
    assert_eq!(fs::read(&log_file)?.len(), 0, "no output has arrived yet");
    Ok(())
}

#[tokio::test]
async fn attach_truncates_existing_content() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let log_file = dir.path().join("driver.log");
    fs::write(&log_file, "stale content from a previous run")?;

    let mut sup = ProcessSupervisor::new(fake_driver::ready_driver(dir.path()));
    sup.attach_log_file(&log_file)?;

    assert_eq!(fs::read(&log_file)?.len(), 0);
    Ok(())
}

/// Attaching before `start()` is deferred and activated at spawn; output
/// from the very first chunk onward lands in the file.
#[tokio::test]
async fn deferred_attach_mirrors_output_from_start() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let log_file = dir.path().join("logs").join("driver.log");

    let script = fake_driver::write_script(
        dir.path(),
        "chatty-driver.sh",
        &format!(
            "echo '{}'\necho out-line\necho err-line >&2\nsleep 30",
            fake_driver::READY_LINE
        ),
    );
    let mut sup = ProcessSupervisor::new(fake_driver::options_for(script));
    sup.attach_log_file(&log_file)?;

    sup.start().await?;

    assert!(
        eventually(|| {
            let contents = fs::read_to_string(&log_file).unwrap_or_default();
            contents.contains("out-line") && contents.contains("err-line")
        })
        .await,
        "stdout and stderr must both be mirrored"
    );

    sup.stop();
    Ok(())
}

#[tokio::test]
async fn attach_after_ready_mirrors_subsequent_output() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let log_file = dir.path().join("driver.log");

    let script = fake_driver::write_script(
        dir.path(),
        "late-driver.sh",
        &format!(
            "echo '{}'\nsleep 0.3\necho later-line\nsleep 30",
            fake_driver::READY_LINE
        ),
    );
    let mut sup = ProcessSupervisor::new(fake_driver::options_for(script));

    sup.start().await?;
    sup.attach_log_file(&log_file)?;

    assert!(
        eventually(|| {
            fs::read_to_string(&log_file)
                .unwrap_or_default()
                .contains("later-line")
        })
        .await,
        "output arriving after attachment must be mirrored"
    );

    sup.stop();
    Ok(())
}

/// Attaching when the driver is already gone still produces the (empty)
/// file, so callers can attach unconditionally.
#[tokio::test]
async fn attach_after_exit_still_creates_file() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let log_file = dir.path().join("driver.log");

    let mut sup = ProcessSupervisor::new(fake_driver::exiting_driver(dir.path(), 0));
    let _ = sup.start().await.expect_err("driver exits before readiness");
    assert_eq!(sup.state(), SupervisorState::Failed);

    sup.attach_log_file(&log_file)?;
    assert!(log_file.is_file());
    Ok(())
}

/// The mirror writes raw bytes, so a UTF-16LE driver log stays UTF-16LE.
#[tokio::test]
async fn mirror_preserves_native_encoding() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let log_file = dir.path().join("driver.log");

    let mut sup = ProcessSupervisor::new(fake_driver::utf16_ready_driver(dir.path()));
    sup.attach_log_file(&log_file)?;
    sup.start().await?;

    assert!(
        eventually(|| {
            fs::read(&log_file)
                .map(|bytes| bytes.starts_with(&[0xFF, 0xFE]))
                .unwrap_or(false)
        })
        .await,
        "the BOM must be mirrored verbatim"
    );

    sup.stop();
    Ok(())
}
