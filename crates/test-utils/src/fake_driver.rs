//! Builders for fake driver executables used in integration tests.
//!
//! Each builder writes a small `/bin/sh` script into a scratch directory
//! and returns [`SupervisorOptions`] pointing at it, so tests can exercise
//! the real spawn / monitor / mirror path without the actual driver binary.
//! Unix only.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use driverwatch::supervisor::SupervisorOptions;
use driverwatch::types::{OutputEncoding, StdinMode};

/// Readiness banner the fake drivers print.
pub const READY_LINE: &str = "fake driver listening for requests";

/// Failure banner the fake drivers print.
pub const FAILURE_LINE: &str = "Failed to initialize fake driver";

/// Write an executable shell script under `dir` and return its path.
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    let script = format!("#!/bin/sh\n{body}\n");
    fs::write(&path, script).expect("write fake driver script");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
            .expect("chmod fake driver script");
    }
    path
}

/// Options pointing at `script`, with the fake markers and a short start
/// timeout so a broken test fails fast.
pub fn options_for(script: PathBuf) -> SupervisorOptions {
    SupervisorOptions {
        command: script,
        args: Vec::new(),
        ready_marker: READY_LINE.to_string(),
        failure_marker: FAILURE_LINE.to_string(),
        stdin: StdinMode::Ignore,
        encoding: OutputEncoding::Auto,
        start_timeout: Duration::from_secs(5),
    }
}

/// A driver that prints the ready line and then sleeps until killed.
pub fn ready_driver(dir: &Path) -> SupervisorOptions {
    let script = write_script(
        dir,
        "ready-driver.sh",
        &format!("echo '{READY_LINE}'\nsleep 30"),
    );
    options_for(script)
}

/// A driver that reports an initialization failure and keeps running.
pub fn failing_driver(dir: &Path) -> SupervisorOptions {
    let script = write_script(
        dir,
        "failing-driver.sh",
        &format!("echo '{FAILURE_LINE}'\nsleep 30"),
    );
    options_for(script)
}

/// A driver that exits immediately with `code`, printing nothing.
pub fn exiting_driver(dir: &Path, code: i32) -> SupervisorOptions {
    let script = write_script(dir, "exiting-driver.sh", &format!("exit {code}"));
    options_for(script)
}

/// A driver that prints nothing and sleeps, for timeout tests.
pub fn silent_driver(dir: &Path) -> SupervisorOptions {
    let script = write_script(dir, "silent-driver.sh", "sleep 30");
    options_for(script)
}

/// A driver that prints the ready line and then exits with `code`.
pub fn ready_then_exit_driver(dir: &Path, code: i32) -> SupervisorOptions {
    let script = write_script(
        dir,
        "ready-then-exit-driver.sh",
        &format!("echo '{READY_LINE}'\nexit {code}"),
    );
    options_for(script)
}

/// A driver that emits its ready banner as UTF-16LE with a BOM, then
/// sleeps until killed.
pub fn utf16_ready_driver(dir: &Path) -> SupervisorOptions {
    let mut escapes = String::from("\\377\\376"); // FF FE BOM
    for byte in format!("{READY_LINE}\n").bytes() {
        escapes.push_str(&format!("\\{byte:03o}\\000"));
    }
    let script = write_script(
        dir,
        "utf16-ready-driver.sh",
        &format!("printf '{escapes}'\nsleep 30"),
    );
    options_for(script)
}

/// A driver whose ready banner is written in two chunks with a pause in
/// between, so the marker never arrives in a single read.
pub fn split_banner_driver(dir: &Path) -> SupervisorOptions {
    let (head, tail) = READY_LINE.split_at(READY_LINE.len() / 2);
    let script = write_script(
        dir,
        "split-banner-driver.sh",
        &format!("printf '{head}'\nsleep 0.2\nprintf '{tail}\\n'\nsleep 30"),
    );
    options_for(script)
}
