// src/supervisor/mod.rs

//! External driver process lifecycle supervisor.
//!
//! A [`ProcessSupervisor`] owns exactly one child process: it spawns the
//! driver, watches the output pipes for a readiness or failure marker,
//! mirrors the output into a log file, and kills the process on shutdown.
//!
//! - [`monitor`] reads the stdout/stderr pipes, decodes them and reports
//!   marker matches.
//! - [`decoder`] handles UTF-8 / UTF-16LE / auto-detected text decoding.
//! - [`mirror`] duplicates the raw output bytes into the attached log file.
//!
//! State machine:
//!
//! ```text
//! Idle --start()--> Starting --ready marker--> Running --stop()--> Stopped
//!                   Starting --failure marker OR exit--> Failed
//!                   Running  --process exits on its own--> Failed
//! ```
//!
//! `Failed` and `Stopped` are terminal; construct a new supervisor to
//! retry.

pub mod decoder;
pub mod mirror;
pub mod monitor;

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use regex::Regex;
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::{mpsc, watch};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::errors::StartError;
use crate::types::{OutputEncoding, StdinMode};

use self::monitor::{MonitorEvent, StreamKind};

/// Marker the driver prints once it is accepting connections.
pub const DEFAULT_READY_MARKER: &str = "Windows Application Driver listening for requests";

/// Marker the driver prints when it cannot initialise.
pub const DEFAULT_FAILURE_MARKER: &str = "Failed to initialize";

/// Default deadline for `start()`.
pub const DEFAULT_START_TIMEOUT: Duration = Duration::from_secs(30);

/// Options controlling how the driver process is spawned and observed.
#[derive(Debug, Clone)]
pub struct SupervisorOptions {
    /// Path or name of the driver binary.
    pub command: PathBuf,

    /// Arguments passed verbatim to the binary (direct process creation,
    /// no shell interpretation).
    pub args: Vec<String>,

    /// Regex matched against decoded output to detect readiness.
    pub ready_marker: String,

    /// Regex matched against decoded output to detect a failed
    /// initialization.
    pub failure_marker: String,

    /// How the driver's stdin is wired.
    pub stdin: StdinMode,

    /// Text encoding of the driver's output.
    pub encoding: OutputEncoding,

    /// Give up on `start()` after this long.
    pub start_timeout: Duration,
}

impl Default for SupervisorOptions {
    fn default() -> Self {
        Self {
            command: PathBuf::from(crate::service::WINAPPDRIVER_BIN),
            args: Vec::new(),
            ready_marker: DEFAULT_READY_MARKER.to_string(),
            failure_marker: DEFAULT_FAILURE_MARKER.to_string(),
            stdin: StdinMode::default(),
            encoding: OutputEncoding::default(),
            start_timeout: DEFAULT_START_TIMEOUT,
        }
    }
}

/// Lifecycle state of a [`ProcessSupervisor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    Idle,
    Starting,
    Running,
    Stopped,
    Failed,
}

/// Supervises one external driver process.
///
/// The child handle is held iff the state is `Running`; on every failure
/// path the handle is dropped, which kills a still-live process
/// (`kill_on_drop`).
pub struct ProcessSupervisor {
    options: SupervisorOptions,
    state: SupervisorState,
    child: Option<Child>,
    // Held open for StdinMode::Pipe so the driver never sees EOF on stdin.
    stdin: Option<ChildStdin>,
    attach_tx: Option<watch::Sender<Option<PathBuf>>>,
    pending_log_path: Option<PathBuf>,
}

enum StartResolution {
    Ready { stream: StreamKind },
    Failure { message: String },
    Exited { code: i32 },
}

impl ProcessSupervisor {
    pub fn new(options: SupervisorOptions) -> Self {
        Self {
            options,
            state: SupervisorState::Idle,
            child: None,
            stdin: None,
            attach_tx: None,
            pending_log_path: None,
        }
    }

    pub fn options(&self) -> &SupervisorOptions {
        &self.options
    }

    /// Current state, refreshed against the child process.
    ///
    /// A `Running` driver that exited on its own moves to `Failed` here and
    /// the handle is cleared.
    pub fn state(&mut self) -> SupervisorState {
        if self.state == SupervisorState::Running {
            if let Some(child) = self.child.as_mut() {
                match child.try_wait() {
                    Ok(Some(status)) => {
                        warn!(
                            exit_code = status.code().unwrap_or(-1),
                            "driver process exited on its own"
                        );
                        self.child = None;
                        self.stdin = None;
                        self.state = SupervisorState::Failed;
                    }
                    Ok(None) => {}
                    Err(e) => warn!(error = %e, "could not poll driver process status"),
                }
            }
        }
        self.state
    }

    /// OS process id of the running driver, if any.
    pub fn pid(&self) -> Option<u32> {
        self.child.as_ref().and_then(|c| c.id())
    }

    /// Spawn the driver and wait until it is ready.
    ///
    /// Resolves with the first of four triggers:
    /// - the ready marker appears in the output → `Ok(())`, state `Running`;
    /// - the failure marker appears → `InitializationFailed` with the
    ///   observed message;
    /// - the process exits → `ExitedBeforeReady` with its exit code;
    /// - `start_timeout` elapses → `Timeout`.
    ///
    /// Later output or exit events no longer affect the outcome, but the
    /// pipes keep flowing into the log mirror for as long as the process
    /// lives.
    pub async fn start(&mut self) -> Result<(), StartError> {
        if self.state != SupervisorState::Idle {
            return Err(StartError::AlreadyStarted);
        }

        let ready = Regex::new(&self.options.ready_marker).map_err(|source| {
            StartError::InvalidMarker {
                which: "ready",
                source,
            }
        })?;
        let failure = Regex::new(&self.options.failure_marker).map_err(|source| {
            StartError::InvalidMarker {
                which: "failure",
                source,
            }
        })?;

        self.state = SupervisorState::Starting;
        info!(
            command = %self.options.command.display(),
            args = ?self.options.args,
            "spawning driver process"
        );

        let mut cmd = Command::new(&self.options.command);
        cmd.args(&self.options.args)
            .stdin(match self.options.stdin {
                StdinMode::Ignore => Stdio::null(),
                StdinMode::Pipe => Stdio::piped(),
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                self.state = SupervisorState::Failed;
                return Err(StartError::Spawn(e));
            }
        };

        self.stdin = child.stdin.take();
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let (event_tx, mut event_rx) = mpsc::channel::<MonitorEvent>(64);
        let (chunk_tx, chunk_rx) = mpsc::unbounded_channel::<Vec<u8>>();
        let (attach_tx, attach_rx) = watch::channel(self.pending_log_path.take());

        mirror::spawn_mirror(chunk_rx, attach_rx);

        if let Some(stdout) = stdout {
            monitor::spawn_stream_monitor(
                StreamKind::Stdout,
                stdout,
                self.options.encoding,
                ready.clone(),
                failure.clone(),
                event_tx.clone(),
                chunk_tx.clone(),
            );
        }
        if let Some(stderr) = stderr {
            monitor::spawn_stream_monitor(
                StreamKind::Stderr,
                stderr,
                self.options.encoding,
                ready,
                failure,
                event_tx,
                chunk_tx,
            );
        }

        self.attach_tx = Some(attach_tx);

        let resolution = match timeout(
            self.options.start_timeout,
            resolve_start(&mut child, &mut event_rx),
        )
        .await
        {
            Ok(res) => match res {
                Ok(resolution) => resolution,
                Err(e) => {
                    self.state = SupervisorState::Failed;
                    self.stdin = None;
                    return Err(e);
                }
            },
            Err(_) => {
                // Dropping the child kills it; nothing is left dangling.
                self.state = SupervisorState::Failed;
                self.stdin = None;
                return Err(StartError::Timeout(self.options.start_timeout));
            }
        };

        match resolution {
            StartResolution::Ready { stream } => {
                info!(pid = child.id(), via = %stream, "driver is ready");
                self.child = Some(child);
                self.state = SupervisorState::Running;
                Ok(())
            }
            StartResolution::Failure { message } => {
                self.state = SupervisorState::Failed;
                self.stdin = None;
                Err(StartError::InitializationFailed(message))
            }
            StartResolution::Exited { code } => {
                self.state = SupervisorState::Failed;
                self.stdin = None;
                Err(StartError::ExitedBeforeReady(code))
            }
        }
    }

    /// Wait for the running driver process to exit on its own.
    ///
    /// Returns the exit code once the process terminates; `None`
    /// immediately if no process is running. The handle is cleared and the
    /// state moves to `Failed`, since a driver dying mid-session is never
    /// an orderly shutdown.
    pub async fn wait_exited(&mut self) -> Option<i32> {
        let child = self.child.as_mut()?;
        match child.wait().await {
            Ok(status) => {
                let code = status.code().unwrap_or(-1);
                warn!(exit_code = code, "driver process exited on its own");
                self.child = None;
                self.stdin = None;
                self.state = SupervisorState::Failed;
                Some(code)
            }
            Err(e) => {
                warn!(error = %e, "error waiting on driver process");
                None
            }
        }
    }

    /// Begin mirroring the driver's combined stdout/stderr to `path`.
    ///
    /// The containing directory and the file are created immediately (the
    /// file truncated), so the file exists and is empty even before any
    /// output arrives or when the driver is already gone. Called before
    /// `start()`, the attachment is deferred and activated at spawn.
    pub fn attach_log_file(&mut self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let path = path.as_ref().to_path_buf();
        mirror::prepare_log_file(&path)?;

        match &self.attach_tx {
            Some(tx) => {
                if tx.send(Some(path.clone())).is_err() {
                    debug!(
                        path = %path.display(),
                        "log mirror already shut down; log file left as created"
                    );
                }
            }
            None => {
                self.pending_log_path = Some(path.clone());
            }
        }

        info!(path = %path.display(), "driver log file attached");
        Ok(())
    }

    /// Terminate the driver process, if one is running.
    ///
    /// Idempotent, fire-and-forget: the kill signal is sent without
    /// waiting for the process to fully exit, and calling this in any
    /// state is safe.
    pub fn stop(&mut self) {
        self.stdin = None;
        if let Some(mut child) = self.child.take() {
            let pid = child.id();
            match child.start_kill() {
                Ok(()) => debug!(pid, "driver process killed"),
                Err(e) => warn!(pid, error = %e, "failed to kill driver process"),
            }
        }
        if self.state != SupervisorState::Failed {
            self.state = SupervisorState::Stopped;
        }
    }
}

/// Wait for the first of: marker event, pipe EOF, process exit.
async fn resolve_start(
    child: &mut Child,
    event_rx: &mut mpsc::Receiver<MonitorEvent>,
) -> Result<StartResolution, StartError> {
    loop {
        tokio::select! {
            biased;

            ev = event_rx.recv() => match ev {
                Some(MonitorEvent::ReadyMatched { stream }) => {
                    return Ok(StartResolution::Ready { stream });
                }
                Some(MonitorEvent::FailureMatched { message, .. }) => {
                    return Ok(StartResolution::Failure { message });
                }
                None => {
                    // Both pipes hit EOF without a marker: the process is
                    // exiting or already gone. Collect the real exit code.
                    let status = child.wait().await?;
                    return Ok(StartResolution::Exited {
                        code: status.code().unwrap_or(-1),
                    });
                }
            },

            status = child.wait() => {
                let status = status?;
                // A marker may have been written just before the exit and
                // still be in flight; the monitors drop their senders at
                // EOF, so this drain always terminates.
                while let Some(ev) = event_rx.recv().await {
                    match ev {
                        MonitorEvent::ReadyMatched { stream } => {
                            return Ok(StartResolution::Ready { stream });
                        }
                        MonitorEvent::FailureMatched { message, .. } => {
                            return Ok(StartResolution::Failure { message });
                        }
                    }
                }
                return Ok(StartResolution::Exited {
                    code: status.code().unwrap_or(-1),
                });
            }
        }
    }
}
