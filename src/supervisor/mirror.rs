// src/supervisor/mirror.rs

//! Log mirroring: duplicate raw driver output bytes into a log file.
//!
//! The reader tasks in [`monitor`](super::monitor) fan every chunk they
//! read out to an unbounded channel; a single mirror task owns the log file
//! handle and writes chunks in arrival order. The unbounded queue keeps a
//! slow disk from ever back-pressuring the reader tasks, so mirroring can
//! never slow the driver's own stdio consumption.
//!
//! The attach path is a `watch` channel: the supervisor publishes the
//! current log file path (or `None`), and the mirror re-opens (truncating)
//! whenever it changes. Chunks that arrive while no file is attached are
//! dropped; mirroring starts at the point of attachment.

use std::path::{Path, PathBuf};

use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Create the log file's parent directory and truncate-create the file.
///
/// Called synchronously from `attach_log_file` so the file exists (and is
/// empty) even if the mirror never receives a byte, including when the
/// driver already exited.
pub(crate) fn prepare_log_file(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::File::create(path)?;
    Ok(())
}

pub(crate) fn spawn_mirror(
    mut chunk_rx: mpsc::UnboundedReceiver<Vec<u8>>,
    mut attach_rx: watch::Receiver<Option<PathBuf>>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let initial = attach_rx.borrow_and_update().clone();
        let mut sink = open_sink(initial).await;

        loop {
            tokio::select! {
                changed = attach_rx.changed() => {
                    if changed.is_err() {
                        // Supervisor gone; keep writing to the current sink
                        // until the pipes close.
                        drain_remaining(chunk_rx, sink).await;
                        return;
                    }
                    let path = attach_rx.borrow_and_update().clone();
                    sink = open_sink(path).await;
                }
                chunk = chunk_rx.recv() => match chunk {
                    Some(bytes) => write_chunk(&mut sink, &bytes).await,
                    None => break,
                },
            }
        }

        if let Some(file) = sink.as_mut() {
            let _ = file.flush().await;
        }
        debug!("log mirror ended");
    })
}

async fn open_sink(path: Option<PathBuf>) -> Option<File> {
    let path = path?;
    match File::create(&path).await {
        Ok(file) => {
            debug!(path = %path.display(), "mirroring driver output");
            Some(file)
        }
        Err(e) => {
            warn!(
                path = %path.display(),
                error = %e,
                "could not open log file; driver output will not be mirrored"
            );
            None
        }
    }
}

async fn write_chunk(sink: &mut Option<File>, bytes: &[u8]) {
    if let Some(file) = sink {
        let res = async {
            file.write_all(bytes).await?;
            file.flush().await
        }
        .await;
        if let Err(e) = res {
            warn!(error = %e, "log mirror write failed; disabling mirror");
            *sink = None;
        }
    }
}

async fn drain_remaining(mut chunk_rx: mpsc::UnboundedReceiver<Vec<u8>>, mut sink: Option<File>) {
    while let Some(bytes) = chunk_rx.recv().await {
        write_chunk(&mut sink, &bytes).await;
    }
    if let Some(file) = sink.as_mut() {
        let _ = file.flush().await;
    }
    debug!("log mirror ended");
}
