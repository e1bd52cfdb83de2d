// src/supervisor/monitor.rs

//! Stream reader tasks for the supervised driver process.
//!
//! One background task per pipe. Each task reads raw chunks, fans the bytes
//! out to the log mirror, decodes them, and reports readiness / failure
//! marker matches back to the supervisor waiting in `start()`.
//!
//! The tasks outlive `start()` on purpose: after the supervisor resolves,
//! they keep draining the pipes (so the OS buffers never fill) and keep
//! feeding the mirror. Marker events sent after resolution land in a closed
//! channel and are dropped.

use regex::Regex;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::supervisor::decoder::StreamDecoder;
use crate::types::OutputEncoding;

/// Which pipe a monitor is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Stdout,
    Stderr,
}

impl std::fmt::Display for StreamKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StreamKind::Stdout => write!(f, "stdout"),
            StreamKind::Stderr => write!(f, "stderr"),
        }
    }
}

/// Marker observations reported to the supervisor while `start()` is
/// pending.
#[derive(Debug, Clone)]
pub enum MonitorEvent {
    ReadyMatched {
        stream: StreamKind,
    },
    FailureMatched {
        stream: StreamKind,
        message: String,
    },
}

/// Decoded characters kept between reads so a marker split across two
/// chunks still matches.
const MATCH_TAIL_BYTES: usize = 256;

/// Read buffer size for each pipe.
const READ_BUF_SIZE: usize = 4096;

pub(crate) fn spawn_stream_monitor<R>(
    kind: StreamKind,
    mut stream: R,
    encoding: OutputEncoding,
    ready: Regex,
    failure: Regex,
    event_tx: mpsc::Sender<MonitorEvent>,
    chunk_tx: mpsc::UnboundedSender<Vec<u8>>,
) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut decoder = StreamDecoder::new(encoding);
        let mut window = String::new();
        let mut buf = vec![0u8; READ_BUF_SIZE];

        loop {
            let (n, text) = match stream.read(&mut buf).await {
                // EOF: flush whatever the decoder still buffers so a final
                // unterminated line is still seen.
                Ok(0) => (0, decoder.finish()),
                Ok(n) => {
                    // Fan the raw bytes out to the log mirror before any
                    // decoding; the mirror preserves the driver's native
                    // encoding.
                    let _ = chunk_tx.send(buf[..n].to_vec());
                    (n, decoder.decode(&buf[..n]))
                }
                Err(e) => {
                    warn!(stream = %kind, error = %e, "error reading driver output");
                    break;
                }
            };

            if !text.is_empty() {
                match kind {
                    StreamKind::Stdout => {
                        debug!(stream = %kind, "driver output: {}", text.trim_end())
                    }
                    StreamKind::Stderr => {
                        warn!(stream = %kind, "driver stderr: {}", text.trim_end())
                    }
                }

                window.push_str(&text);
                // Two banner lines can coalesce into one read; the earlier
                // match in the window is the one that arrived first.
                // Readiness wins ties.
                let ready_at = ready.find(&window).map(|m| m.start());
                match (ready_at, failure.find(&window)) {
                    (Some(r), Some(f)) if f.start() < r => {
                        let message = line_around(&window, &f).trim().to_string();
                        let _ = event_tx
                            .send(MonitorEvent::FailureMatched { stream: kind, message })
                            .await;
                    }
                    (Some(_), _) => {
                        let _ =
                            event_tx.send(MonitorEvent::ReadyMatched { stream: kind }).await;
                    }
                    (None, Some(f)) => {
                        let message = line_around(&window, &f).trim().to_string();
                        let _ = event_tx
                            .send(MonitorEvent::FailureMatched { stream: kind, message })
                            .await;
                    }
                    (None, None) => {}
                }
                truncate_window(&mut window, MATCH_TAIL_BYTES);
            }

            if n == 0 {
                break;
            }
        }

        debug!(stream = %kind, "monitor ended");
    })
}

/// The full line of the match window containing a marker hit.
///
/// The window can carry the tail of a previous read, so the line may span
/// several chunks; this recovers the whole banner even when the marker
/// itself arrived split.
fn line_around<'w>(window: &'w str, m: &regex::Match<'_>) -> &'w str {
    let start = window[..m.start()].rfind('\n').map_or(0, |i| i + 1);
    let end = window[m.end()..]
        .find('\n')
        .map_or(window.len(), |i| m.end() + i);
    &window[start..end]
}

/// Keep only the last `keep` bytes of the match window, on a char boundary.
fn truncate_window(window: &mut String, keep: usize) {
    if window.len() <= keep {
        return;
    }
    let mut cut = window.len() - keep;
    while !window.is_char_boundary(cut) {
        cut += 1;
    }
    *window = window.split_off(cut);
}
