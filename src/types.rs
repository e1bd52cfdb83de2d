// src/types.rs

use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

/// How the driver's standard input is wired at spawn time.
///
/// - `Ignore`: stdin is attached to the null device (default).
/// - `Pipe`: stdin is opened as a pipe and held inert until the supervisor
///   is stopped. Some driver builds print their startup banner differently
///   depending on whether stdin is a terminal, a pipe, or closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StdinMode {
    Ignore,
    Pipe,
}

impl Default for StdinMode {
    fn default() -> Self {
        StdinMode::Ignore
    }
}

impl FromStr for StdinMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ignore" => Ok(StdinMode::Ignore),
            "pipe" => Ok(StdinMode::Pipe),
            other => Err(format!(
                "invalid stdin mode: {other} (expected \"ignore\" or \"pipe\")"
            )),
        }
    }
}

/// Text encoding of the driver's output streams.
///
/// `Auto` sniffs the first chunk (UTF-16LE BOM, or a NUL byte directly
/// after a leading ASCII byte) and falls back to UTF-8.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputEncoding {
    Auto,
    Utf8,
    Utf16Le,
}

impl Default for OutputEncoding {
    fn default() -> Self {
        OutputEncoding::Auto
    }
}

impl FromStr for OutputEncoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Ok(OutputEncoding::Auto),
            "utf8" | "utf-8" => Ok(OutputEncoding::Utf8),
            "utf16le" | "utf-16le" => Ok(OutputEncoding::Utf16Le),
            other => Err(format!(
                "invalid encoding: {other} (expected \"auto\", \"utf8\" or \"utf16le\")"
            )),
        }
    }
}

/// Parse a simple duration string like `"3s"`, `"250ms"`, `"1m"`, `"2h"`.
///
/// Used for `start_timeout` in the config file.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    // Find the boundary between digits and suffix.
    let idx = s
        .chars()
        .position(|c| !c.is_ascii_digit())
        .ok_or_else(|| "duration missing unit suffix".to_string())?;

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{}': {}", num_part, e))?;
    let unit = unit_part.trim().to_lowercase();

    match unit.as_str() {
        "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        "m" => Ok(Duration::from_secs(value * 60)),
        "h" => Ok(Duration::from_secs(value * 60 * 60)),
        _ => Err(format!(
            "unsupported duration unit '{}'; expected ms, s, m, or h",
            unit
        )),
    }
}
