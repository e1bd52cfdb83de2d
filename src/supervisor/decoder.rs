// src/supervisor/decoder.rs

//! Incremental text decoding for the driver's output pipes.
//!
//! Depending on the build, the wrapped driver may emit UTF-16LE instead of
//! UTF-8. `OutputEncoding::Auto` sniffs the first chunk: a UTF-16LE BOM, or
//! a NUL byte directly after a leading ASCII byte, selects UTF-16LE;
//! anything else falls back to UTF-8.

use crate::types::OutputEncoding;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Undetected,
    Utf8,
    Utf16Le,
}

/// Stateful chunk decoder.
///
/// Bytes split across read boundaries (a partial UTF-8 multi-byte sequence,
/// half a UTF-16 code unit, or a lone high surrogate) are carried over to
/// the next call. Invalid sequences decode lossily to the replacement
/// character.
#[derive(Debug)]
pub struct StreamDecoder {
    mode: Mode,
    pending: Vec<u8>,
}

impl StreamDecoder {
    pub fn new(encoding: OutputEncoding) -> Self {
        let mode = match encoding {
            OutputEncoding::Auto => Mode::Undetected,
            OutputEncoding::Utf8 => Mode::Utf8,
            OutputEncoding::Utf16Le => Mode::Utf16Le,
        };
        Self {
            mode,
            pending: Vec::new(),
        }
    }

    /// Decode the next chunk of raw bytes into text.
    ///
    /// May return an empty string while auto-detection is still waiting for
    /// enough bytes, or when the chunk ends mid-sequence.
    pub fn decode(&mut self, chunk: &[u8]) -> String {
        self.pending.extend_from_slice(chunk);

        if self.mode == Mode::Undetected {
            if self.pending.len() < 2 {
                return String::new();
            }
            self.mode = sniff(&self.pending);
            if self.mode == Mode::Utf16Le && self.pending.starts_with(&[0xFF, 0xFE]) {
                self.pending.drain(..2);
            }
        }

        match self.mode {
            Mode::Utf8 => self.decode_utf8(),
            Mode::Utf16Le => self.decode_utf16le(),
            Mode::Undetected => String::new(),
        }
    }

    /// Drain whatever is still buffered, lossily.
    ///
    /// At end of stream a carried partial sequence can never complete: a
    /// single unsniffed byte is emitted as UTF-8, and a truncated UTF-8
    /// sequence, dangling UTF-16 byte or lone surrogate becomes the
    /// replacement character.
    pub fn finish(&mut self) -> String {
        let pending = std::mem::take(&mut self.pending);
        if pending.is_empty() {
            return String::new();
        }
        match self.mode {
            Mode::Undetected | Mode::Utf8 => String::from_utf8_lossy(&pending).into_owned(),
            Mode::Utf16Le => {
                let units = pending
                    .chunks_exact(2)
                    .map(|pair| u16::from_le_bytes([pair[0], pair[1]]));
                let mut out: String = char::decode_utf16(units)
                    .map(|r| r.unwrap_or(char::REPLACEMENT_CHARACTER))
                    .collect();
                if pending.len() % 2 == 1 {
                    out.push(char::REPLACEMENT_CHARACTER);
                }
                out
            }
        }
    }

    fn decode_utf8(&mut self) -> String {
        let keep = trailing_incomplete_utf8(&self.pending);
        let cut = self.pending.len() - keep;
        let ready: Vec<u8> = self.pending.drain(..cut).collect();
        String::from_utf8_lossy(&ready).into_owned()
    }

    fn decode_utf16le(&mut self) -> String {
        let mut usable = self.pending.len() & !1;
        if usable >= 2 {
            // A trailing high surrogate waits for its pair in the next chunk.
            let last = u16::from_le_bytes([self.pending[usable - 2], self.pending[usable - 1]]);
            if (0xD800..0xDC00).contains(&last) {
                usable -= 2;
            }
        }

        let units: Vec<u16> = self.pending[..usable]
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        self.pending.drain(..usable);

        char::decode_utf16(units)
            .map(|r| r.unwrap_or(char::REPLACEMENT_CHARACTER))
            .collect()
    }
}

fn sniff(bytes: &[u8]) -> Mode {
    if bytes.starts_with(&[0xFF, 0xFE]) {
        return Mode::Utf16Le;
    }
    if bytes.len() >= 2 && bytes[0] != 0 && bytes[0].is_ascii() && bytes[1] == 0 {
        return Mode::Utf16Le;
    }
    Mode::Utf8
}

/// Number of trailing bytes forming an incomplete UTF-8 sequence.
fn trailing_incomplete_utf8(bytes: &[u8]) -> usize {
    let len = bytes.len();
    let start = len.saturating_sub(3);
    for i in (start..len).rev() {
        let b = bytes[i];
        let needed = if b >= 0xF0 {
            4
        } else if b >= 0xE0 {
            3
        } else if b >= 0xC0 {
            2
        } else if b < 0x80 {
            1
        } else {
            // Continuation byte; keep scanning back for the lead byte.
            continue;
        };
        if i + needed > len {
            return len - i;
        }
        return 0;
    }
    0
}
