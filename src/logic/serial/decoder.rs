//! Frame Decoder
//!
//! Turns an unbounded byte stream into trimmed `\n`-delimited lines.
//! A partial line is carried across chunk boundaries in a single buffer.
//!
//! Splitting happens on raw bytes: `\n` is never part of a multi-byte UTF-8
//! sequence, so a character split across two chunks is reassembled before
//! the line is decoded.

use crate::constants::DEFAULT_MAX_LINE_BYTES;

/// Line delimiter
const DELIMITER: u8 = b'\n';

/// Stateful line framer
#[derive(Debug)]
pub struct FrameDecoder {
    /// Bytes after the last delimiter seen so far
    pending: Vec<u8>,

    /// Upper bound for `pending`
    max_line_bytes: usize,

    /// True while skipping the rest of an oversized line
    discarding: bool,

    /// Total lines emitted
    lines_emitted: u64,

    /// Total bytes dropped (oversized or unterminated fragments)
    bytes_dropped: u64,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LINE_BYTES)
    }
}

impl FrameDecoder {
    pub fn new(max_line_bytes: usize) -> Self {
        Self {
            pending: Vec::new(),
            max_line_bytes: max_line_bytes.max(1),
            discarding: false,
            lines_emitted: 0,
            bytes_dropped: 0,
        }
    }

    /// Append a chunk and lazily drain every complete line in the buffer.
    ///
    /// Lines not pulled from the returned iterator stay buffered and come out
    /// on the next call.
    pub fn push(&mut self, chunk: &[u8]) -> Lines<'_> {
        let chunk = self.skip_discarded(chunk);
        self.pending.extend_from_slice(chunk);
        self.enforce_limit();
        Lines { decoder: self }
    }

    /// Pop the next complete line, if any.
    pub fn next_line(&mut self) -> Option<String> {
        let newline = self.pending.iter().position(|&b| b == DELIMITER)?;
        let rest = self.pending.split_off(newline + 1);
        let mut raw = std::mem::replace(&mut self.pending, rest);
        raw.pop();

        self.lines_emitted += 1;
        Some(String::from_utf8_lossy(&raw).trim().to_string())
    }

    /// End decoding.
    ///
    /// The unterminated fragment is never emitted as a line; it is handed
    /// back so the caller can report how much was dropped.
    pub fn finish(&mut self) -> Option<Vec<u8>> {
        self.discarding = false;
        if self.pending.is_empty() {
            return None;
        }
        let fragment = std::mem::take(&mut self.pending);
        self.bytes_dropped += fragment.len() as u64;
        Some(fragment)
    }

    /// Drop the complete lines still buffered, keeping the trailing fragment.
    ///
    /// Returns how many lines were dropped.
    pub fn discard_complete_lines(&mut self) -> usize {
        let Some(last) = self.pending.iter().rposition(|&b| b == DELIMITER) else {
            return 0;
        };
        let count = self.pending[..=last].iter().filter(|&&b| b == DELIMITER).count();
        self.bytes_dropped += last as u64 + 1;
        self.pending.drain(..=last);
        count
    }

    /// Drop any buffered fragment (disconnect).
    pub fn clear(&mut self) {
        self.pending.clear();
        self.discarding = false;
    }

    /// Bytes currently buffered without a delimiter
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn lines_emitted(&self) -> u64 {
        self.lines_emitted
    }

    pub fn bytes_dropped(&self) -> u64 {
        self.bytes_dropped
    }

    fn enforce_limit(&mut self) {
        let unterminated = match self.pending.iter().rposition(|&b| b == DELIMITER) {
            Some(last) => self.pending.len() - last - 1,
            None => self.pending.len(),
        };
        if unterminated <= self.max_line_bytes {
            return;
        }

        // Keep complete lines, drop the runaway tail
        let cut = self.pending.len() - unterminated;
        log::warn!(
            "[Serial] Partial line exceeded {} bytes, discarding {} bytes until next newline",
            self.max_line_bytes,
            unterminated
        );
        self.bytes_dropped += unterminated as u64;
        self.pending.truncate(cut);
        self.discarding = true;
    }

    /// Drop the head of `chunk` that still belongs to an oversized line.
    fn skip_discarded<'c>(&mut self, chunk: &'c [u8]) -> &'c [u8] {
        if !self.discarding {
            return chunk;
        }
        match chunk.iter().position(|&b| b == DELIMITER) {
            Some(newline) => {
                self.discarding = false;
                self.bytes_dropped += newline as u64 + 1;
                &chunk[newline + 1..]
            }
            None => {
                self.bytes_dropped += chunk.len() as u64;
                &[]
            }
        }
    }
}

/// Lazy iterator over the complete lines of a [`FrameDecoder`]
pub struct Lines<'a> {
    decoder: &'a mut FrameDecoder,
}

impl Iterator for Lines<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        self.decoder.next_line()
    }
}
