//! Incremental `text/event-stream` decoding.
//!
//! Only the `data` field matters here: `event`, `id` and `retry` fields are
//! ignored, comment lines (`: keep-alive`) are skipped, and a blank line
//! dispatches the accumulated data as one message. A line longer than
//! [`MAX_LINE_BYTES`] is discarded along with the message it belongs to.

use bytes::BytesMut;
use log::debug;

/// Longest line kept while waiting for its newline.
pub const MAX_LINE_BYTES: usize = 256 * 1024;

#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: BytesMut,
    data: Vec<String>,
    /// Bytes of `buffer` already known to hold no newline.
    scanned: usize,
    /// Inside an over-long line; everything up to the next newline is dropped.
    discarding: bool,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk and return every message completed by it.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut messages = Vec::new();
        while let Some(offset) = self.buffer[self.scanned..].iter().position(|&b| b == b'\n') {
            let pos = self.scanned + offset;
            let mut line = self.buffer.split_to(pos + 1);
            self.scanned = 0;
            if self.discarding {
                self.discarding = false;
                continue;
            }
            line.truncate(pos);
            if line.last() == Some(&b'\r') {
                line.truncate(pos - 1);
            }
            if let Some(message) = self.handle_line(&String::from_utf8_lossy(&line)) {
                messages.push(message);
            }
        }

        self.scanned = self.buffer.len();
        if self.buffer.len() > MAX_LINE_BYTES {
            debug!(
                "[SseDecoder] Dropping line longer than {} bytes",
                MAX_LINE_BYTES
            );
            self.buffer.clear();
            self.data.clear();
            self.scanned = 0;
            self.discarding = true;
        }
        messages
    }

    /// Drop any partial line or message, e.g. after a reconnect.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.data.clear();
        self.scanned = 0;
        self.discarding = false;
    }

    fn handle_line(&mut self, line: &str) -> Option<String> {
        if line.is_empty() {
            if self.data.is_empty() {
                return None;
            }
            let message = self.data.join("\n");
            self.data.clear();
            return Some(message);
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        if field == "data" {
            self.data.push(value.to_string());
        }
        None
    }
}
