//! In-memory output capture.

use std::sync::{Arc, Mutex};

/// Marker appended once when captured output exceeds the size limit.
pub const TRUNCATION_MARKER: &str = "[output truncated]\n";

/// Default capture limit in bytes.
pub const DEFAULT_MAX_OUTPUT: usize = 1024 * 1024;

#[derive(Debug, Default)]
struct SinkBuffer {
    text: String,
    truncated: bool,
}

/// Append-only text buffer that an engine writes captured output into.
///
/// Clones share the same buffer, so the session can hand one clone to the
/// engine and keep another to read the result back.
#[derive(Debug, Clone)]
pub struct OutputSink {
    buffer: Arc<Mutex<SinkBuffer>>,
    max_size: usize,
}

impl OutputSink {
    /// Create a sink with the default size limit.
    pub fn new() -> Self {
        Self::with_limit(DEFAULT_MAX_OUTPUT)
    }

    /// Create a sink that keeps at most `max_size` bytes of output.
    pub fn with_limit(max_size: usize) -> Self {
        Self {
            buffer: Arc::new(Mutex::new(SinkBuffer::default())),
            max_size,
        }
    }

    /// Append text. Writes past the limit are dropped after the marker.
    pub fn write(&self, text: &str) {
        if text.is_empty() {
            return;
        }
        let Ok(mut buf) = self.buffer.lock() else {
            return;
        };
        if buf.truncated {
            return;
        }

        let remaining = self.max_size.saturating_sub(buf.text.len());
        if text.len() <= remaining {
            buf.text.push_str(text);
            return;
        }

        let mut cut = remaining;
        while !text.is_char_boundary(cut) {
            cut -= 1;
        }
        buf.text.push_str(&text[..cut]);
        if !buf.text.is_empty() && !buf.text.ends_with('\n') {
            buf.text.push('\n');
        }
        buf.text.push_str(TRUNCATION_MARKER);
        buf.truncated = true;
    }

    /// Append a full line, adding the trailing newline.
    pub fn write_line(&self, line: &str) {
        self.write(&format!("{}\n", line));
    }

    /// Snapshot of everything captured so far.
    pub fn contents(&self) -> String {
        self.buffer
            .lock()
            .map(|b| b.text.clone())
            .unwrap_or_default()
    }

    /// Drain the buffer, leaving it empty.
    pub fn take(&self) -> String {
        self.buffer
            .lock()
            .map(|mut b| {
                b.truncated = false;
                std::mem::take(&mut b.text)
            })
            .unwrap_or_default()
    }

    /// Whether the limit was hit.
    pub fn is_truncated(&self) -> bool {
        self.buffer.lock().map(|b| b.truncated).unwrap_or(false)
    }

    /// Captured size in bytes.
    pub fn len(&self) -> usize {
        self.buffer.lock().map(|b| b.text.len()).unwrap_or(0)
    }

    /// Whether nothing has been captured.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for OutputSink {
    fn default() -> Self {
        Self::new()
    }
}
