// SPDX-License-Identifier: Apache-2.0 OR MIT
// Fixed-size log record with cache-line friendly layout

use crate::severity::Severity;
use std::fmt;

/// Maximum rendered text length per line. Longer messages are truncated at
/// the nearest UTF-8 boundary below this bound.
pub const TEXT_MAX: usize = 228;

/// One rendered log line, 256 bytes (4 cache lines).
///
/// Lives inside a channel slot: constructed on the producer's stack, copied
/// into the ring, overwritten in place on the next wraparound write to the
/// same slot. Never individually allocated.
#[repr(C, align(64))]
#[derive(Clone)]
pub struct LogLine {
    /// Monotonic nanoseconds, sampled when the producer called write.
    pub timestamp_ns: u64,
    /// Per-channel sequence number, stamped by the channel on commit.
    pub seq: u64,
    /// Pool slot index of the owning channel.
    pub producer_id: u32,
    /// OS thread id of the writer.
    pub thread_id: u32,
    pub severity: Severity,
    text_len: u8,
    _pad: [u8; 2],
    text: [u8; TEXT_MAX],
}

impl LogLine {
    /// Build a line on the producer's stack, sampling the monotonic clock
    /// and the calling thread's id. `seq` is filled in by the channel.
    pub(crate) fn new(severity: Severity, producer_id: u32, text: &str) -> Self {
        let mut line = Self {
            timestamp_ns: monotonic_nanos(),
            producer_id,
            thread_id: current_thread_id(),
            severity,
            ..Self::empty()
        };
        line.set_text(text);
        line
    }

    pub(crate) fn empty() -> Self {
        Self {
            timestamp_ns: 0,
            seq: 0,
            producer_id: 0,
            thread_id: 0,
            severity: Severity::Info,
            text_len: 0,
            _pad: [0; 2],
            text: [0; TEXT_MAX],
        }
    }

    /// Copy `text` in, truncating at the nearest char boundary below
    /// [`TEXT_MAX`].
    pub(crate) fn set_text(&mut self, text: &str) {
        let mut len = text.len().min(TEXT_MAX);
        while len > 0 && !text.is_char_boundary(len) {
            len -= 1;
        }
        self.text[..len].copy_from_slice(&text.as_bytes()[..len]);
        self.text_len = len as u8;
    }

    /// Get the message text.
    pub fn text(&self) -> &str {
        std::str::from_utf8(&self.text[..self.text_len as usize]).unwrap_or("")
    }
}

impl Default for LogLine {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for LogLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogLine")
            .field("severity", &self.severity)
            .field("producer_id", &self.producer_id)
            .field("seq", &self.seq)
            .field("text", &self.text())
            .finish()
    }
}

/// Bounded stack buffer that formatted arguments render into, so the write
/// path stays allocation-free. Output past [`TEXT_MAX`] is discarded at the
/// nearest char boundary.
pub(crate) struct TextBuf {
    buf: [u8; TEXT_MAX],
    len: usize,
}

impl TextBuf {
    pub(crate) fn new() -> Self {
        Self {
            buf: [0; TEXT_MAX],
            len: 0,
        }
    }

    pub(crate) fn as_str(&self) -> &str {
        std::str::from_utf8(&self.buf[..self.len]).unwrap_or("")
    }
}

impl fmt::Write for TextBuf {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let avail = TEXT_MAX - self.len;
        let mut take = s.len().min(avail);
        while take > 0 && !s.is_char_boundary(take) {
            take -= 1;
        }
        self.buf[self.len..self.len + take].copy_from_slice(&s.as_bytes()[..take]);
        self.len += take;
        Ok(())
    }
}

/// Monotonic nanoseconds since an arbitrary process-local origin.
pub(crate) fn monotonic_nanos() -> u64 {
    use std::time::Instant;
    static START: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();
    let start = START.get_or_init(Instant::now);
    start.elapsed().as_nanos() as u64
}

/// Current OS thread id (truncated to u32)
#[cfg(target_os = "linux")]
fn current_thread_id() -> u32 {
    unsafe { libc::gettid() as u32 }
}

#[cfg(not(target_os = "linux"))]
fn current_thread_id() -> u32 {
    use std::sync::atomic::{AtomicU32, Ordering};
    static NEXT: AtomicU32 = AtomicU32::new(1);
    thread_local! {
        static ID: u32 = NEXT.fetch_add(1, Ordering::Relaxed);
    }
    ID.with(|id| *id)
}
