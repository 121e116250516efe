use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::clock;

/// Fixed-layout log records.
///
/// A record is plain data sized and aligned so that adjacent records never
/// share a cache line: concurrent construction of neighboring pool slots
/// cannot induce false sharing.

/// Longest message a record can carry, in bytes. Longer messages are
/// truncated silently.
pub const MAX_MESSAGE_LEN: usize = 255;

/// Message buffer length: the bound plus a trailing NUL.
const MESSAGE_BUF_LEN: usize = MAX_MESSAGE_LEN + 1;

/// Severity of a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Level {
    Info = 0,
    Warning = 1,
    Error = 2,
}

impl Level {
    /// The fixed spelling used in formatted log lines.
    pub fn as_str(self) -> &'static str {
        match self {
            Level::Info => "INFO",
            Level::Warning => "WARNING",
            Level::Error => "ERROR",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ids start at 1 so 0 can never be mistaken for a real thread.
static NEXT_THREAD_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static THREAD_ID: u64 = NEXT_THREAD_ID.fetch_add(1, Ordering::Relaxed);
}

/// A small dense id for the calling thread, assigned on first use.
///
/// Unlike `std::thread::ThreadId`, these render as short integers in log
/// lines and are plain `u64`s a record can store inline.
pub fn current_thread_id() -> u64 {
    THREAD_ID.with(|id| *id)
}

/// A single log entry: timestamp, thread, severity and inline message.
///
/// Records are immutable once constructed and contain no heap ownership: the
/// message lives inline, truncated to [`MAX_MESSAGE_LEN`] bytes and always
/// NUL-terminated within the buffer. Size is a multiple of the cache line and
/// alignment is one cache line.
///
/// Every field is stored as plain bytes (the severity as a raw `u8`), so a
/// record is plain copyable data the pool can move in and out of raw memory.
///
/// # Examples
///
/// ```
/// use ring_logger::{Level, LogRecord};
///
/// let record = LogRecord::new(Level::Warning, "disk nearly full");
/// assert_eq!(record.level(), Level::Warning);
/// assert_eq!(record.message(), "disk nearly full");
/// assert_ne!(record.thread_id(), 0);
/// ```
#[repr(C, align(64))]
#[derive(Clone, Copy)]
pub struct LogRecord {
    timestamp_ns: u64,
    thread_id: u64,
    level: u8,
    message_len: u8,
    message: [u8; MESSAGE_BUF_LEN],
}

impl LogRecord {
    /// Builds a record, capturing the monotonic timestamp and the calling
    /// thread's id itself; callers supply only severity and text.
    pub fn new(level: Level, message: &str) -> Self {
        let text = truncate_to_char_boundary(message, MAX_MESSAGE_LEN);
        let mut buf = [0u8; MESSAGE_BUF_LEN];
        buf[..text.len()].copy_from_slice(text.as_bytes());
        Self {
            timestamp_ns: clock::monotonic_nanos(),
            thread_id: current_thread_id(),
            level: level as u8,
            message_len: text.len() as u8,
            message: buf,
        }
    }

    /// Nanoseconds since the process clock anchor.
    #[inline]
    pub fn timestamp_ns(&self) -> u64 {
        self.timestamp_ns
    }

    /// Id of the thread that created the record.
    #[inline]
    pub fn thread_id(&self) -> u64 {
        self.thread_id
    }

    /// Severity level. Unknown byte values decode as `Error` rather than
    /// panicking, since records travel through raw pool memory.
    pub fn level(&self) -> Level {
        match self.level {
            0 => Level::Info,
            1 => Level::Warning,
            _ => Level::Error,
        }
    }

    /// The stored message text.
    pub fn message(&self) -> &str {
        let len = (self.message_len as usize).min(MAX_MESSAGE_LEN);
        std::str::from_utf8(&self.message[..len]).unwrap_or("")
    }

    /// Raw message buffer, including the NUL terminator. Used by layout
    /// tests.
    #[doc(hidden)]
    pub fn message_bytes(&self) -> &[u8; MESSAGE_BUF_LEN] {
        &self.message
    }
}

impl fmt::Debug for LogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogRecord")
            .field("timestamp_ns", &self.timestamp_ns)
            .field("thread_id", &self.thread_id)
            .field("level", &self.level())
            .field("message", &self.message())
            .finish()
    }
}

/// Truncates `s` to at most `max` bytes without splitting a UTF-8 character.
fn truncate_to_char_boundary(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncation_respects_char_boundaries() {
        // Each '日' is 3 bytes; 255 is not a multiple of 3.
        let s = "日".repeat(100);
        let t = truncate_to_char_boundary(&s, MAX_MESSAGE_LEN);
        assert!(t.len() <= MAX_MESSAGE_LEN);
        assert_eq!(t.len() % 3, 0, "must cut on a character boundary");
    }
}
