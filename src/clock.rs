use std::time::Instant;
use lazy_static::lazy_static;

/// Monotonic timestamp utilities for the logging pipeline.
///
/// Records carry nanoseconds elapsed since a process-wide anchor rather than
/// wall-clock time: the anchor is monotone (never jumps backwards on clock
/// adjustment), cheap to sample, and renders compactly in log lines.

lazy_static! {
    /// Process-wide anchor; initialized on first use.
    static ref PROCESS_START: Instant = Instant::now();
}

/// Returns nanoseconds elapsed since the process anchor.
///
/// The first call initializes the anchor, so the earliest observable value is
/// close to zero. Successive calls on any thread are monotonically
/// non-decreasing.
#[inline]
pub fn monotonic_nanos() -> u64 {
    PROCESS_START.elapsed().as_nanos() as u64
}

/// Renders a nanosecond timestamp as `seconds.microseconds`.
///
/// This is the `[<timestamp>]` field of a formatted log line.
///
/// # Examples
///
/// ```
/// assert_eq!(ring_logger::clock::format_secs(1_500_000_000), "1.500000");
/// assert_eq!(ring_logger::clock::format_secs(42), "0.000000");
/// ```
pub fn format_secs(nanos: u64) -> String {
    format!("{}.{:06}", nanos / 1_000_000_000, (nanos % 1_000_000_000) / 1_000)
}
