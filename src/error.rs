use std::io;
use std::path::PathBuf;

/// Errors reported by the logging pipeline.
///
/// Capacity conditions (`PoolExhausted`, `QueueFull`) are recoverable and are
/// reported to the caller that triggered them; they never cross a thread
/// boundary. Only `SinkOpen` aborts construction of a component.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The pool has insufficient remaining space for an allocation.
    #[error("pool exhausted: {requested} bytes requested, {remaining} bytes remaining")]
    PoolExhausted {
        /// Bytes requested (before alignment rounding).
        requested: usize,
        /// Bytes left in the pool at the time of the request.
        remaining: usize,
    },

    /// The queue rejected an entry because it was full.
    #[error("queue full, entry dropped")]
    QueueFull,

    /// Pool alignment is not a nonzero power of two.
    #[error("invalid alignment {0}: must be a nonzero power of two")]
    InvalidAlignment(usize),

    /// Pool capacity is zero or too large for 32-bit offsets.
    #[error("invalid pool capacity {0}")]
    InvalidCapacity(usize),

    /// The pool handed to a channel cannot hold aligned records.
    #[error("pool alignment {actual} cannot hold records aligned to {required}")]
    MisalignedPool {
        /// Alignment the record type requires.
        required: usize,
        /// Alignment the pool was built with.
        actual: usize,
    },

    /// The sink could not open its output file.
    #[error("failed to open log file {path:?}: {source}")]
    SinkOpen {
        /// Path that failed to open.
        path: PathBuf,
        /// Underlying OS error.
        source: io::Error,
    },

    /// Other I/O failure (e.g. spawning the sink thread).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
