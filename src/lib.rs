//! # Ring Logger
//!
//! An in-process, low-latency logging pipeline: application threads record
//! structured entries without blocking on I/O, and a single background thread
//! drains them to a file.
//!
//! ## How it moves records
//!
//! * [`AlignedPool`]: a pre-reserved, cache-aligned block carved out by a
//!   bump cursor; no per-object free, only bulk [`reset`](AlignedPool::reset).
//!   Allocations are generation-tagged handles, so a reset makes stale
//!   handles detectable instead of dangling.
//! * [`spsc`]: a lock-free single-producer/single-consumer ring of those
//!   handles, synchronized entirely by two cache-padded atomic indices.
//! * [`LogRecord`]: a fixed-size, cache-line-aligned entry carrying a
//!   monotonic timestamp, thread id, severity and inline bounded message.
//! * [`LogChannel`]: the producer facade. A short-held mutex around
//!   *allocate + enqueue* multiplexes any number of application threads down
//!   to the ring's single-producer contract; the drain path never takes it.
//! * [`LogSink`]: owns the background thread that drains the channel and
//!   appends formatted lines to a file, with RAII shutdown.
//!
//! A full pool or a full queue drops the entry, reported through the return
//! value and the channel's drop counter; the caller is never blocked.
//!
//! ## Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use ring_logger::{AlignedPool, Level, LogChannel, LogSink};
//!
//! let pool = AlignedPool::new(64 * 1024, 64).unwrap();
//! let channel = Arc::new(LogChannel::new(256, pool).unwrap());
//!
//! let path = std::env::temp_dir().join("ring_logger_quickstart.log");
//! let mut sink = LogSink::new(Arc::clone(&channel), &path).unwrap();
//!
//! channel.log(Level::Info, "service started").unwrap();
//! channel.log(Level::Warning, "cache miss rate high").unwrap();
//!
//! // Drains what was queued, joins the writer thread, closes the file.
//! sink.shutdown();
//! ```

pub mod channel;
pub mod clock;
pub mod error;
pub mod pool;
pub mod record;
pub mod sink;
pub mod spsc;

pub use channel::LogChannel;
pub use error::Error;
pub use pool::{AlignedPool, PoolHandle};
pub use record::{current_thread_id, Level, LogRecord, MAX_MESSAGE_LEN};
pub use sink::LogSink;
