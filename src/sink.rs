use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::channel::LogChannel;
use crate::clock;
use crate::error::Error;
use crate::record::LogRecord;

/// How long the drain loop sleeps when the queue is empty. A bounded pause,
/// not a hot spin: latency stays around a millisecond without burning a core.
const IDLE_WAIT: Duration = Duration::from_millis(1);

/// Background writer draining a [`LogChannel`] into a file.
///
/// Construction opens the output file (failing without starting anything if
/// it cannot) and then spawns the drain thread. Each record becomes one
/// appended line:
///
/// ```text
/// [<secs.micros>] [<thread-id>] [<LEVEL>] <message>
/// ```
///
/// [`shutdown`](Self::shutdown) is cooperative and bounded: the loop notices
/// the flag within one idle wait, performs a best-effort final drain, and is
/// joined. Dropping the sink shuts it down the same way, so the background
/// thread never outlives the sink and the file is flushed and closed.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use ring_logger::{AlignedPool, Level, LogChannel, LogSink};
///
/// let pool = AlignedPool::new(64 * 1024, 64).unwrap();
/// let channel = Arc::new(LogChannel::new(256, pool).unwrap());
/// let mut sink = LogSink::new(Arc::clone(&channel), "app.log").unwrap();
///
/// channel.log(Level::Info, "ready").unwrap();
///
/// sink.shutdown();
/// ```
pub struct LogSink {
    stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl LogSink {
    /// Opens `path` for writing and starts the drain thread.
    ///
    /// # Errors
    ///
    /// [`Error::SinkOpen`] if the file cannot be created; no thread is
    /// spawned in that case.
    pub fn new(channel: Arc<LogChannel>, path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|source| Error::SinkOpen {
            path: path.to_path_buf(),
            source,
        })?;

        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);
        let worker = thread::Builder::new()
            .name("log-sink".into())
            .spawn(move || drain_loop(channel, BufWriter::new(file), flag))?;

        Ok(Self {
            stop,
            worker: Some(worker),
        })
    }

    /// Signals the drain loop to stop, waits for its final drain, and joins
    /// it. Calling this twice is a no-op.
    pub fn shutdown(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

impl Drop for LogSink {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn drain_loop(channel: Arc<LogChannel>, mut out: BufWriter<File>, stop: Arc<AtomicBool>) {
    // The flag is checked every iteration, so shutdown is observed within one
    // record write or one idle wait even if producers never let the queue
    // drain.
    while !stop.load(Ordering::Acquire) {
        match channel.consume() {
            Some(record) => write_line(&mut out, &record),
            None => {
                flush(&mut out);
                thread::sleep(IDLE_WAIT);
            }
        }
    }
    // Best-effort final drain: producers racing the shutdown signal may still
    // enqueue after this empties out; those records are lost with the sink.
    while let Some(record) = channel.consume() {
        write_line(&mut out, &record);
    }
    flush(&mut out);
}

/// Failures here must not unwind across the thread boundary; the line is
/// dropped and the failure reported through the `log` facade.
fn write_line(out: &mut BufWriter<File>, record: &LogRecord) {
    let result = writeln!(
        out,
        "[{}] [{}] [{}] {}",
        clock::format_secs(record.timestamp_ns()),
        record.thread_id(),
        record.level(),
        record.message()
    );
    if let Err(err) = result {
        log::warn!("log sink dropped an entry after a write failure: {err}");
    }
}

fn flush(out: &mut BufWriter<File>) {
    if let Err(err) = out.flush() {
        log::warn!("log sink flush failed: {err}");
    }
}
