use std::mem;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::error::Error;
use crate::pool::{AlignedPool, PoolHandle};
use crate::record::{Level, LogRecord};
use crate::spsc::{self, Consumer, Producer};

/// The producer-facing facade of the pipeline.
///
/// A `LogChannel` owns an [`AlignedPool`] and an SPSC ring of
/// [`PoolHandle`]s. Any number of application threads may call
/// [`log`](Self::log) concurrently; exactly one drainer (normally a
/// [`LogSink`](crate::LogSink)) calls [`consume`](Self::consume).
///
/// # How many producers fit through a single-producer queue
///
/// The ring itself is strictly single-producer. The channel multiplexes many
/// physical threads down to that contract with one short-held mutex around
/// *allocation plus enqueue*: whichever thread holds the lock is, for that
/// moment, the one logical producer. The enqueue must happen inside the same
/// critical section as the allocation: released between the two, a second
/// thread could interleave and the queue would see records out of allocation
/// order. The consumer side never takes this lock, so the drain path stays on
/// the lock-free ring.
///
/// Within one thread, records are observed in call order. Across threads, the
/// order is whichever thread wins the lock; no stronger guarantee is offered.
///
/// # Examples
///
/// ```
/// use ring_logger::{AlignedPool, Level, LogChannel};
///
/// let pool = AlignedPool::new(4096, 64).unwrap();
/// let channel = LogChannel::new(16, pool).unwrap();
///
/// channel.log(Level::Info, "starting up").unwrap();
///
/// let record = channel.consume().expect("one record queued");
/// assert_eq!(record.message(), "starting up");
/// assert!(channel.consume().is_none());
/// ```
pub struct LogChannel {
    pool: AlignedPool,
    /// The single contention point: serializes pool allocation + enqueue.
    producer: Mutex<Producer<PoolHandle>>,
    /// Enforces the single-consumer role and serializes pool recycling
    /// against in-flight reads; uncontended in normal operation.
    consumer: Mutex<Consumer<PoolHandle>>,
    /// Entries lost to a full queue, an exhausted pool, or a recycled
    /// generation.
    dropped: AtomicU64,
}

impl LogChannel {
    /// Builds a channel over `pool` with a ring of `queue_capacity` slots.
    ///
    /// The ring keeps one slot empty, so at most `queue_capacity - 1` records
    /// can be in flight.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MisalignedPool`] if the pool's alignment cannot hold
    /// cache-line-aligned records.
    ///
    /// # Panics
    ///
    /// Panics if `queue_capacity` is zero.
    pub fn new(queue_capacity: usize, pool: AlignedPool) -> Result<Self, Error> {
        let required = mem::align_of::<LogRecord>();
        if pool.alignment() % required != 0 {
            return Err(Error::MisalignedPool {
                required,
                actual: pool.alignment(),
            });
        }
        let (producer, consumer) = spsc::ring(queue_capacity);
        Ok(Self {
            pool,
            producer: Mutex::new(producer),
            consumer: Mutex::new(consumer),
            dropped: AtomicU64::new(0),
        })
    }

    /// Records a log entry. Callable concurrently from any number of threads.
    ///
    /// The record (timestamp, thread id) is captured before the lock is
    /// taken, keeping the critical section down to a pointer bump, a
    /// record-sized copy, and an index store.
    ///
    /// # Errors
    ///
    /// * [`Error::QueueFull`]: the ring rejected the entry. The pool
    ///   allocation made for it is rolled back, so a saturated queue does not
    ///   leak pool space.
    /// * [`Error::PoolExhausted`]: no room left in the pool and the queue
    ///   still holds undrained records, so the pool cannot be recycled yet.
    ///
    /// Either way the entry is dropped, [`dropped`](Self::dropped) is
    /// incremented, and no partial record becomes visible to the consumer.
    pub fn log(&self, level: Level, message: &str) -> Result<(), Error> {
        let record = LogRecord::new(level, message);

        let mut producer = self.producer.lock();
        let handle = match self.allocate_record(&producer) {
            Ok(handle) => handle,
            Err(err) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                return Err(err);
            }
        };
        // SAFETY: `handle` was just allocated with room for a LogRecord, the
        // pool alignment was validated in `new`, and we hold the producer
        // lock, so nothing else writes this range and no reader sees the
        // handle until the push below publishes it.
        unsafe {
            self.pool.write(handle, record);
        }
        if producer.push(handle).is_err() {
            self.pool.rollback(handle);
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return Err(Error::QueueFull);
        }
        Ok(())
    }

    /// Allocates a record slot, recycling the pool if it is exhausted but
    /// fully drained.
    ///
    /// An empty ring means no queued handle references pool memory, so the
    /// whole pool can be reset (generation bump) and the allocation retried.
    /// The consumer lock is held across the reset: the drainer may have just
    /// popped the last handle and still be copying that record out, and the
    /// reset must not hand those bytes back while it does. The ring cannot
    /// refill in between, because this thread holds the producer lock.
    fn allocate_record(&self, producer: &Producer<PoolHandle>) -> Result<PoolHandle, Error> {
        let size = mem::size_of::<LogRecord>();
        match self.pool.allocate(size) {
            Ok(handle) => Ok(handle),
            Err(err) => {
                if producer.is_empty() {
                    // Lock order is producer then consumer, never the
                    // reverse; `consume` takes the consumer lock alone.
                    let _drainer = self.consumer.lock();
                    self.pool.reset();
                    self.pool.allocate(size)
                } else {
                    Err(err)
                }
            }
        }
    }

    /// Dequeues the next record, or `None` when the queue is empty.
    ///
    /// Intended for the single drainer. The record is copied out of its pool
    /// slot while the consumer lock is held, which is what keeps a recycling
    /// reset from reusing those bytes mid-copy. A handle allocated before the
    /// last reset is counted as a drop and skipped rather than read.
    pub fn consume(&self) -> Option<LogRecord> {
        let mut consumer = self.consumer.lock();
        while let Some(handle) = consumer.pop() {
            // SAFETY: every handle that reaches the ring was written with a
            // LogRecord before being pushed, and no reset can run while this
            // lock is held.
            if let Some(record) = unsafe { self.pool.read::<LogRecord>(handle) } {
                return Some(record);
            }
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
        None
    }

    /// Total entries lost so far (full queue, exhausted pool, or recycled
    /// generation). Drops are counted, never silently swallowed.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// The backing pool, for introspection.
    pub fn pool(&self) -> &AlignedPool {
        &self.pool
    }
}

impl std::fmt::Debug for LogChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogChannel")
            .field("pool", &self.pool)
            .field("dropped", &self.dropped())
            .finish()
    }
}
