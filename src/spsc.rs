//! Lock-free single-producer, single-consumer ring queue.
//!
//! All raw-atomics logic in the crate lives in this module. The public
//! surface is safe: [`ring`] splits the queue into a [`Producer`] and a
//! [`Consumer`] half, and both `push` and `pop` take `&mut self`, so exactly
//! one thread can drive each side at a time.
//!
//! The ring keeps one slot empty to tell full from empty without a separate
//! counter: a queue of capacity `K` holds at most `K - 1` items. `head` is the
//! next slot to pop (advanced only by the consumer); `tail` is the next slot
//! to push (advanced only by the producer). Each index is written with a
//! release store after its slot access and read by the other side with an
//! acquire load, which is the entire cross-thread visibility story: slot
//! contents are published before the index that exposes them, and a slot is
//! never reused before the index that retires it.

use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crossbeam_utils::CachePadded;

struct RingState<T> {
    /// Next slot to pop. Owned by the consumer, acquire-read by the producer
    /// before reusing a slot.
    head: CachePadded<AtomicUsize>,
    /// Next slot to push. Owned by the producer, acquire-read by the consumer
    /// before reading a slot.
    tail: CachePadded<AtomicUsize>,
    slots: Box<[UnsafeCell<MaybeUninit<T>>]>,
}

// SAFETY: slots are only accessed under the SPSC protocol: the producer
// writes slot `tail` before release-publishing `tail`, and the consumer reads
// slot `head` before release-publishing `head`, so no slot is ever accessed
// from both sides at once.
unsafe impl<T: Send> Send for RingState<T> {}
unsafe impl<T: Send> Sync for RingState<T> {}

impl<T> RingState<T> {
    #[inline]
    fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// `(index + 1) % capacity` without the division.
    #[inline]
    fn advance(&self, index: usize) -> usize {
        let next = index + 1;
        if next == self.capacity() { 0 } else { next }
    }
}

impl<T> Drop for RingState<T> {
    fn drop(&mut self) {
        // Both halves are gone; drop whatever was pushed but never popped.
        let mut head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Relaxed);
        while head != tail {
            // SAFETY: slots in [head, tail) hold initialized values.
            unsafe {
                self.slots[head].get_mut().assume_init_drop();
            }
            head = self.advance(head);
        }
    }
}

/// Creates a bounded SPSC ring of `capacity` slots.
///
/// One slot is reserved to disambiguate full from empty, so the ring accepts
/// at most `capacity - 1` items before reporting full. A power-of-two
/// capacity is a good default but not required.
///
/// # Panics
///
/// Panics if `capacity` is zero.
///
/// # Examples
///
/// ```
/// let (mut tx, mut rx) = ring_logger::spsc::ring::<u64>(8);
///
/// tx.push(1).unwrap();
/// tx.push(2).unwrap();
/// assert_eq!(rx.pop(), Some(1));
/// assert_eq!(rx.pop(), Some(2));
/// assert_eq!(rx.pop(), None);
/// ```
pub fn ring<T>(capacity: usize) -> (Producer<T>, Consumer<T>) {
    assert!(capacity > 0, "ring capacity must be greater than 0");
    let slots = (0..capacity)
        .map(|_| UnsafeCell::new(MaybeUninit::uninit()))
        .collect::<Vec<_>>()
        .into_boxed_slice();
    let state = Arc::new(RingState {
        head: CachePadded::new(AtomicUsize::new(0)),
        tail: CachePadded::new(AtomicUsize::new(0)),
        slots,
    });
    (
        Producer {
            state: Arc::clone(&state),
            cached_head: 0,
        },
        Consumer {
            state,
            cached_tail: 0,
        },
    )
}

/// Write half of the ring. Only the thread holding `&mut Producer` may push.
pub struct Producer<T> {
    state: Arc<RingState<T>>,
    /// Last observed consumer index; refreshed only when the ring looks full,
    /// saving an acquire load on most pushes. Staleness is conservative: the
    /// consumer only ever makes more room.
    cached_head: usize,
}

impl<T> Producer<T> {
    /// Attempts to push `item`, without blocking or retrying.
    ///
    /// On a full ring the item is handed back unchanged and the caller
    /// decides what to do with it (drop, retry, backpressure).
    pub fn push(&mut self, item: T) -> Result<(), T> {
        let state = &*self.state;
        let tail = state.tail.load(Ordering::Relaxed);
        let next = state.advance(tail);

        if next == self.cached_head {
            self.cached_head = state.head.load(Ordering::Acquire);
            if next == self.cached_head {
                return Err(item);
            }
        }

        // SAFETY: `next != head`, so the consumer has retired this slot (its
        // release store of `head` happened-before our acquire load above),
        // and only this producer writes slots.
        unsafe {
            (*state.slots[tail].get()).write(item);
        }
        state.tail.store(next, Ordering::Release);
        Ok(())
    }

    /// Whether the ring currently holds no items.
    ///
    /// Racy by nature: the consumer may pop concurrently. A `true` result
    /// means the ring *was* empty at the acquire load, which is all the
    /// channel's pool-recycling check needs.
    pub fn is_empty(&self) -> bool {
        let state = &*self.state;
        state.head.load(Ordering::Acquire) == state.tail.load(Ordering::Relaxed)
    }

    /// Slot count, including the one reserved empty slot.
    pub fn capacity(&self) -> usize {
        self.state.capacity()
    }
}

/// Read half of the ring. Only the thread holding `&mut Consumer` may pop.
pub struct Consumer<T> {
    state: Arc<RingState<T>>,
    /// Last observed producer index; refreshed only when the ring looks
    /// empty. Staleness is conservative: the producer only ever adds items.
    cached_tail: usize,
}

impl<T> Consumer<T> {
    /// Pops the oldest item, or `None` when the ring is empty. Never blocks.
    pub fn pop(&mut self) -> Option<T> {
        let state = &*self.state;
        let head = state.head.load(Ordering::Relaxed);

        if head == self.cached_tail {
            self.cached_tail = state.tail.load(Ordering::Acquire);
            if head == self.cached_tail {
                return None;
            }
        }

        // SAFETY: `head != tail`, so this slot was initialized by the
        // producer (its release store of `tail` happened-before our acquire
        // load above), and only this consumer reads slots.
        let item = unsafe { (*state.slots[head].get()).assume_init_read() };
        state.head.store(state.advance(head), Ordering::Release);
        Some(item)
    }

    /// Slot count, including the one reserved empty slot.
    pub fn capacity(&self) -> usize {
        self.state.capacity()
    }
}
