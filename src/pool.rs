use std::alloc::{self, Layout};
use std::ptr::{self, NonNull};
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

use crate::error::Error;

/// Aligned bump-allocating memory pool.
///
/// This module provides the backing storage for log records: one contiguous
/// block reserved up front, carved out by a forward-only cursor. There is no
/// per-object free; the only reclamation is [`AlignedPool::reset`], which
/// invalidates every prior allocation at once.

/// A handle to a pool allocation.
///
/// Handles are offsets into the pool's block, tagged with the pool generation
/// that was current when they were allocated. After a [`AlignedPool::reset`]
/// the generation no longer matches and the handle is *stale*: reading through
/// it yields `None` instead of the bytes of whatever reused that range.
///
/// A handle is pointer-sized plain data and is what flows through the SPSC
/// queue from producers to the consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PoolHandle {
    offset: u32,
    generation: u32,
}

impl PoolHandle {
    /// Byte offset of the allocation from the pool base.
    #[inline]
    pub fn offset(&self) -> u32 {
        self.offset
    }

    /// Pool generation this handle was allocated under.
    #[inline]
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

/// A fixed-capacity memory pool handing out aligned sub-ranges.
///
/// The pool reserves its block at construction (with the requested alignment)
/// and releases it on drop. [`allocate`](Self::allocate) advances a bump
/// cursor; every returned offset is aligned to the pool alignment, and
/// allocation sizes are rounded up so the *next* allocation stays aligned too.
///
/// # Concurrency
///
/// The cursor is an atomic, so concurrent `allocate` calls cannot corrupt the
/// pool, but the pool carries no lock and makes no ordering promises between
/// unserialized callers. The intended caller ([`LogChannel`](crate::LogChannel))
/// serializes allocation externally; `rollback` and `reset` are only
/// meaningful under that same serialization.
///
/// # Examples
///
/// ```
/// use ring_logger::AlignedPool;
///
/// let pool = AlignedPool::new(4096, 64).unwrap();
/// let a = pool.allocate(100).unwrap();
/// let b = pool.allocate(100).unwrap();
///
/// // Offsets are aligned, and sizes round up to keep the cursor aligned.
/// assert_eq!(a.offset(), 0);
/// assert_eq!(b.offset(), 128);
/// assert_eq!(pool.used(), 256);
/// ```
pub struct AlignedPool {
    base: NonNull<u8>,
    layout: Layout,
    capacity: usize,
    align: usize,
    /// Bytes handed out so far. Always a multiple of `align`, never past
    /// `capacity`.
    cursor: AtomicUsize,
    /// Bumped by `reset()`; stale handles carry an older value.
    generation: AtomicU32,
}

// SAFETY: the raw block is only touched through `write`/`read`, whose
// contracts (slot published through the queue before being read, resets never
// concurrent with reads) make the accesses race-free; the cursor and
// generation are atomics.
unsafe impl Send for AlignedPool {}
unsafe impl Sync for AlignedPool {}

impl AlignedPool {
    /// Reserves a pool of `capacity` bytes aligned to `alignment`.
    ///
    /// # Errors
    ///
    /// * [`Error::InvalidAlignment`] if `alignment` is zero or not a power of
    ///   two.
    /// * [`Error::InvalidCapacity`] if `capacity` is zero or exceeds
    ///   `u32::MAX` (handle offsets are 32-bit).
    ///
    /// Aborts via the global allocation error hook if the OS refuses the
    /// reservation itself.
    pub fn new(capacity: usize, alignment: usize) -> Result<Self, Error> {
        if alignment == 0 || !alignment.is_power_of_two() {
            return Err(Error::InvalidAlignment(alignment));
        }
        if capacity == 0 || capacity > u32::MAX as usize {
            return Err(Error::InvalidCapacity(capacity));
        }
        let layout = Layout::from_size_align(capacity, alignment)
            .map_err(|_| Error::InvalidCapacity(capacity))?;

        // SAFETY: layout has nonzero size (capacity checked above).
        let raw = unsafe { alloc::alloc(layout) };
        let base = match NonNull::new(raw) {
            Some(base) => base,
            None => alloc::handle_alloc_error(layout),
        };

        Ok(Self {
            base,
            layout,
            capacity,
            align: alignment,
            cursor: AtomicUsize::new(0),
            generation: AtomicU32::new(0),
        })
    }

    /// Allocates `size` bytes, rounded up to the pool alignment.
    ///
    /// Returns a handle whose offset satisfies
    /// `(base + offset) % alignment == 0`. Allocating exactly the remaining
    /// (rounded) space succeeds; anything beyond it fails with
    /// [`Error::PoolExhausted`], a reportable condition rather than a fault.
    ///
    /// # Examples
    ///
    /// ```
    /// use ring_logger::AlignedPool;
    ///
    /// let pool = AlignedPool::new(128, 64).unwrap();
    /// assert!(pool.allocate(64).is_ok());
    /// assert!(pool.allocate(64).is_ok());
    /// assert!(pool.allocate(1).is_err());
    /// ```
    pub fn allocate(&self, size: usize) -> Result<PoolHandle, Error> {
        let padded = match size.checked_add(self.align - 1) {
            Some(v) => v & !(self.align - 1),
            None => {
                return Err(Error::PoolExhausted {
                    requested: size,
                    remaining: self.remaining(),
                })
            }
        };

        let mut current = self.cursor.load(Ordering::Relaxed);
        loop {
            let end = current.saturating_add(padded);
            if end > self.capacity {
                return Err(Error::PoolExhausted {
                    requested: size,
                    remaining: self.capacity - current,
                });
            }
            match self.cursor.compare_exchange_weak(
                current,
                end,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => {
                    return Ok(PoolHandle {
                        offset: current as u32,
                        generation: self.generation.load(Ordering::Relaxed),
                    })
                }
                Err(observed) => current = observed,
            }
        }
    }

    /// Rewinds the cursor to `handle`, returning its bytes to the pool.
    ///
    /// Only valid for the **most recent** allocation, under the same external
    /// serialization as [`allocate`](Self::allocate). The channel uses this to
    /// undo an allocation whose enqueue was rejected, so a full queue cannot
    /// leak pool space.
    pub fn rollback(&self, handle: PoolHandle) {
        debug_assert_eq!(
            handle.generation,
            self.generation.load(Ordering::Relaxed),
            "rollback of a stale handle"
        );
        self.cursor.store(handle.offset as usize, Ordering::Relaxed);
    }

    /// Rewinds the cursor to the pool base and invalidates every handle.
    ///
    /// O(1); no zeroing. Handles from before the reset become stale and read
    /// back `None`. Must not run concurrently with [`read`](Self::read): the
    /// bytes a reader is copying would be handed out again. The channel
    /// serializes resets against its drain path with the consumer lock.
    pub fn reset(&self) {
        self.generation.fetch_add(1, Ordering::Release);
        self.cursor.store(0, Ordering::Release);
    }

    /// Total capacity in bytes.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Alignment every returned offset satisfies.
    #[inline]
    pub fn alignment(&self) -> usize {
        self.align
    }

    /// Bytes currently handed out.
    #[inline]
    pub fn used(&self) -> usize {
        self.cursor.load(Ordering::Relaxed)
    }

    /// Bytes still available.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.capacity - self.used()
    }

    /// Current generation (changes on every [`reset`](Self::reset)).
    #[inline]
    pub fn generation(&self) -> u32 {
        self.generation.load(Ordering::Acquire)
    }

    /// Writes `value` into the allocation at `handle`.
    ///
    /// # Safety
    ///
    /// `handle` must come from [`allocate`](Self::allocate) on this pool with
    /// a size of at least `size_of::<T>()`, the pool alignment must satisfy
    /// `align_of::<T>()`, and the caller must hold the external serialization
    /// that guards allocation (no other writer for this range, no reader until
    /// the handle is published).
    pub unsafe fn write<T>(&self, handle: PoolHandle, value: T) {
        let offset = handle.offset as usize;
        debug_assert!(offset + std::mem::size_of::<T>() <= self.capacity);
        debug_assert_eq!(self.align % std::mem::align_of::<T>(), 0);
        // SAFETY: in-bounds and aligned per the contract above.
        unsafe {
            ptr::write(self.base.as_ptr().add(offset).cast::<T>(), value);
        }
    }

    /// Copies the `T` stored at `handle` out of the pool.
    ///
    /// Returns `None` when the handle's generation is stale, i.e. the pool was
    /// [`reset`](Self::reset) since the allocation; the bytes behind a stale
    /// handle may already belong to a newer allocation and are never read.
    ///
    /// # Safety
    ///
    /// `handle` must come from `allocate` + [`write`](Self::write) of a `T` on
    /// this pool, and the caller must ensure no `reset` or `write` to this
    /// range runs concurrently with the read. The channel upholds this by
    /// holding its consumer lock both here and across recycling resets.
    pub unsafe fn read<T: Copy>(&self, handle: PoolHandle) -> Option<T> {
        if self.generation.load(Ordering::Acquire) != handle.generation {
            return None;
        }
        let offset = handle.offset as usize;
        debug_assert!(offset + std::mem::size_of::<T>() <= self.capacity);
        // SAFETY: in-bounds and aligned per the contract above, which also
        // rules out a concurrent reset or write to these bytes.
        unsafe { Some(ptr::read(self.base.as_ptr().add(offset).cast::<T>())) }
    }
}

impl Drop for AlignedPool {
    fn drop(&mut self) {
        // SAFETY: allocated in `new` with this exact layout, freed once here.
        unsafe {
            alloc::dealloc(self.base.as_ptr(), self.layout);
        }
    }
}

impl std::fmt::Debug for AlignedPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlignedPool")
            .field("capacity", &self.capacity)
            .field("alignment", &self.align)
            .field("used", &self.used())
            .field("generation", &self.generation())
            .finish()
    }
}
