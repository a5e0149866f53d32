//! Reference-counted media buffer handles.
//!
//! A [`MediaBuffer`] is a shared handle to one pool-managed (or standalone)
//! memory block plus metadata: capacity, producer-set valid size, a user
//! flag bitmask, and a self-describing [`SampleFormat`]. Cloning a handle is
//! an `Arc` increment; the backing block is reclaimed exactly once, when the
//! last share is released, by whichever thread causes the count to reach
//! zero.
//!
//! Ownership is shared-read/exclusive-fill: the producer fills the payload
//! while it holds the only handle, then any number of consumers may read
//! concurrently. The write path enforces this through sole-owner checks.

use crate::error::{Error, Result};
use crate::format::SampleFormat;
use crate::memory::{HeapSegment, MemorySegment, MemoryType, SharedSegment};
use std::os::unix::io::RawFd;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock, Weak};

/// Well-known bits of the user flag bitmask.
///
/// The mask is otherwise uninterpreted by the engine; stages agree on
/// additional bits out of band.
pub mod flags {
    /// Buffer holds a key frame (sync point).
    pub const KEY_FRAME: u32 = 1 << 0;
    /// Buffer marks end of stream.
    pub const EOS: u32 = 1 << 1;
    /// Buffer payload is known to be corrupted or incomplete.
    pub const CORRUPTED: u32 = 1 << 2;
}

/// Shared state behind every handle to one block.
struct BufferInner {
    /// Backing segment; keeps the memory alive even after the owning pool
    /// is destroyed.
    segment: Arc<dyn MemorySegment>,
    /// Offset of this block within the segment.
    offset: usize,
    /// Total block capacity in bytes.
    capacity: usize,
    /// Bytes actually filled by the producer.
    valid_size: AtomicUsize,
    /// User flag bitmask (see [`flags`]).
    flags: AtomicU32,
    /// Payload format, set once by the producer.
    format: OnceLock<SampleFormat>,
    /// Owning pool's bookkeeping; `Weak` so the pool may die first.
    pool: Weak<crate::memory::PoolCore>,
    /// Block index within the pool.
    slot: usize,
}

impl Drop for BufferInner {
    fn drop(&mut self) {
        // Last share released: return the block to the pool's free set.
        // If the pool is already gone this is a no-op and the segment Arc
        // frees the memory.
        if let Some(core) = self.pool.upgrade() {
            core.release(self.slot);
        }
    }
}

/// A shared handle to one memory block plus metadata.
///
/// See the [module docs](self) for the ownership model.
#[derive(Clone)]
pub struct MediaBuffer {
    /// `None` after an explicit [`reset`](MediaBuffer::reset).
    inner: Option<Arc<BufferInner>>,
}

impl MediaBuffer {
    /// Create a handle for a pool block. Called by the pool only.
    pub(crate) fn from_pool(
        segment: Arc<dyn MemorySegment>,
        offset: usize,
        capacity: usize,
        pool: Weak<crate::memory::PoolCore>,
        slot: usize,
    ) -> Self {
        Self {
            inner: Some(Arc::new(BufferInner {
                segment,
                offset,
                capacity,
                valid_size: AtomicUsize::new(0),
                flags: AtomicU32::new(0),
                format: OnceLock::new(),
                pool,
                slot,
            })),
        }
    }

    /// Allocate a standalone buffer outside any pool.
    ///
    /// When the last handle is released the memory is simply freed.
    ///
    /// # Errors
    ///
    /// Returns an error if `size` is 0 or allocation fails.
    pub fn alloc(size: usize, memory_type: MemoryType) -> Result<Self> {
        let segment: Arc<dyn MemorySegment> = match memory_type {
            MemoryType::Heap => Arc::new(HeapSegment::new(size)?),
            MemoryType::DmaShared => Arc::new(SharedSegment::new("mediaflow-buf", size)?),
        };
        Ok(Self {
            inner: Some(Arc::new(BufferInner {
                segment,
                offset: 0,
                capacity: size,
                valid_size: AtomicUsize::new(0),
                flags: AtomicU32::new(0),
                format: OnceLock::new(),
                pool: Weak::new(),
                slot: 0,
            })),
        })
    }

    /// Drop this handle's share immediately, without waiting for the
    /// handle's own destruction.
    ///
    /// Other clones of the handle keep working; the block is reclaimed only
    /// when the share count reaches zero. After `reset` this handle reads
    /// as empty and rejects writes.
    pub fn reset(&mut self) {
        self.inner = None;
    }

    /// Whether this handle's share was already released.
    pub fn is_released(&self) -> bool {
        self.inner.is_none()
    }

    /// Number of live shares of the block, 0 for a released handle.
    pub fn ref_count(&self) -> usize {
        self.inner.as_ref().map_or(0, Arc::strong_count)
    }

    /// Total block capacity in bytes (0 for a released handle).
    pub fn capacity(&self) -> usize {
        self.inner.as_ref().map_or(0, |i| i.capacity)
    }

    /// Bytes filled by the producer (0 for a released handle).
    pub fn valid_size(&self) -> usize {
        self.inner
            .as_ref()
            .map_or(0, |i| i.valid_size.load(Ordering::Acquire))
    }

    /// Set the number of valid payload bytes.
    ///
    /// # Errors
    ///
    /// Fails if `size` exceeds the capacity or the handle was released.
    pub fn set_valid_size(&self, size: usize) -> Result<()> {
        let inner = self.inner.as_ref().ok_or(Error::BufferReleased)?;
        if size > inner.capacity {
            return Err(Error::SizeExceedsCapacity {
                size,
                capacity: inner.capacity,
            });
        }
        inner.valid_size.store(size, Ordering::Release);
        Ok(())
    }

    /// The user flag bitmask.
    pub fn user_flags(&self) -> u32 {
        self.inner
            .as_ref()
            .map_or(0, |i| i.flags.load(Ordering::Acquire))
    }

    /// Replace the user flag bitmask.
    pub fn set_user_flags(&self, mask: u32) {
        if let Some(inner) = &self.inner {
            inner.flags.store(mask, Ordering::Release);
        }
    }

    /// Check whether all bits of `mask` are set.
    pub fn has_flags(&self, mask: u32) -> bool {
        self.user_flags() & mask == mask
    }

    /// The payload format, `Raw` if the producer never set one.
    pub fn format(&self) -> SampleFormat {
        self.inner
            .as_ref()
            .and_then(|i| i.format.get().copied())
            .unwrap_or_default()
    }

    /// Tag the payload format. First call wins; later calls fail.
    ///
    /// # Errors
    ///
    /// Fails if the format was already set or the handle was released.
    pub fn set_format(&self, format: SampleFormat) -> Result<()> {
        let inner = self.inner.as_ref().ok_or(Error::BufferReleased)?;
        inner
            .format
            .set(format)
            .map_err(|_| Error::InvalidState("buffer format already set"))
    }

    /// Memory type of the backing block.
    pub fn memory_type(&self) -> MemoryType {
        self.inner
            .as_ref()
            .map_or(MemoryType::Heap, |i| i.segment.memory_type())
    }

    /// File-descriptor alias of the backing memory, if the memory type has
    /// one. The fd and the pointer stay consistent for the block's entire
    /// lifetime; a consumer may use either accessor.
    pub fn fd(&self) -> Option<RawFd> {
        self.inner.as_ref().and_then(|i| i.segment.fd())
    }

    /// Raw pointer to the start of the block.
    ///
    /// Dangling-safe: a released handle returns a pointer to an empty
    /// slice's base via [`as_slice`](MediaBuffer::as_slice) instead; this
    /// accessor returns null for released handles.
    pub fn as_ptr(&self) -> *const u8 {
        self.inner.as_ref().map_or(std::ptr::null(), |i| unsafe {
            i.segment.as_ptr().add(i.offset)
        })
    }

    /// The valid payload as a byte slice (empty for a released handle).
    pub fn as_slice(&self) -> &[u8] {
        match &self.inner {
            Some(inner) => {
                let len = inner.valid_size.load(Ordering::Acquire);
                unsafe {
                    std::slice::from_raw_parts(inner.segment.as_ptr().add(inner.offset), len)
                }
            }
            None => &[],
        }
    }

    /// Exclusive-fill access to the whole block.
    ///
    /// Returns `None` unless this is the sole live handle, enforcing the
    /// one-writer-at-creation rule, or if the backing memory is read-only.
    pub fn as_mut_slice(&mut self) -> Option<&mut [u8]> {
        let arc = self.inner.as_mut()?;
        let inner = Arc::get_mut(arc)?;
        let ptr = inner.segment.as_mut_ptr()?;
        // SAFETY: sole handle (checked via get_mut) and the pool never
        // hands out overlapping blocks.
        Some(unsafe {
            std::slice::from_raw_parts_mut(ptr.add(inner.offset), inner.capacity)
        })
    }

    /// Copy `data` into the block and set the valid size accordingly.
    ///
    /// # Errors
    ///
    /// Fails if `data` exceeds the capacity, the handle was released, or
    /// this is not the sole live handle.
    pub fn fill(&mut self, data: &[u8]) -> Result<()> {
        let capacity = self.capacity();
        if self.is_released() {
            return Err(Error::BufferReleased);
        }
        if data.len() > capacity {
            return Err(Error::SizeExceedsCapacity {
                size: data.len(),
                capacity,
            });
        }
        let slice = self
            .as_mut_slice()
            .ok_or(Error::InvalidState("buffer is shared, cannot fill"))?;
        slice[..data.len()].copy_from_slice(data);
        self.set_valid_size(data.len())
    }
}

impl std::fmt::Debug for MediaBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaBuffer")
            .field("capacity", &self.capacity())
            .field("valid_size", &self.valid_size())
            .field("flags", &format_args!("{:#x}", self.user_flags()))
            .field("format", &self.format())
            .field("memory_type", &self.memory_type())
            .field("ref_count", &self.ref_count())
            .finish()
    }
}
