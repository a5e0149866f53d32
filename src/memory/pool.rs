//! Fixed-capacity buffer pool with automatic reclamation.

use super::{HeapSegment, MemorySegment, MemoryType, SharedSegment};
use crate::buffer::MediaBuffer;
use crate::error::{Error, Result};
use crate::flow::config::ParamMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Shared pool bookkeeping: the free-list and the outstanding counter are
/// the only mutable state requiring synchronization.
///
/// Buffers hold a `Weak` back-reference to this; the pool itself holds the
/// only strong one. Dropping the pool with buffers outstanding is allowed:
/// each buffer keeps the backing segment alive through its own `Arc`, and
/// releases after the pool is gone simply become no-ops.
pub(crate) struct PoolCore {
    free: Mutex<Vec<usize>>,
    outstanding: AtomicUsize,
}

impl PoolCore {
    fn new(capacity: usize) -> Self {
        // LIFO free-list: most-recently-released block is handed out next,
        // which keeps hot blocks in cache.
        Self {
            free: Mutex::new((0..capacity).rev().collect()),
            outstanding: AtomicUsize::new(0),
        }
    }

    fn acquire(&self) -> Option<usize> {
        let idx = self.free.lock().expect("pool free-list poisoned").pop()?;
        self.outstanding.fetch_add(1, Ordering::Relaxed);
        Some(idx)
    }

    pub(crate) fn release(&self, idx: usize) {
        self.free.lock().expect("pool free-list poisoned").push(idx);
        self.outstanding.fetch_sub(1, Ordering::Relaxed);
    }

    fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::Relaxed)
    }
}

/// Diagnostic snapshot of a pool's state.
///
/// Observability only; values may be stale the instant they are read and
/// must never drive control flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolInfo {
    /// Maximum number of concurrently outstanding blocks.
    pub capacity: usize,
    /// Blocks currently handed out.
    pub outstanding: usize,
    /// Size of each block in bytes.
    pub block_size: usize,
    /// Memory type of the backing segment.
    pub memory_type: MemoryType,
}

impl std::fmt::Display for PoolInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "pool {:?}: {}/{} blocks outstanding, {} bytes each",
            self.memory_type, self.outstanding, self.capacity, self.block_size
        )
    }
}

/// A fixed-capacity allocator/reclaimer of reusable fixed-size blocks.
///
/// `get_buffer()` hands out [`MediaBuffer`] handles; the backing block
/// returns to the free set automatically when the last handle is released,
/// from whichever thread causes the count to reach zero. The pool never
/// blocks and never grows: exhaustion is signaled as `None` so a live
/// producer can skip a frame instead of stalling.
///
/// # Example
///
/// ```rust
/// use mediaflow::memory::{BufferPool, MemoryType};
///
/// let pool = BufferPool::new(4, 1024, MemoryType::Heap).unwrap();
/// let buf = pool.get_buffer().expect("pool has free blocks");
/// assert_eq!(buf.capacity(), 1024);
/// drop(buf); // block returns to the pool
/// assert_eq!(pool.dump_info().outstanding, 0);
/// ```
pub struct BufferPool {
    segment: Arc<dyn MemorySegment>,
    core: Arc<PoolCore>,
    block_size: usize,
    capacity: usize,
}

impl BufferPool {
    /// Create a pool of `capacity` blocks of `block_size` bytes each.
    ///
    /// # Errors
    ///
    /// Returns an error if `capacity` or `block_size` is 0, or if the
    /// backing segment cannot be allocated.
    pub fn new(capacity: usize, block_size: usize, memory_type: MemoryType) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::InvalidConfig("pool capacity must be > 0".into()));
        }
        if block_size == 0 {
            return Err(Error::InvalidConfig("block size must be > 0".into()));
        }

        let total = capacity
            .checked_mul(block_size)
            .ok_or_else(|| Error::InvalidConfig("pool size overflows".into()))?;

        let segment: Arc<dyn MemorySegment> = match memory_type {
            MemoryType::Heap => Arc::new(HeapSegment::new(total)?),
            MemoryType::DmaShared => Arc::new(SharedSegment::new("mediaflow-pool", total)?),
        };

        Ok(Self {
            segment,
            core: Arc::new(PoolCore::new(capacity)),
            block_size,
            capacity,
        })
    }

    /// Create a pool from a parameter map.
    ///
    /// Recognized keys: `capacity` (required), `block-size` (required),
    /// `memory-type` (`heap` | `dma`, default `heap`). Unrecognized keys
    /// are ignored.
    pub fn from_params(params: &ParamMap) -> Result<Self> {
        let capacity = params
            .get("capacity")
            .and_then(|v| v.as_u64())
            .ok_or_else(|| Error::InvalidConfig("missing required key: capacity".into()))?;
        let block_size = params
            .get("block-size")
            .and_then(|v| v.as_u64())
            .ok_or_else(|| Error::InvalidConfig("missing required key: block-size".into()))?;
        let memory_type = match params.get("memory-type").and_then(|v| v.as_str()) {
            Some(s) => s.parse()?,
            None => MemoryType::Heap,
        };
        Self::new(capacity as usize, block_size as usize, memory_type)
    }

    /// Hand out a free block as a shared buffer handle.
    ///
    /// Returns `None` when all blocks are outstanding. Safe to call from
    /// multiple threads; no two callers are ever handed overlapping memory.
    pub fn get_buffer(&self) -> Option<MediaBuffer> {
        let Some(idx) = self.core.acquire() else {
            tracing::debug!(
                capacity = self.capacity,
                block_size = self.block_size,
                "pool exhausted"
            );
            return None;
        };

        Some(MediaBuffer::from_pool(
            Arc::clone(&self.segment),
            idx * self.block_size,
            self.block_size,
            Arc::downgrade(&self.core),
            idx,
        ))
    }

    /// Diagnostic snapshot; no side effects.
    pub fn dump_info(&self) -> PoolInfo {
        PoolInfo {
            capacity: self.capacity,
            outstanding: self.core.outstanding(),
            block_size: self.block_size,
            memory_type: self.segment.memory_type(),
        }
    }

    /// Maximum number of concurrently outstanding blocks.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Size of each block in bytes.
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Memory type of the backing segment.
    pub fn memory_type(&self) -> MemoryType {
        self.segment.memory_type()
    }
}
