//! Memory segment trait and types.

use std::os::unix::io::RawFd;

/// Type of memory backing a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemoryType {
    /// Plain process-private heap memory.
    Heap,
    /// memfd-backed memory with a file-descriptor alias, suitable for
    /// hardware/DMA consumers that import buffers by fd.
    DmaShared,
}

impl MemoryType {
    /// Whether blocks of this type expose a file-descriptor alias.
    #[inline]
    pub fn has_fd(&self) -> bool {
        matches!(self, MemoryType::DmaShared)
    }
}

impl std::str::FromStr for MemoryType {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> crate::error::Result<Self> {
        match s {
            "heap" => Ok(MemoryType::Heap),
            "dma" | "dma-shared" => Ok(MemoryType::DmaShared),
            other => Err(crate::error::Error::InvalidConfig(format!(
                "unknown memory type: {other}"
            ))),
        }
    }
}

/// Trait for memory segment backends.
///
/// A segment is a contiguous region of memory used as backing storage for
/// pool blocks or standalone buffers. The pointer (and fd, when present)
/// must stay valid and mutually consistent for the segment's entire
/// lifetime, so a consumer may choose either accessor without
/// re-synchronization.
///
/// # Safety
///
/// Implementations must keep the returned pointer valid for the lifetime of
/// the segment and must be `Send + Sync`.
pub trait MemorySegment: Send + Sync {
    /// Raw pointer to the start of this segment.
    fn as_ptr(&self) -> *const u8;

    /// Mutable pointer to the start of this segment.
    ///
    /// Returns `None` if the backing memory is read-only.
    fn as_mut_ptr(&self) -> Option<*mut u8>;

    /// Total size of the segment in bytes.
    fn len(&self) -> usize;

    /// Returns true if the segment has zero length.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The type of memory backing this segment.
    fn memory_type(&self) -> MemoryType;

    /// File-descriptor alias for this segment's memory.
    ///
    /// Returns `None` for memory types without one (plain heap).
    fn fd(&self) -> Option<RawFd>;
}
