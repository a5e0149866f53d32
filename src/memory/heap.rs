//! Heap-backed memory segment.

use super::{MemorySegment, MemoryType};
use crate::error::{Error, Result};
use std::os::unix::io::RawFd;

/// A memory segment backed by a plain heap allocation.
///
/// The simplest backend: process-private, no fd alias. Suitable for
/// software-only pipeline segments.
pub struct HeapSegment {
    /// Boxed slice keeps the allocation contiguous and un-movable.
    data: Box<[u8]>,
}

impl HeapSegment {
    /// Create a new zero-initialized heap segment.
    ///
    /// # Errors
    ///
    /// Returns an error if `size` is 0.
    pub fn new(size: usize) -> Result<Self> {
        if size == 0 {
            return Err(Error::AllocationFailed(
                "size must be greater than 0".into(),
            ));
        }
        Ok(Self {
            data: vec![0u8; size].into_boxed_slice(),
        })
    }
}

impl MemorySegment for HeapSegment {
    fn as_ptr(&self) -> *const u8 {
        self.data.as_ptr()
    }

    fn as_mut_ptr(&self) -> Option<*mut u8> {
        // Exclusive ownership of the allocation; HeapSegment is not Clone.
        Some(self.data.as_ptr() as *mut u8)
    }

    fn len(&self) -> usize {
        self.data.len()
    }

    fn memory_type(&self) -> MemoryType {
        MemoryType::Heap
    }

    fn fd(&self) -> Option<RawFd> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heap_segment_creation() {
        let segment = HeapSegment::new(1024).unwrap();
        assert_eq!(segment.len(), 1024);
        assert_eq!(segment.memory_type(), MemoryType::Heap);
        assert!(segment.fd().is_none());
    }

    #[test]
    fn test_heap_segment_zero_size_fails() {
        assert!(HeapSegment::new(0).is_err());
    }

    #[test]
    fn test_heap_segment_is_zeroed() {
        let segment = HeapSegment::new(256).unwrap();
        let slice = unsafe { std::slice::from_raw_parts(segment.as_ptr(), segment.len()) };
        assert!(slice.iter().all(|&b| b == 0));
    }
}
