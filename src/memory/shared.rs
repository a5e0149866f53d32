//! memfd-backed memory segment with a file-descriptor alias.
//!
//! Hardware and DMA consumers on Linux commonly import buffers by file
//! descriptor. A `SharedSegment` is anonymous shared memory created via
//! `memfd_create` and `mmap`: the mapped pointer and the fd refer to the
//! same pages for the segment's entire lifetime.

use super::{MemorySegment, MemoryType};
use crate::error::{Error, Result};
use rustix::fd::OwnedFd;
use rustix::mm::{MapFlags, ProtFlags};
use std::ffi::CString;
use std::os::unix::io::{AsRawFd, RawFd};
use std::ptr::NonNull;

/// A memory segment backed by an anonymous memfd.
pub struct SharedSegment {
    /// The memfd file descriptor.
    fd: OwnedFd,
    /// Pointer to the mmap'd region.
    ptr: NonNull<u8>,
    /// Size of the segment.
    len: usize,
}

impl SharedSegment {
    /// Create a new shared segment.
    ///
    /// `name` is a debug label visible in `/proc/self/fd/`.
    ///
    /// # Errors
    ///
    /// Returns an error if `size` is 0 or if `memfd_create`, `ftruncate`,
    /// or `mmap` fails.
    pub fn new(name: &str, size: usize) -> Result<Self> {
        if size == 0 {
            return Err(Error::AllocationFailed(
                "size must be greater than 0".into(),
            ));
        }

        let cname = CString::new(name).map_err(|e| Error::AllocationFailed(e.to_string()))?;
        let fd = rustix::fs::memfd_create(&cname, rustix::fs::MemfdFlags::CLOEXEC)?;
        rustix::fs::ftruncate(&fd, size as u64)?;

        let ptr = unsafe {
            rustix::mm::mmap(
                std::ptr::null_mut(),
                size,
                ProtFlags::READ | ProtFlags::WRITE,
                MapFlags::SHARED,
                &fd,
                0,
            )?
        };
        let ptr = NonNull::new(ptr.cast::<u8>())
            .ok_or_else(|| Error::AllocationFailed("mmap returned null".into()))?;

        Ok(Self { fd, ptr, len: size })
    }
}

impl MemorySegment for SharedSegment {
    fn as_ptr(&self) -> *const u8 {
        self.ptr.as_ptr()
    }

    fn as_mut_ptr(&self) -> Option<*mut u8> {
        Some(self.ptr.as_ptr())
    }

    fn len(&self) -> usize {
        self.len
    }

    fn memory_type(&self) -> MemoryType {
        MemoryType::DmaShared
    }

    fn fd(&self) -> Option<RawFd> {
        Some(self.fd.as_raw_fd())
    }
}

impl Drop for SharedSegment {
    fn drop(&mut self) {
        unsafe {
            let _ = rustix::mm::munmap(self.ptr.as_ptr().cast(), self.len);
        }
        // fd closes with OwnedFd
    }
}

// SAFETY: the mapping is valid process-wide and the fd is kernel
// reference-counted; no thread-local state is held.
unsafe impl Send for SharedSegment {}
unsafe impl Sync for SharedSegment {}
