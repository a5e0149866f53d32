//! Memory backends and the fixed-capacity buffer pool.
//!
//! - [`MemorySegment`]: trait for memory backends (heap, memfd-shared)
//! - [`BufferPool`]: fixed-capacity allocator/reclaimer of fixed-size blocks
//!
//! # Example
//!
//! ```rust
//! use mediaflow::memory::{BufferPool, MemoryType};
//!
//! let pool = BufferPool::new(10, 1024, MemoryType::Heap).unwrap();
//! let mut buf = pool.get_buffer().expect("free block");
//! buf.as_mut_slice().unwrap()[..5].copy_from_slice(b"hello");
//! buf.set_valid_size(5).unwrap();
//! ```

mod heap;
mod pool;
mod segment;
mod shared;

pub(crate) use pool::PoolCore;

pub use heap::HeapSegment;
pub use pool::{BufferPool, PoolInfo};
pub use segment::{MemorySegment, MemoryType};
pub use shared::SharedSegment;
