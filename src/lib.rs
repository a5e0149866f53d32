//! # Mediaflow
//!
//! A media middleware core: loaned buffers over reusable memory pools,
//! and flow graphs of filters with per-slot backpressure.
//!
//! The two halves:
//!
//! - **Memory**: [`memory::BufferPool`] carves a single segment (heap or
//!   file-descriptor-backed shared memory) into fixed-size blocks and
//!   loans them out as refcounted [`buffer::MediaBuffer`] handles. A
//!   dropped handle returns its block to the pool automatically.
//! - **Flows**: [`flow::Flow`] nodes wrap a [`filter::Filter`] (or a raw
//!   callback), accept buffers on bounded input slots, and fan produced
//!   buffers out to downstream nodes. Full slots drop or block per
//!   policy; nothing grows without bound.
//!
//! ## Quick Start
//!
//! ```rust
//! use mediaflow::flow::{Flow, FlowConfig, SlotConfig};
//! use mediaflow::filters::PassThrough;
//! use mediaflow::memory::{BufferPool, MemoryType};
//!
//! # fn main() -> mediaflow::Result<()> {
//! let pool = BufferPool::new(4, 4096, MemoryType::Heap)?;
//!
//! let config = FlowConfig::uniform(1, SlotConfig::default());
//! let flow = Flow::new("stage", config, Box::new(PassThrough::new()))?;
//! flow.start()?;
//!
//! if let Some(mut buf) = pool.get_buffer() {
//!     buf.fill(b"frame")?;
//!     flow.send_input(0, buf)?;
//! }
//!
//! flow.stop();
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_op_in_unsafe_fn)]

pub mod buffer;
pub mod change;
pub mod error;
pub mod filter;
pub mod filters;
pub mod flow;
pub mod format;
pub mod memory;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::buffer::MediaBuffer;
    pub use crate::change::{ChangeKind, ChangeQueue, ChangeRequest};
    pub use crate::error::{Error, Result};
    pub use crate::filter::{ControlReply, Filter, FilterControl};
    pub use crate::flow::{Flow, FlowConfig, FlowState, FullPolicy, ScheduleMode, SlotConfig};
    pub use crate::format::{FormatKind, SampleFormat};
    pub use crate::memory::{BufferPool, MemorySegment, MemoryType};
}

pub use error::{Error, Result};
