//! Error types for mediaflow.

use crate::format::FormatKind;
use thiserror::Error;

/// Result type alias using mediaflow's Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for mediaflow operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Memory allocation failed.
    #[error("memory allocation failed: {0}")]
    AllocationFailed(String),

    /// Bad configuration at construction time.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Input slot index out of range for this flow.
    #[error("input slot {slot} out of range (flow has {count} slots)")]
    InvalidSlot {
        /// The requested slot index.
        slot: usize,
        /// Number of slots the flow actually has.
        count: usize,
    },

    /// Requested valid size exceeds the buffer's capacity.
    #[error("valid size {size} exceeds buffer capacity {capacity}")]
    SizeExceedsCapacity {
        /// The requested valid size.
        size: usize,
        /// The buffer's total capacity.
        capacity: usize,
    },

    /// A filter was handed a buffer whose format it does not accept.
    #[error("format mismatch: filter accepts {expected:?}, buffer is {actual:?}")]
    FormatMismatch {
        /// The format kind the filter accepts.
        expected: FormatKind,
        /// The format kind the buffer carries.
        actual: FormatKind,
    },

    /// Control request not understood by this filter.
    #[error("unsupported control request")]
    UnsupportedControl,

    /// Operation not valid in the current flow state.
    #[error("invalid state: {0}")]
    InvalidState(&'static str),

    /// Operation on a handle whose share was already released.
    #[error("buffer handle already released")]
    BufferReleased,

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// System call error (via rustix).
    #[error("system error: {0}")]
    System(#[from] rustix::io::Errno),
}
