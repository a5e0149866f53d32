//! The pluggable transformation stage driven by a flow.

use crate::buffer::MediaBuffer;
use crate::error::Result;
use crate::format::FormatKind;

/// Out-of-band control request for a filter.
///
/// A closed, typed set replaces the untyped request-code/argument call of
/// classic media middlewares: the contract stays narrow and synchronous,
/// but every request and reply is a real type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterControl {
    /// Enable or disable the transform.
    SetEnabled(bool),
    /// Query whether the transform is enabled.
    GetEnabled,
    /// Set a numeric parameter by well-known id.
    SetParam {
        /// Parameter id, agreed between the filter and its controller.
        id: u32,
        /// New value.
        value: i64,
    },
    /// Get a numeric parameter by well-known id.
    GetParam {
        /// Parameter id.
        id: u32,
    },
}

/// Reply to a [`FilterControl`] request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlReply {
    /// Request applied, nothing to report.
    Ack,
    /// Reply to `GetEnabled`.
    Enabled(bool),
    /// Reply to `GetParam`.
    Param(i64),
}

/// A pure transformation stage.
///
/// A filter consumes the inputs it is given and produces at most one output
/// buffer (or forwards an input unchanged). It must not retain buffers
/// beyond the call unless it explicitly clones a handle to take shared
/// ownership (e.g. to batch).
///
/// Input validation: the owning flow checks each buffer's coarse
/// [`FormatKind`] against [`accepts`](Filter::accepts) before invoking
/// `process`; filters validate anything finer themselves and fail with
/// [`Error::FormatMismatch`](crate::error::Error::FormatMismatch) on
/// disagreement, producing no output.
pub trait Filter: Send {
    /// Coarse format class this filter accepts. Default: anything.
    fn accepts(&self) -> FormatKind {
        FormatKind::Any
    }

    /// Process the current input vector, one entry per slot.
    ///
    /// Entries are `None` for slots with no pending data. Take the inputs
    /// consumed (`Option::take`); return the produced buffer, `None` for
    /// pass-nothing, or an error for malformed input.
    fn process(&mut self, inputs: &mut [Option<MediaBuffer>]) -> Result<Option<MediaBuffer>>;

    /// Synchronous out-of-band control. Unknown requests fail without side
    /// effects.
    fn control(&mut self, _req: FilterControl) -> Result<ControlReply> {
        Err(crate::error::Error::UnsupportedControl)
    }

    /// Name for logging and diagnostics.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}
