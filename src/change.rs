//! Runtime parameter hot-reload mailbox.
//!
//! Stateful stages (an active encoder, typically) drain a [`ChangeQueue`]
//! from their own processing loop between buffer submissions, so parameters
//! change without pausing the data path.

use std::collections::VecDeque;
use std::sync::Mutex;

/// Kind of a pending parameter change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    /// Sentinel: nothing pending. Returned by an empty queue's poll.
    None,
    /// Target bitrate.
    Bitrate,
    /// Output frame rate.
    FrameRate,
    /// GOP structure.
    Gop,
    /// Output resolution.
    Resolution,
    /// Quality/QP setting.
    Quality,
    /// Force the next frame to be an IDR.
    ForceIdr,
}

/// One pending change: a kind plus an opaque parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeRequest<P> {
    /// What is changing.
    pub kind: ChangeKind,
    /// The new value; `None` for kinds that carry no payload and for the
    /// sentinel.
    pub param: Option<P>,
}

impl<P> ChangeRequest<P> {
    /// The "no change" sentinel.
    pub fn none() -> Self {
        Self {
            kind: ChangeKind::None,
            param: None,
        }
    }

    /// Whether this is the sentinel.
    pub fn is_none(&self) -> bool {
        self.kind == ChangeKind::None
    }
}

/// Thread-safe FIFO mailbox of pending parameter changes.
///
/// Insertion order is preserved; entries are consumed one per poll, never
/// re-ordered or coalesced. Two requests of the same kind are delivered
/// independently, so producers must not spam redundant requests if only
/// the latest should win.
///
/// # Example
///
/// ```rust
/// use mediaflow::change::{ChangeKind, ChangeQueue};
///
/// let q: ChangeQueue<i64> = ChangeQueue::new();
/// q.request_change(ChangeKind::Bitrate, Some(2_000_000));
/// q.request_change(ChangeKind::ForceIdr, None);
///
/// assert_eq!(q.peek_change().kind, ChangeKind::Bitrate);
/// assert_eq!(q.peek_change().kind, ChangeKind::ForceIdr);
/// assert!(q.peek_change().is_none()); // sentinel, not a failure
/// ```
pub struct ChangeQueue<P> {
    queue: Mutex<VecDeque<ChangeRequest<P>>>,
}

impl<P> ChangeQueue<P> {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
        }
    }

    /// Append a change request. Never blocks on the consumer; the lock is
    /// held only for the push.
    pub fn request_change(&self, kind: ChangeKind, param: Option<P>) {
        debug_assert!(kind != ChangeKind::None, "sentinel kind is not a request");
        self.queue
            .lock()
            .expect("change queue poisoned")
            .push_back(ChangeRequest { kind, param });
    }

    /// Pop the oldest pending change, or the sentinel if the queue is
    /// empty, so a draining loop can poll unconditionally every cycle.
    pub fn peek_change(&self) -> ChangeRequest<P> {
        self.queue
            .lock()
            .expect("change queue poisoned")
            .pop_front()
            .unwrap_or_else(ChangeRequest::none)
    }

    /// Number of pending changes.
    pub fn len(&self) -> usize {
        self.queue.lock().expect("change queue poisoned").len()
    }

    /// Whether no changes are pending.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<P> Default for ChangeQueue<P> {
    fn default() -> Self {
        Self::new()
    }
}
