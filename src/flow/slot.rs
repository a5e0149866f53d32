//! Bounded input slot queues and admission policies.

use crate::buffer::MediaBuffer;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Condvar, Mutex};
use std::time::Duration;

/// Policy applied when a slot's queue is at its configured maximum and a
/// new buffer arrives. Exactly one buffer is discarded, or the caller is
/// blocked; never silent unbounded growth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FullPolicy {
    /// Discard the newly arriving buffer; the queue is left unchanged.
    /// The common live-capture policy: already-queued data stays fresh.
    DropIncoming,
    /// Discard the oldest queued buffer and admit the new one.
    DropOldest,
    /// Block the submitting caller until space frees up.
    Block,
}

/// Outcome of submitting a buffer to a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Buffer queued normally.
    Queued,
    /// Queue was full; the incoming buffer was discarded.
    DroppedIncoming,
    /// Queue was full; the oldest buffer was discarded to admit this one.
    DroppedOldest,
    /// Slot is not accepting buffers (flow not running).
    Rejected,
}

/// Per-slot configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotConfig {
    /// Maximum number of queued buffers.
    pub max_cache: usize,
    /// What to do when the queue is full.
    pub policy: FullPolicy,
}

impl SlotConfig {
    /// Create a slot config.
    pub fn new(max_cache: usize, policy: FullPolicy) -> Self {
        Self { max_cache, policy }
    }
}

impl Default for SlotConfig {
    fn default() -> Self {
        Self {
            max_cache: 2,
            policy: FullPolicy::DropIncoming,
        }
    }
}

/// A bounded queue of pending buffers for one logical input.
pub(crate) struct SlotQueue {
    queue: Mutex<VecDeque<MediaBuffer>>,
    /// Consumers wait here for data.
    data_cv: Condvar,
    /// Block-policy producers wait here for space.
    space_cv: Condvar,
    config: SlotConfig,
    closed: AtomicBool,
    dropped: AtomicU64,
}

impl SlotQueue {
    pub(crate) fn new(config: SlotConfig) -> Self {
        Self {
            queue: Mutex::new(VecDeque::with_capacity(config.max_cache)),
            data_cv: Condvar::new(),
            space_cv: Condvar::new(),
            config,
            closed: AtomicBool::new(true),
            dropped: AtomicU64::new(0),
        }
    }

    /// Submit a buffer, applying the full-policy at the bound.
    pub(crate) fn push(&self, buf: MediaBuffer) -> Admission {
        if self.closed.load(Ordering::Acquire) {
            return Admission::Rejected;
        }

        let mut queue = self.queue.lock().expect("slot queue poisoned");
        if queue.len() >= self.config.max_cache {
            match self.config.policy {
                FullPolicy::DropIncoming => {
                    self.dropped.fetch_add(1, Ordering::Relaxed);
                    return Admission::DroppedIncoming;
                }
                FullPolicy::DropOldest => {
                    queue.pop_front();
                    self.dropped.fetch_add(1, Ordering::Relaxed);
                    queue.push_back(buf);
                    self.data_cv.notify_one();
                    return Admission::DroppedOldest;
                }
                FullPolicy::Block => {
                    while queue.len() >= self.config.max_cache
                        && !self.closed.load(Ordering::Acquire)
                    {
                        queue = self.space_cv.wait(queue).expect("slot queue poisoned");
                    }
                    if self.closed.load(Ordering::Acquire) {
                        return Admission::Rejected;
                    }
                }
            }
        }

        queue.push_back(buf);
        self.data_cv.notify_one();
        Admission::Queued
    }

    /// Pop the oldest pending buffer, waiting up to `timeout` for data.
    pub(crate) fn pop_timeout(&self, timeout: Duration) -> Option<MediaBuffer> {
        let mut queue = self.queue.lock().expect("slot queue poisoned");
        if queue.is_empty() {
            let (guard, _) = self
                .data_cv
                .wait_timeout(queue, timeout)
                .expect("slot queue poisoned");
            queue = guard;
        }
        let buf = queue.pop_front();
        if buf.is_some() {
            self.space_cv.notify_one();
        }
        buf
    }

    /// Pop the oldest pending buffer without waiting.
    pub(crate) fn try_pop(&self) -> Option<MediaBuffer> {
        let buf = self
            .queue
            .lock()
            .expect("slot queue poisoned")
            .pop_front();
        if buf.is_some() {
            self.space_cv.notify_one();
        }
        buf
    }

    /// Number of pending buffers.
    pub(crate) fn len(&self) -> usize {
        self.queue.lock().expect("slot queue poisoned").len()
    }

    /// Discard all pending buffers.
    pub(crate) fn clear(&self) {
        self.queue.lock().expect("slot queue poisoned").clear();
        self.space_cv.notify_all();
    }

    /// Stop admitting buffers and wake all waiters.
    pub(crate) fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.data_cv.notify_all();
        self.space_cv.notify_all();
    }

    /// Start admitting buffers again.
    pub(crate) fn reopen(&self) {
        self.closed.store(false, Ordering::Release);
    }

    /// Buffers discarded by the full-policy since creation.
    pub(crate) fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryType;
    use std::sync::Arc;
    use std::thread;

    fn buf(tag: u8) -> MediaBuffer {
        let mut b = MediaBuffer::alloc(8, MemoryType::Heap).unwrap();
        b.fill(&[tag]).unwrap();
        b
    }

    fn open_slot(config: SlotConfig) -> SlotQueue {
        let q = SlotQueue::new(config);
        q.reopen();
        q
    }

    #[test]
    fn test_drop_incoming_keeps_queue_unchanged() {
        let q = open_slot(SlotConfig::new(3, FullPolicy::DropIncoming));
        for tag in 0..3 {
            assert_eq!(q.push(buf(tag)), Admission::Queued);
        }
        // N+1-th submission: the newest is discarded, queue keeps the
        // original N in original order.
        assert_eq!(q.push(buf(9)), Admission::DroppedIncoming);
        assert_eq!(q.len(), 3);
        for tag in 0..3 {
            assert_eq!(q.try_pop().unwrap().as_slice(), &[tag]);
        }
        assert_eq!(q.dropped(), 1);
    }

    #[test]
    fn test_drop_oldest_admits_newest() {
        let q = open_slot(SlotConfig::new(1, FullPolicy::DropOldest));
        assert_eq!(q.push(buf(1)), Admission::Queued);
        assert_eq!(q.push(buf(2)), Admission::DroppedOldest);
        assert_eq!(q.len(), 1);
        assert_eq!(q.try_pop().unwrap().as_slice(), &[2]);
    }

    #[test]
    fn test_block_policy_waits_for_space() {
        let q = Arc::new(open_slot(SlotConfig::new(1, FullPolicy::Block)));
        assert_eq!(q.push(buf(1)), Admission::Queued);

        let q2 = Arc::clone(&q);
        let producer = thread::spawn(move || q2.push(buf(2)));

        thread::sleep(Duration::from_millis(20));
        assert!(!producer.is_finished());

        assert_eq!(q.try_pop().unwrap().as_slice(), &[1]);
        assert_eq!(producer.join().unwrap(), Admission::Queued);
        assert_eq!(q.try_pop().unwrap().as_slice(), &[2]);
    }

    #[test]
    fn test_block_policy_released_by_close() {
        let q = Arc::new(open_slot(SlotConfig::new(1, FullPolicy::Block)));
        q.push(buf(1));

        let q2 = Arc::clone(&q);
        let producer = thread::spawn(move || q2.push(buf(2)));
        thread::sleep(Duration::from_millis(20));

        q.close();
        assert_eq!(producer.join().unwrap(), Admission::Rejected);
    }

    #[test]
    fn test_closed_slot_rejects() {
        let q = SlotQueue::new(SlotConfig::default());
        assert_eq!(q.push(buf(1)), Admission::Rejected);
        q.reopen();
        assert_eq!(q.push(buf(1)), Admission::Queued);
    }

    #[test]
    fn test_pop_timeout_returns_none_when_idle() {
        let q = open_slot(SlotConfig::default());
        assert!(q.pop_timeout(Duration::from_millis(5)).is_none());
    }
}
