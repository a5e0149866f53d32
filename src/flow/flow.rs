//! Pipeline nodes: bounded input slots, a scheduling policy, and a stage.
//!
//! A [`Flow`] accepts buffers on its input slots, eventually hands them to
//! its stage (a [`Filter`] or a raw callback), and pushes any produced
//! buffer to the slots of the downstream flows it is connected to. The
//! scheduling mode decides how slots are drained:
//!
//! - **async-common**: one worker per slot; FIFO within a slot, no ordering
//!   across slots.
//! - **async-atomic**: a single worker drains all slots in fixed order per
//!   cycle, giving a consistent snapshot across slots; a fixed-rate hint
//!   paces this worker.
//!
//! Stopping is cooperative: workers observe the stop flag between
//! processing units, pending buffers are discarded, and `stop()` joins all
//! workers. Errors never cross flow boundaries; a failing stage only
//! increments this flow's error counter.

use super::config::FlowConfig;
use super::slot::{Admission, SlotQueue};
use crate::buffer::MediaBuffer;
use crate::error::{Error, Result};
use crate::filter::{ControlReply, Filter, FilterControl};
use smallvec::SmallVec;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, Weak};
use std::thread;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// How often idle workers re-check the stop flag.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// How a flow's input slots are drained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleMode {
    /// Independent worker per slot.
    AsyncCommon,
    /// Single worker, fixed slot order per cycle.
    AsyncAtomic,
}

/// Lifecycle state of a flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    /// Constructed or fully stopped; slots reject buffers.
    Stopped,
    /// Workers running, slots accepting.
    Running,
    /// Stop requested; in-flight processing may finish, no new buffers.
    Stopping,
}

/// Raw processing callback: invoked with the flow and the current input
/// vector (one entry per slot, `None` where a slot has no pending data).
/// Returns whether processing should continue being scheduled. The callback
/// performs its own admission checks on each entry.
pub type ProcessFn = Box<dyn FnMut(&Flow, &mut [Option<MediaBuffer>]) -> bool + Send>;

/// The processing stage attached to a flow.
enum Stage {
    Filter(Mutex<Box<dyn Filter>>),
    Callback(Mutex<ProcessFn>),
}

/// Snapshot of a flow's counters. Observability only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlowStats {
    /// Processing-unit invocations that reached the stage.
    pub processed: u64,
    /// Buffers discarded by slot admission policies.
    pub dropped: u64,
    /// Format mismatches plus stage processing failures.
    pub errors: u64,
}

/// A pipeline node. See the [module docs](self).
///
/// # Example
///
/// ```rust
/// use mediaflow::filters::PassThrough;
/// use mediaflow::flow::{Flow, FlowConfig, SlotConfig};
///
/// let config = FlowConfig::uniform(1, SlotConfig::default());
/// let flow = Flow::new("video", config, Box::new(PassThrough::new())).unwrap();
/// flow.start().unwrap();
/// // ... submit buffers with flow.send_input(0, buf) ...
/// flow.stop();
/// ```
pub struct Flow {
    name: String,
    slots: Vec<Arc<SlotQueue>>,
    mode: ScheduleMode,
    frame_interval: Option<Duration>,
    stage: Stage,
    downstream: Mutex<SmallVec<[(Weak<Flow>, usize); 2]>>,
    state: Mutex<FlowState>,
    stop: AtomicBool,
    workers: Mutex<Vec<JoinHandle<()>>>,
    /// Wakes the atomic worker when any slot gains data.
    work_lock: Mutex<()>,
    work_cv: Condvar,
    processed: AtomicU64,
    errors: AtomicU64,
}

impl Flow {
    /// Construct a flow driving a [`Filter`] with the standard contract:
    /// admission-check formats, invoke the filter, fan the output out to
    /// downstream slots, count failures.
    pub fn new(
        name: impl Into<String>,
        config: FlowConfig,
        filter: Box<dyn Filter>,
    ) -> Result<Arc<Self>> {
        Self::build(name.into(), config, Stage::Filter(Mutex::new(filter)))
    }

    /// Construct a flow with a raw processing callback instead of a filter.
    pub fn with_callback(
        name: impl Into<String>,
        config: FlowConfig,
        callback: ProcessFn,
    ) -> Result<Arc<Self>> {
        Self::build(name.into(), config, Stage::Callback(Mutex::new(callback)))
    }

    fn build(name: String, config: FlowConfig, stage: Stage) -> Result<Arc<Self>> {
        config.validate()?;
        let mode = config.resolve_mode();
        let frame_interval = config.fixed_rate.map(|rate| Duration::from_secs_f64(1.0 / rate));
        let slots = config
            .slots
            .iter()
            .map(|slot| Arc::new(SlotQueue::new(*slot)))
            .collect();

        Ok(Arc::new(Self {
            name,
            slots,
            mode,
            frame_interval,
            stage,
            downstream: Mutex::new(SmallVec::new()),
            state: Mutex::new(FlowState::Stopped),
            stop: AtomicBool::new(false),
            workers: Mutex::new(Vec::new()),
            work_lock: Mutex::new(()),
            work_cv: Condvar::new(),
            processed: AtomicU64::new(0),
            errors: AtomicU64::new(0),
        }))
    }

    /// The flow's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of input slots.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// The resolved scheduling mode.
    pub fn mode(&self) -> ScheduleMode {
        self.mode
    }

    /// Current lifecycle state.
    pub fn state(&self) -> FlowState {
        *self.state.lock().expect("flow state poisoned")
    }

    /// Buffers currently queued on a slot (0 for an unknown slot).
    pub fn pending(&self, slot: usize) -> usize {
        self.slots.get(slot).map_or(0, |s| s.len())
    }

    /// Counter snapshot.
    pub fn stats(&self) -> FlowStats {
        FlowStats {
            processed: self.processed.load(Ordering::Relaxed),
            dropped: self.slots.iter().map(|s| s.dropped()).sum(),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }

    /// Connect this flow's output to an input slot of `next`.
    ///
    /// Held weakly: a downstream flow that is dropped is silently skipped
    /// at dispatch time.
    pub fn add_downstream(self: &Arc<Self>, next: &Arc<Flow>, slot: usize) -> Result<()> {
        if slot >= next.slots.len() {
            return Err(Error::InvalidSlot {
                slot,
                count: next.slots.len(),
            });
        }
        self.downstream
            .lock()
            .expect("downstream list poisoned")
            .push((Arc::downgrade(next), slot));
        Ok(())
    }

    /// Start the workers: Stopped → Running.
    ///
    /// # Errors
    ///
    /// Fails if the flow is not Stopped or a worker thread cannot spawn.
    pub fn start(self: &Arc<Self>) -> Result<()> {
        {
            let mut state = self.state.lock().expect("flow state poisoned");
            if *state != FlowState::Stopped {
                return Err(Error::InvalidState("flow is not stopped"));
            }
            *state = FlowState::Running;
        }
        self.stop.store(false, Ordering::Release);
        for slot in &self.slots {
            slot.reopen();
        }

        let mut workers = self.workers.lock().expect("worker list poisoned");
        match self.mode {
            ScheduleMode::AsyncCommon => {
                for idx in 0..self.slots.len() {
                    let weak = Arc::downgrade(self);
                    let handle = thread::Builder::new()
                        .name(format!("{}-slot{}", self.name, idx))
                        .spawn(move || common_worker(weak, idx))?;
                    workers.push(handle);
                }
            }
            ScheduleMode::AsyncAtomic => {
                let weak = Arc::downgrade(self);
                let handle = thread::Builder::new()
                    .name(format!("{}-atomic", self.name))
                    .spawn(move || atomic_worker(weak))?;
                workers.push(handle);
            }
        }

        tracing::debug!(flow = %self.name, mode = ?self.mode, "flow started");
        Ok(())
    }

    /// Stop the workers: Running → Stopping → Stopped.
    ///
    /// Blocks until every worker finished its current unit of work.
    /// Pending queued buffers are discarded, not drained. A stopped flow
    /// may be started again.
    pub fn stop(&self) {
        {
            let mut state = self.state.lock().expect("flow state poisoned");
            if *state == FlowState::Stopped {
                return;
            }
            *state = FlowState::Stopping;
        }
        self.request_stop();

        let handles: Vec<JoinHandle<()>> = self
            .workers
            .lock()
            .expect("worker list poisoned")
            .drain(..)
            .collect();
        let current = thread::current().id();
        for handle in handles {
            if handle.thread().id() != current {
                let _ = handle.join();
            }
        }

        for slot in &self.slots {
            slot.clear();
        }
        *self.state.lock().expect("flow state poisoned") = FlowState::Stopped;
        tracing::debug!(flow = %self.name, "flow stopped");
    }

    fn request_stop(&self) {
        self.stop.store(true, Ordering::Release);
        for slot in &self.slots {
            slot.close();
        }
        self.work_cv.notify_all();
    }

    /// Submit a buffer to an input slot.
    ///
    /// Non-blocking except under the slot's block-until-space policy.
    /// Returns the admission outcome; a flow that is not Running rejects.
    ///
    /// # Errors
    ///
    /// Fails only for an out-of-range slot index.
    pub fn send_input(&self, slot: usize, buf: MediaBuffer) -> Result<Admission> {
        let queue = self.slots.get(slot).ok_or(Error::InvalidSlot {
            slot,
            count: self.slots.len(),
        })?;

        if self.state() != FlowState::Running {
            return Ok(Admission::Rejected);
        }

        let admission = queue.push(buf);
        match admission {
            Admission::Queued | Admission::DroppedOldest => {
                self.work_cv.notify_all();
            }
            Admission::DroppedIncoming => {
                tracing::debug!(flow = %self.name, slot, "slot full, incoming buffer dropped");
            }
            Admission::Rejected => {}
        }
        Ok(admission)
    }

    /// Forward a synchronous control request to the attached filter.
    ///
    /// # Errors
    ///
    /// Fails with `UnsupportedControl` for callback-backed flows and for
    /// requests the filter does not understand.
    pub fn control(&self, req: FilterControl) -> Result<ControlReply> {
        match &self.stage {
            Stage::Filter(filter) => filter.lock().expect("filter poisoned").control(req),
            Stage::Callback(_) => Err(Error::UnsupportedControl),
        }
    }

    /// Run one processing unit. Returns whether scheduling should continue.
    fn run_stage(&self, inputs: &mut [Option<MediaBuffer>]) -> bool {
        match &self.stage {
            Stage::Callback(callback) => {
                self.processed.fetch_add(1, Ordering::Relaxed);
                (callback.lock().expect("callback poisoned"))(self, inputs)
            }
            Stage::Filter(filter) => {
                self.drive_filter(&mut filter.lock().expect("filter poisoned"), inputs);
                true
            }
        }
    }

    /// Standard filter driver: admission checks, process, fan-out.
    fn drive_filter(&self, filter: &mut Box<dyn Filter>, inputs: &mut [Option<MediaBuffer>]) {
        let accepts = filter.accepts();
        for entry in inputs.iter_mut() {
            if let Some(buf) = entry {
                let actual = buf.format().kind();
                if !accepts.matches(actual) {
                    tracing::warn!(
                        flow = %self.name,
                        filter = filter.name(),
                        ?accepts,
                        ?actual,
                        "dropping buffer with mismatched format"
                    );
                    self.errors.fetch_add(1, Ordering::Relaxed);
                    *entry = None;
                }
            }
        }
        if inputs.iter().all(Option::is_none) {
            return;
        }

        self.processed.fetch_add(1, Ordering::Relaxed);
        match filter.process(inputs) {
            Ok(Some(out)) => self.dispatch(out),
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(flow = %self.name, filter = filter.name(), error = %e, "filter failed, frame lost");
                self.errors.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Push a produced buffer to every connected downstream slot.
    pub fn dispatch(&self, out: MediaBuffer) {
        let targets: SmallVec<[(Weak<Flow>, usize); 2]> = self
            .downstream
            .lock()
            .expect("downstream list poisoned")
            .clone();

        for (weak, slot) in targets {
            let Some(next) = weak.upgrade() else { continue };
            match next.send_input(slot, out.clone()) {
                Ok(Admission::Queued) => {}
                Ok(admission) => {
                    tracing::debug!(
                        from = %self.name,
                        to = %next.name,
                        slot,
                        ?admission,
                        "downstream did not queue buffer"
                    );
                }
                Err(e) => {
                    tracing::warn!(from = %self.name, to = %next.name, error = %e, "dispatch failed");
                }
            }
        }
    }
}

impl Drop for Flow {
    fn drop(&mut self) {
        // Workers hold only weak references, so this runs once the last
        // strong handle is gone; wake and join whatever is still live.
        self.request_stop();
        if let Ok(workers) = self.workers.get_mut() {
            let current = thread::current().id();
            for handle in workers.drain(..) {
                if handle.thread().id() != current {
                    let _ = handle.join();
                }
            }
        }
    }
}

/// Worker for one slot under async-common scheduling.
fn common_worker(weak: Weak<Flow>, idx: usize) {
    loop {
        let Some(flow) = weak.upgrade() else { break };
        if flow.stop.load(Ordering::Acquire) {
            break;
        }
        let Some(buf) = flow.slots[idx].pop_timeout(POLL_INTERVAL) else {
            continue;
        };

        let mut inputs: Vec<Option<MediaBuffer>> =
            (0..flow.slots.len()).map(|_| None).collect();
        inputs[idx] = Some(buf);
        if !flow.run_stage(&mut inputs) {
            break;
        }
    }
}

/// Single worker draining all slots in fixed order under async-atomic
/// scheduling, paced by the fixed-rate interval when one is configured.
fn atomic_worker(weak: Weak<Flow>) {
    let mut next_tick: Option<Instant> = None;
    loop {
        let Some(flow) = weak.upgrade() else { break };
        if flow.stop.load(Ordering::Acquire) {
            break;
        }

        if let Some(interval) = flow.frame_interval {
            let now = Instant::now();
            let tick = next_tick.get_or_insert(now);
            if *tick > now {
                thread::sleep(*tick - now);
            }
            *tick += interval;
            // Fell behind by more than a full cycle: resync, don't burst.
            if *tick + interval < Instant::now() {
                *tick = Instant::now();
            }
        }

        let mut inputs: Vec<Option<MediaBuffer>> =
            flow.slots.iter().map(|slot| slot.try_pop()).collect();

        if inputs.iter().all(Option::is_none) && flow.frame_interval.is_none() {
            let guard = flow.work_lock.lock().expect("work lock poisoned");
            let _ = flow
                .work_cv
                .wait_timeout(guard, POLL_INTERVAL)
                .expect("work lock poisoned");
            continue;
        }

        // Paced flows invoke the stage even with an empty snapshot so it
        // can emit heartbeat output; the stage checks each entry itself.
        if !flow.run_stage(&mut inputs) {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::PassThrough;
    use crate::flow::slot::{FullPolicy, SlotConfig};
    use crate::memory::MemoryType;

    fn buf(tag: u8) -> MediaBuffer {
        let mut b = MediaBuffer::alloc(8, MemoryType::Heap).unwrap();
        b.fill(&[tag]).unwrap();
        b
    }

    fn one_slot_config() -> FlowConfig {
        FlowConfig::uniform(1, SlotConfig::new(4, FullPolicy::DropIncoming))
    }

    #[test]
    fn test_state_machine() {
        let flow = Flow::new("t", one_slot_config(), Box::new(PassThrough::new())).unwrap();
        assert_eq!(flow.state(), FlowState::Stopped);

        flow.start().unwrap();
        assert_eq!(flow.state(), FlowState::Running);
        assert!(flow.start().is_err()); // already running

        flow.stop();
        assert_eq!(flow.state(), FlowState::Stopped);
        flow.stop(); // idempotent

        // Restartable after a full stop.
        flow.start().unwrap();
        flow.stop();
    }

    #[test]
    fn test_stopped_flow_rejects_input() {
        let flow = Flow::new("t", one_slot_config(), Box::new(PassThrough::new())).unwrap();
        assert_eq!(flow.send_input(0, buf(1)).unwrap(), Admission::Rejected);
    }

    #[test]
    fn test_bad_slot_index_is_an_error() {
        let flow = Flow::new("t", one_slot_config(), Box::new(PassThrough::new())).unwrap();
        assert!(matches!(
            flow.send_input(3, buf(1)),
            Err(Error::InvalidSlot { slot: 3, count: 1 })
        ));
    }

    #[test]
    fn test_control_reaches_filter() {
        let flow = Flow::new("t", one_slot_config(), Box::new(PassThrough::new())).unwrap();
        assert_eq!(
            flow.control(FilterControl::GetEnabled).unwrap(),
            ControlReply::Enabled(true)
        );
        flow.control(FilterControl::SetEnabled(false)).unwrap();
        assert_eq!(
            flow.control(FilterControl::GetEnabled).unwrap(),
            ControlReply::Enabled(false)
        );
    }

    #[test]
    fn test_callback_flow_has_no_control_channel() {
        let flow = Flow::with_callback("t", one_slot_config(), Box::new(|_, _| true)).unwrap();
        assert!(matches!(
            flow.control(FilterControl::GetEnabled),
            Err(Error::UnsupportedControl)
        ));
    }

    #[test]
    fn test_construction_failure_is_local() {
        let bad = FlowConfig::new(vec![]);
        assert!(Flow::new("bad", bad, Box::new(PassThrough::new())).is_err());

        // Sibling flows are unaffected.
        let good = Flow::new("good", one_slot_config(), Box::new(PassThrough::new())).unwrap();
        good.start().unwrap();
        good.stop();
    }
}
