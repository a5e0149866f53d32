//! Flow graph: nodes, slots, configuration, and the filter factory.
//!
//! Flows connect into a directed graph with [`Flow::add_downstream`];
//! each node schedules its own workers and applies per-slot backpressure
//! policies. See [`flow`](self::flow) for the scheduling details.

pub mod config;
pub mod factory;
#[allow(clippy::module_inception)]
mod flow;
mod slot;

pub use config::{FlowConfig, ParamMap, ParamValue};
pub use factory::{FilterConstructor, FilterFactory};
pub use flow::{Flow, FlowState, FlowStats, ProcessFn, ScheduleMode};
pub use slot::{Admission, FullPolicy, SlotConfig};
