//! Concurrency gate
//!
//! Bounds the number of simultaneous heavy operations and provides fair,
//! timeout-safe admission. Request handlers call `TaskGate::execute` with a
//! processing closure; the gate owns all queue and slot accounting.

mod task_gate;
mod types;

pub use task_gate::TaskGate;
pub use types::{
    BatchItemError, BatchOptions, BatchOutcome, GateConfig, GateError, GateStats, ResourceToken,
};
