//! Task lifecycle engine.
//!
//! - `registry`: at-most-one processing routine per task id
//! - `processor`: per-task state machine (pending → running → completed/stopped/failed)
//! - `scheduler`: polling loop that launches processors

pub mod processor;
pub mod registry;
pub mod scheduler;

pub use processor::{ProcessOutcome, TaskProcessor};
pub use registry::ActiveRegistry;
pub use scheduler::TaskScheduler;
