//! Job engine: typed jobs, the worker pool with result fan-out, and the
//! router that turns each job into a result.

mod broadcast;
mod engine;
pub mod job;
pub mod panoramic;
pub mod router;
pub mod scan;
pub mod store;
pub mod timelapse;

pub use engine::{wait_for_result, JobProcessor, Pipeline, ResultStream, Unsubscribe};
pub use job::{Job, JobId, JobKind, JobResult, JobType, Meta, OptionMap, OptionValue};
pub use router::Router;
pub use store::{JobRecord, JobStore, MemoryJobStore};
