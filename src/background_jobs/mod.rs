//! Periodic background work.
//!
//! Jobs are synchronous and run on the blocking pool. The scheduler fires each
//! job at its interval until its shutdown token is cancelled.

mod context;
mod job;
pub mod jobs;
mod scheduler;

pub use context::JobContext;
pub use job::{BackgroundJob, JobError, JobSchedule};
pub use scheduler::JobScheduler;
