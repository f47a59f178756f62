use super::context::JobContext;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobSchedule {
    /// Run at fixed intervals, first run one interval after startup.
    Interval(Duration),
    /// Run once when the scheduler starts, then at fixed intervals.
    StartupAndInterval(Duration),
}

impl JobSchedule {
    pub fn interval(&self) -> Duration {
        match self {
            JobSchedule::Interval(interval) | JobSchedule::StartupAndInterval(interval) => {
                *interval
            }
        }
    }

    pub fn runs_on_startup(&self) -> bool {
        matches!(self, JobSchedule::StartupAndInterval(_))
    }
}

#[derive(Debug)]
pub enum JobError {
    ExecutionFailed(String),
    Cancelled,
}

impl std::fmt::Display for JobError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobError::ExecutionFailed(msg) => write!(f, "Execution failed: {}", msg),
            JobError::Cancelled => write!(f, "Job was cancelled"),
        }
    }
}

impl std::error::Error for JobError {}

/// A unit of periodic work.
///
/// `execute` is called from `spawn_blocking`. Long operations should check
/// `ctx.is_cancelled()` and return `JobError::Cancelled`.
pub trait BackgroundJob: Send + Sync {
    fn id(&self) -> &'static str;

    fn description(&self) -> &'static str;

    fn schedule(&self) -> JobSchedule;

    fn execute(&self, ctx: &JobContext) -> Result<(), JobError>;
}
