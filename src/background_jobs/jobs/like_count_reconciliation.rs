//! Repairs denormalized like counters from the like relation.
//!
//! A toggle whose counter update failed after the relation write committed
//! leaves `likes_count` off by one. This job recomputes every drifted counter
//! from the relation, which is authoritative.

use crate::background_jobs::{
    context::JobContext,
    job::{BackgroundJob, JobError, JobSchedule},
};
use crate::server::metrics;
use std::time::Duration;
use tracing::{debug, warn};

pub struct LikeCountReconciliationJob {
    interval: Duration,
}

impl LikeCountReconciliationJob {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl BackgroundJob for LikeCountReconciliationJob {
    fn id(&self) -> &'static str {
        "like_count_reconciliation"
    }

    fn description(&self) -> &'static str {
        "Recompute drifted post like counters from the like relation"
    }

    fn schedule(&self) -> JobSchedule {
        // Startup run repairs drift left by a crash between relation write and counter delta.
        JobSchedule::StartupAndInterval(self.interval)
    }

    fn execute(&self, ctx: &JobContext) -> Result<(), JobError> {
        if ctx.is_cancelled() {
            return Err(JobError::Cancelled);
        }

        let repaired = ctx
            .post_store
            .reconcile_like_counts()
            .map_err(|e| JobError::ExecutionFailed(format!("{:#}", e)))?;

        if repaired > 0 {
            warn!("Reconciled like counters of {} drifted posts", repaired);
            metrics::record_like_counts_reconciled(repaired);
        } else {
            debug!("Like counters are consistent, nothing to reconcile");
        }
        Ok(())
    }
}
