use super::context::JobContext;
use super::job::{BackgroundJob, JobError};
use crate::server::metrics;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Idle wait when no job is registered.
const IDLE_SLEEP: Duration = Duration::from_secs(3600);

struct ScheduledJob {
    job: Arc<dyn BackgroundJob>,
    next_run: Instant,
}

/// Runs registered jobs at their intervals until the shutdown token fires.
pub struct JobScheduler {
    jobs: Vec<ScheduledJob>,

    /// Runs still in flight, keyed by job id. A job never overlaps itself.
    running_handles: HashMap<&'static str, JoinHandle<()>>,

    shutdown_token: CancellationToken,

    job_context: JobContext,
}

impl JobScheduler {
    pub fn new(shutdown_token: CancellationToken, job_context: JobContext) -> Self {
        Self {
            jobs: Vec::new(),
            running_handles: HashMap::new(),
            shutdown_token,
            job_context,
        }
    }

    pub fn register_job(&mut self, job: Arc<dyn BackgroundJob>) {
        info!("Registering job: {} - {}", job.id(), job.description());
        let schedule = job.schedule();
        let next_run = if schedule.runs_on_startup() {
            Instant::now()
        } else {
            Instant::now() + schedule.interval()
        };
        self.jobs.push(ScheduledJob { job, next_run });
    }

    pub fn job_count(&self) -> usize {
        self.jobs.len()
    }

    /// Main scheduler loop.
    pub async fn run(mut self) {
        info!("Starting job scheduler with {} registered jobs", self.job_count());

        loop {
            self.cleanup_completed_jobs();

            let sleep_duration = self.time_until_next_job();
            debug!(
                "Scheduler sleeping for {:?} until next scheduled job",
                sleep_duration
            );

            tokio::select! {
                _ = tokio::time::sleep(sleep_duration) => {
                    self.run_due_jobs();
                }
                _ = self.shutdown_token.cancelled() => {
                    info!("Scheduler received shutdown signal");
                    self.shutdown().await;
                    break;
                }
            }
        }

        info!("Job scheduler stopped");
    }

    fn time_until_next_job(&self) -> Duration {
        let now = Instant::now();
        self.jobs
            .iter()
            .map(|scheduled| scheduled.next_run.saturating_duration_since(now))
            .min()
            .unwrap_or(IDLE_SLEEP)
    }

    fn cleanup_completed_jobs(&mut self) {
        self.running_handles.retain(|_, handle| !handle.is_finished());
    }

    fn run_due_jobs(&mut self) {
        let now = Instant::now();
        let due: Vec<Arc<dyn BackgroundJob>> = self
            .jobs
            .iter_mut()
            .filter(|scheduled| scheduled.next_run <= now)
            .map(|scheduled| {
                scheduled.next_run = now + scheduled.job.schedule().interval();
                Arc::clone(&scheduled.job)
            })
            .collect();

        for job in due {
            self.spawn_job(job);
        }
    }

    fn spawn_job(&mut self, job: Arc<dyn BackgroundJob>) {
        let job_id = job.id();
        if self
            .running_handles
            .get(job_id)
            .is_some_and(|handle| !handle.is_finished())
        {
            warn!("Job {} is still running, skipping this run", job_id);
            return;
        }

        debug!("Starting job {}", job_id);
        let ctx = self.job_context.child();
        let handle = tokio::spawn(async move {
            let start_time = Instant::now();
            let result = tokio::task::spawn_blocking(move || job.execute(&ctx)).await;
            let elapsed = start_time.elapsed();

            let status_label = match result {
                Ok(Ok(())) => {
                    info!("Job {} completed successfully in {:?}", job_id, elapsed);
                    "success"
                }
                Ok(Err(JobError::Cancelled)) => {
                    info!("Job {} was cancelled after {:?}", job_id, elapsed);
                    "cancelled"
                }
                Ok(Err(e)) => {
                    error!("Job {} failed after {:?}: {}", job_id, elapsed, e);
                    "failed"
                }
                Err(e) => {
                    error!("Job {} panicked after {:?}: {}", job_id, elapsed, e);
                    "panic"
                }
            };
            metrics::record_background_job_execution(job_id, status_label, elapsed);
        });
        self.running_handles.insert(job_id, handle);
    }

    /// Blocking job bodies cannot be aborted; wait for in-flight runs to return.
    async fn shutdown(&mut self) {
        for (job_id, handle) in self.running_handles.drain() {
            info!("Waiting for job {} to finish", job_id);
            if let Err(e) = handle.await {
                error!("Job {} task failed during shutdown: {}", job_id, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::background_jobs::JobSchedule;
    use crate::posts::{Post, PostStore};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct NoopPostStore;

    impl PostStore for NoopPostStore {
        fn create_post(&self, _owner_id: &str, _content: &str) -> anyhow::Result<Post> {
            unimplemented!()
        }
        fn get_post(&self, _post_id: &str) -> anyhow::Result<Option<Post>> {
            Ok(None)
        }
        fn get_posts(&self, _limit: usize, _offset: usize) -> anyhow::Result<Vec<Post>> {
            Ok(vec![])
        }
        fn count_posts(&self) -> anyhow::Result<usize> {
            Ok(0)
        }
        fn increment_like_count(&self, _post_id: &str) -> anyhow::Result<()> {
            Ok(())
        }
        fn decrement_like_count(&self, _post_id: &str) -> anyhow::Result<()> {
            Ok(())
        }
        fn reconcile_like_counts(&self) -> anyhow::Result<usize> {
            Ok(0)
        }
    }

    struct CountingJob {
        schedule: JobSchedule,
        runs: Arc<AtomicUsize>,
    }

    impl BackgroundJob for CountingJob {
        fn id(&self) -> &'static str {
            "counting"
        }

        fn description(&self) -> &'static str {
            "Counts its runs"
        }

        fn schedule(&self) -> JobSchedule {
            self.schedule.clone()
        }

        fn execute(&self, _ctx: &JobContext) -> Result<(), JobError> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn scheduler_with_job(schedule: JobSchedule) -> (JobScheduler, Arc<AtomicUsize>, CancellationToken) {
        let shutdown_token = CancellationToken::new();
        let ctx = JobContext::new(shutdown_token.child_token(), Arc::new(NoopPostStore));
        let mut scheduler = JobScheduler::new(shutdown_token.clone(), ctx);
        let runs = Arc::new(AtomicUsize::new(0));
        scheduler.register_job(Arc::new(CountingJob {
            schedule,
            runs: runs.clone(),
        }));
        (scheduler, runs, shutdown_token)
    }

    #[tokio::test]
    async fn runs_job_repeatedly_until_shutdown() {
        let (scheduler, runs, shutdown_token) =
            scheduler_with_job(JobSchedule::StartupAndInterval(Duration::from_millis(20)));
        assert_eq!(scheduler.job_count(), 1);

        let handle = tokio::spawn(scheduler.run());
        tokio::time::sleep(Duration::from_millis(300)).await;
        shutdown_token.cancel();
        handle.await.unwrap();

        let runs_at_shutdown = runs.load(Ordering::SeqCst);
        assert!(runs_at_shutdown >= 2, "ran {} times", runs_at_shutdown);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(runs.load(Ordering::SeqCst), runs_at_shutdown);
    }

    #[tokio::test]
    async fn interval_job_waits_for_first_interval() {
        let (scheduler, runs, shutdown_token) =
            scheduler_with_job(JobSchedule::Interval(Duration::from_secs(3600)));

        let handle = tokio::spawn(scheduler.run());
        tokio::time::sleep(Duration::from_millis(100)).await;
        shutdown_token.cancel();
        handle.await.unwrap();

        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn empty_scheduler_stops_on_shutdown() {
        let shutdown_token = CancellationToken::new();
        let ctx = JobContext::new(shutdown_token.child_token(), Arc::new(NoopPostStore));
        let scheduler = JobScheduler::new(shutdown_token.clone(), ctx);

        let handle = tokio::spawn(scheduler.run());
        shutdown_token.cancel();
        handle.await.unwrap();
    }
}
