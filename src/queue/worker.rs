//! Worker pool for processing deployment jobs from the Redis queue.
//!
//! This module provides a pool of workers that process jobs from a shared
//! Redis queue. Each worker runs as an independent async task, pulls jobs
//! with a blocking pop, and hands deploy payloads to the engine.
//!
//! # Features
//!
//! - Configurable number of workers
//! - Graceful shutdown with broadcast channel
//! - Bounded retry with exponential backoff for retryable failures
//! - Dead letter queue for exhausted jobs
//! - Pool statistics tracking

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::OrchestratorConfig;
use crate::engine::DeployEngine;
use crate::store::DeploymentStore;

use super::job::{Job, JobPayload, JobResult};
use super::queue::{JobQueue, QueueError};

/// Errors that can occur in the worker pool.
#[derive(Debug, Error)]
pub enum PoolError {
    /// Failed to connect to the job queue.
    #[error("Queue connection failed: {0}")]
    QueueConnection(#[from] QueueError),

    /// Pool is already running.
    #[error("Pool is already running")]
    AlreadyRunning,

    /// Pool is not running.
    #[error("Pool is not running")]
    NotRunning,

    /// Shutdown timed out.
    #[error("Shutdown timed out after {0:?}")]
    ShutdownTimeout(Duration),
}

/// Configuration for the worker pool.
#[derive(Debug, Clone)]
pub struct WorkerPoolConfig {
    /// Number of worker tasks to spawn.
    pub num_workers: usize,
    /// How long each blocking dequeue waits before re-checking shutdown.
    pub poll_interval: Duration,
    /// Maximum time allowed for processing a single job.
    pub job_timeout: Duration,
    /// Base delay for exponential retry backoff.
    pub retry_base_delay: Duration,
    /// Timeout for graceful shutdown.
    pub shutdown_timeout: Duration,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            num_workers: 1,
            poll_interval: Duration::from_secs(1),
            job_timeout: Duration::from_secs(1800), // 30 minutes
            retry_base_delay: Duration::from_secs(2),
            shutdown_timeout: Duration::from_secs(60),
        }
    }
}

impl WorkerPoolConfig {
    /// Creates a new configuration with the specified number of workers.
    pub fn new(num_workers: usize) -> Self {
        Self {
            num_workers,
            ..Default::default()
        }
    }

    /// Sets the poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Sets the job timeout.
    pub fn with_job_timeout(mut self, timeout: Duration) -> Self {
        self.job_timeout = timeout;
        self
    }

    /// Sets the base retry delay.
    pub fn with_retry_base_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay = delay;
        self
    }

    /// Sets the shutdown timeout.
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }
}

impl From<&OrchestratorConfig> for WorkerPoolConfig {
    fn from(config: &OrchestratorConfig) -> Self {
        Self {
            num_workers: config.workers,
            poll_interval: config.poll_interval,
            job_timeout: config.job_timeout,
            retry_base_delay: config.retry_base_delay,
            shutdown_timeout: config.shutdown_timeout,
        }
    }
}

/// Statistics about the worker pool.
#[derive(Debug, Clone, Default)]
pub struct PoolStats {
    /// Total number of workers in the pool.
    pub num_workers: usize,
    /// Number of workers currently processing jobs.
    pub active_workers: usize,
    /// Total number of jobs completed successfully.
    pub jobs_completed: u64,
    /// Total number of jobs that failed.
    pub jobs_failed: u64,
    /// Total number of retries scheduled.
    pub jobs_retried: u64,
    /// Average job processing duration.
    pub average_job_duration: Duration,
}

impl PoolStats {
    /// Returns the total number of jobs processed (completed + failed).
    pub fn total_processed(&self) -> u64 {
        self.jobs_completed + self.jobs_failed
    }
}

/// Shared state for tracking pool statistics.
struct SharedPoolStats {
    jobs_completed: AtomicU64,
    jobs_failed: AtomicU64,
    jobs_retried: AtomicU64,
    total_duration_ms: AtomicU64,
    active_workers: AtomicU64,
}

impl SharedPoolStats {
    fn new() -> Self {
        Self {
            jobs_completed: AtomicU64::new(0),
            jobs_failed: AtomicU64::new(0),
            jobs_retried: AtomicU64::new(0),
            total_duration_ms: AtomicU64::new(0),
            active_workers: AtomicU64::new(0),
        }
    }

    fn record_completion(&self, duration: Duration) {
        self.jobs_completed.fetch_add(1, Ordering::SeqCst);
        self.total_duration_ms
            .fetch_add(duration.as_millis() as u64, Ordering::SeqCst);
    }

    fn record_failure(&self, duration: Duration) {
        self.jobs_failed.fetch_add(1, Ordering::SeqCst);
        self.total_duration_ms
            .fetch_add(duration.as_millis() as u64, Ordering::SeqCst);
    }

    fn record_retry(&self) {
        self.jobs_retried.fetch_add(1, Ordering::SeqCst);
    }

    fn increment_active(&self) {
        self.active_workers.fetch_add(1, Ordering::SeqCst);
    }

    fn decrement_active(&self) {
        self.active_workers.fetch_sub(1, Ordering::SeqCst);
    }

    fn to_pool_stats(&self, num_workers: usize) -> PoolStats {
        let completed = self.jobs_completed.load(Ordering::SeqCst);
        let failed = self.jobs_failed.load(Ordering::SeqCst);
        let retried = self.jobs_retried.load(Ordering::SeqCst);
        let total_duration_ms = self.total_duration_ms.load(Ordering::SeqCst);
        let active = self.active_workers.load(Ordering::SeqCst);

        let total_jobs = completed + failed;
        let average_duration = if total_jobs > 0 {
            Duration::from_millis(total_duration_ms / total_jobs)
        } else {
            Duration::ZERO
        };

        PoolStats {
            num_workers,
            active_workers: active as usize,
            jobs_completed: completed,
            jobs_failed: failed,
            jobs_retried: retried,
            average_job_duration: average_duration,
        }
    }
}

/// Worker pool that manages multiple workers processing jobs from a queue.
pub struct WorkerPool {
    config: WorkerPoolConfig,
    queue: Arc<JobQueue>,
    engine: Arc<DeployEngine>,
    store: Arc<dyn DeploymentStore>,
    shutdown_tx: broadcast::Sender<()>,
    worker_handles: Vec<JoinHandle<()>>,
    stats: Arc<SharedPoolStats>,
    is_running: AtomicBool,
}

impl WorkerPool {
    /// Creates a new worker pool over a shared queue connection.
    pub fn new(
        config: WorkerPoolConfig,
        queue: Arc<JobQueue>,
        engine: Arc<DeployEngine>,
        store: Arc<dyn DeploymentStore>,
    ) -> Self {
        // Buffer size of 1 is sufficient since we only send once
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            config,
            queue,
            engine,
            store,
            shutdown_tx,
            worker_handles: Vec::new(),
            stats: Arc::new(SharedPoolStats::new()),
            is_running: AtomicBool::new(false),
        }
    }

    /// Starts all workers in the pool.
    ///
    /// Jobs left in the processing queue by a crashed worker are recovered
    /// first, then workers begin polling immediately.
    ///
    /// # Errors
    ///
    /// Returns `PoolError::AlreadyRunning` if the pool is already running.
    pub async fn start(&mut self) -> Result<(), PoolError> {
        if self.is_running.load(Ordering::SeqCst) {
            return Err(PoolError::AlreadyRunning);
        }

        match self.queue.recover_processing_jobs().await {
            Ok(recovered) => {
                if recovered > 0 {
                    info!(recovered, "Recovered jobs from processing queue");
                }
            }
            Err(e) => {
                warn!(error = %e, "Failed to recover processing jobs");
            }
        }

        for i in 0..self.config.num_workers {
            let worker = Worker::new(
                format!("worker-{}", i),
                Arc::clone(&self.queue),
                Arc::clone(&self.engine),
                Arc::clone(&self.store),
                self.shutdown_tx.subscribe(),
                self.config.clone(),
                Arc::clone(&self.stats),
            );

            let handle = tokio::spawn(async move {
                worker.run().await;
            });

            self.worker_handles.push(handle);
        }

        self.is_running.store(true, Ordering::SeqCst);
        info!(num_workers = self.config.num_workers, "Worker pool started");

        Ok(())
    }

    /// Gracefully shuts down all workers.
    ///
    /// Sends a shutdown signal to all workers and waits for them to finish
    /// their current jobs.
    ///
    /// # Errors
    ///
    /// Returns `PoolError::ShutdownTimeout` if workers don't stop within
    /// the configured timeout.
    pub async fn shutdown(&mut self) -> Result<(), PoolError> {
        if !self.is_running.load(Ordering::SeqCst) {
            return Err(PoolError::NotRunning);
        }

        info!("Initiating worker pool shutdown");

        // Ignore send error - workers may have already stopped
        let _ = self.shutdown_tx.send(());

        let shutdown_future = async {
            for handle in self.worker_handles.drain(..) {
                if let Err(e) = handle.await {
                    error!(error = %e, "Worker task panicked during shutdown");
                }
            }
        };

        match tokio::time::timeout(self.config.shutdown_timeout, shutdown_future).await {
            Ok(()) => {
                self.is_running.store(false, Ordering::SeqCst);
                info!("Worker pool shutdown complete");
                Ok(())
            }
            Err(_) => {
                self.is_running.store(false, Ordering::SeqCst);
                Err(PoolError::ShutdownTimeout(self.config.shutdown_timeout))
            }
        }
    }

    /// Returns current pool statistics.
    pub fn stats(&self) -> PoolStats {
        self.stats.to_pool_stats(self.config.num_workers)
    }

    /// Returns whether the pool is currently running.
    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::SeqCst)
    }

    /// Returns a reference to the job queue.
    pub fn queue(&self) -> &Arc<JobQueue> {
        &self.queue
    }
}

/// A single worker that processes jobs from the queue.
pub struct Worker {
    id: String,
    queue: Arc<JobQueue>,
    engine: Arc<DeployEngine>,
    store: Arc<dyn DeploymentStore>,
    shutdown_rx: broadcast::Receiver<()>,
    config: WorkerPoolConfig,
    stats: Arc<SharedPoolStats>,
}

impl Worker {
    fn new(
        id: String,
        queue: Arc<JobQueue>,
        engine: Arc<DeployEngine>,
        store: Arc<dyn DeploymentStore>,
        shutdown_rx: broadcast::Receiver<()>,
        config: WorkerPoolConfig,
        stats: Arc<SharedPoolStats>,
    ) -> Self {
        Self {
            id,
            queue,
            engine,
            store,
            shutdown_rx,
            config,
            stats,
        }
    }

    /// Main worker loop.
    ///
    /// Continuously polls for jobs and processes them until a shutdown
    /// signal is received. A job in flight is finished before the worker
    /// stops.
    async fn run(mut self) {
        info!(worker_id = %self.id, "Worker started");

        loop {
            match self.shutdown_rx.try_recv() {
                Ok(()) | Err(broadcast::error::TryRecvError::Closed) => {
                    info!(worker_id = %self.id, "Worker received shutdown signal");
                    break;
                }
                Err(broadcast::error::TryRecvError::Lagged(_)) => {
                    continue;
                }
                Err(broadcast::error::TryRecvError::Empty) => {}
            }

            match self.queue.dequeue(self.config.poll_interval).await {
                Ok(Some(job)) => {
                    self.process_job(job).await;
                }
                Ok(None) => {
                    // The blocking pop already waited poll_interval
                    debug!(worker_id = %self.id, "No jobs available");
                }
                Err(e) => {
                    error!(worker_id = %self.id, error = %e, "Failed to dequeue job");
                    tokio::time::sleep(self.config.poll_interval).await;
                }
            }
        }

        info!(worker_id = %self.id, "Worker stopped");
    }

    /// Processes a single job.
    async fn process_job(&self, mut job: Job) {
        let job_id = job.id;
        let start_time = Instant::now();

        job.increment_attempts();

        info!(
            worker_id = %self.id,
            job_id = %job_id,
            kind = job.payload.kind(),
            attempt = job.attempts,
            "Processing job"
        );

        self.stats.increment_active();
        let outcome = dispatch(&self.engine, &job, &self.id, self.config.job_timeout).await;
        let duration = start_time.elapsed();
        self.stats.decrement_active();

        match outcome {
            Dispatch::Done(mut result) => {
                result.duration_ms = duration.as_millis() as u64;
                if result.is_success() {
                    self.stats.record_completion(duration);
                    info!(
                        worker_id = %self.id,
                        job_id = %job_id,
                        duration_ms = duration.as_millis() as u64,
                        "Job completed successfully"
                    );
                } else {
                    self.stats.record_failure(duration);
                    warn!(
                        worker_id = %self.id,
                        job_id = %job_id,
                        status = %result.status,
                        error = ?result.error,
                        "Job completed with failure status"
                    );
                }

                if let Err(e) = self.queue.complete(job_id, &result).await {
                    error!(worker_id = %self.id, job_id = %job_id, error = %e, "Failed to mark job complete");
                }
            }
            Dispatch::Retry(error) => {
                self.stats.record_retry();

                let delay = retry_delay(self.config.retry_base_delay, job.attempts);
                warn!(
                    worker_id = %self.id,
                    job_id = %job_id,
                    error = %error,
                    attempt = job.attempts,
                    delay_secs = delay.as_secs(),
                    "Retryable failure, requeueing after backoff"
                );

                tokio::time::sleep(delay).await;
                if let Err(e) = self.queue.requeue(&job).await {
                    error!(worker_id = %self.id, job_id = %job_id, error = %e, "Failed to requeue job");
                }
            }
            Dispatch::GiveUp(error) => {
                self.stats.record_failure(duration);
                error!(
                    worker_id = %self.id,
                    job_id = %job_id,
                    error = %error,
                    "Job failed, moving to dead letter queue"
                );

                self.persist_failure(&job, &error).await;

                if let Err(e) = self.queue.dead_letter(&job, &error).await {
                    error!(worker_id = %self.id, job_id = %job_id, error = %e, "Failed to move job to dead letter queue");
                }

                let result = JobResult::failure(&job, &self.id, &error, duration.as_millis() as u64);
                if let Err(e) = self.queue.complete(job_id, &result).await {
                    error!(worker_id = %self.id, job_id = %job_id, error = %e, "Failed to store job result");
                }
            }
        }
    }

    /// Records a terminal failure on the deployment, best effort.
    async fn persist_failure(&self, job: &Job, error: &str) {
        let Some(deployment_id) = job.deployment_id() else {
            return;
        };

        if let Err(e) = self.store.mark_failed(deployment_id, error).await {
            warn!(
                worker_id = %self.id,
                deployment_id = %deployment_id,
                error = %e,
                "Failed to record deployment failure"
            );
        }
    }

    /// Returns the worker's ID.
    pub fn id(&self) -> &str {
        &self.id
    }
}

/// How a processed job leaves the worker.
enum Dispatch {
    /// Acknowledge with this result.
    Done(JobResult),
    /// Requeue for another attempt after backoff.
    Retry(String),
    /// Exhausted or terminal; dead-letter and record the failure.
    GiveUp(String),
}

/// Executes the job's payload under the deadline and classifies the outcome.
async fn dispatch(engine: &DeployEngine, job: &Job, worker_id: &str, job_timeout: Duration) -> Dispatch {
    let request = match &job.payload {
        JobPayload::Deploy(request) => request,
        JobPayload::Unknown => {
            // Unrecognized kinds are acknowledged with a failed result
            // rather than requeued; retrying cannot make them valid.
            warn!(worker_id, job_id = %job.id, "Unrecognized job kind, discarding");
            return Dispatch::Done(JobResult::failure(
                job,
                worker_id,
                "unrecognized job kind",
                0,
            ));
        }
    };

    match tokio::time::timeout(job_timeout, engine.deploy(request)).await {
        Ok(Ok(outcome)) => {
            info!(
                worker_id,
                job_id = %job.id,
                deployment_id = %outcome.deployment_id,
                url = %outcome.url,
                already_deployed = outcome.already_deployed,
                "Deployment succeeded"
            );
            Dispatch::Done(JobResult::success(job, worker_id, 0))
        }
        Ok(Err(e)) => {
            if e.is_retryable() && job.should_retry() {
                Dispatch::Retry(e.to_string())
            } else {
                Dispatch::GiveUp(e.to_string())
            }
        }
        Err(_) => {
            let message = format!("Deployment timed out after {}s", job_timeout.as_secs());
            // Timeouts are not retried; the partially built state was
            // already torn down where possible and the deadline suggests
            // the workload, not the infrastructure, is at fault.
            Dispatch::GiveUp(message)
        }
    }
}

/// Exponential backoff: `base * 2^(attempt - 1)`, capped at five minutes.
fn retry_delay(base: Duration, attempt: u32) -> Duration {
    const MAX_DELAY: Duration = Duration::from_secs(300);
    let exponent = attempt.saturating_sub(1).min(16);
    let delay = base.saturating_mul(1u32 << exponent);
    delay.min(MAX_DELAY)
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::Utc;
    use uuid::Uuid;

    use crate::engine::testing::{deploy_request, FakeRuntime, FakeStore, MemoryPortAllocator};
    use crate::engine::{ContainerRuntime, EngineConfig};

    fn engine(runtime: FakeRuntime, store: FakeStore) -> DeployEngine {
        DeployEngine::new(
            Arc::new(runtime) as Arc<dyn ContainerRuntime>,
            Arc::new(store) as Arc<dyn DeploymentStore>,
            Arc::new(MemoryPortAllocator::new(10000, 10999)),
            EngineConfig::default(),
        )
    }

    fn deploy_job(store: &FakeStore) -> Job {
        let (app_id, deployment_id) = (Uuid::new_v4(), Uuid::new_v4());
        store.insert_pending(deployment_id, app_id);
        Job::deploy(deploy_request(app_id, deployment_id))
    }

    #[tokio::test]
    async fn test_dispatch_acknowledges_unrecognized_kind() {
        let engine = engine(FakeRuntime::default(), FakeStore::default());
        let job = Job {
            id: Uuid::new_v4(),
            payload: JobPayload::Unknown,
            created_at: Utc::now(),
            attempts: 1,
            max_attempts: 3,
        };

        match dispatch(&engine, &job, "worker-0", Duration::from_secs(60)).await {
            Dispatch::Done(result) => {
                assert!(!result.is_success());
                assert_eq!(result.error.as_deref(), Some("unrecognized job kind"));
            }
            _ => panic!("unrecognized kind must be acknowledged, not requeued"),
        }
    }

    #[tokio::test]
    async fn test_dispatch_successful_deploy_is_done() {
        let store = FakeStore::default();
        let mut job = deploy_job(&store);
        job.increment_attempts();
        let engine = engine(FakeRuntime::default(), store);

        match dispatch(&engine, &job, "worker-0", Duration::from_secs(60)).await {
            Dispatch::Done(result) => assert!(result.is_success()),
            _ => panic!("expected success"),
        }
    }

    #[tokio::test]
    async fn test_dispatch_terminal_failure_gives_up() {
        let store = FakeStore::default();
        let mut job = deploy_job(&store);
        job.increment_attempts();
        let engine = engine(
            FakeRuntime {
                fail_build: true,
                ..Default::default()
            },
            store,
        );

        // A build failure is not retryable even with attempts left.
        match dispatch(&engine, &job, "worker-0", Duration::from_secs(60)).await {
            Dispatch::GiveUp(error) => assert!(error.contains("npm run build")),
            _ => panic!("build failure must not be retried"),
        }
    }

    #[tokio::test]
    async fn test_dispatch_retryable_failure_with_attempts_left() {
        let store = FakeStore {
            fail_mark_running: true,
            ..Default::default()
        };
        let mut job = deploy_job(&store);
        job.increment_attempts();
        let engine = engine(FakeRuntime::default(), store);

        match dispatch(&engine, &job, "worker-0", Duration::from_secs(60)).await {
            Dispatch::Retry(error) => assert!(error.contains("pg down")),
            _ => panic!("retryable failure with attempts left must be requeued"),
        }
    }

    #[tokio::test]
    async fn test_dispatch_retryable_failure_exhausted_gives_up() {
        let store = FakeStore {
            fail_mark_running: true,
            ..Default::default()
        };
        let mut job = deploy_job(&store).with_max_attempts(1);
        job.increment_attempts();
        let engine = engine(FakeRuntime::default(), store);

        match dispatch(&engine, &job, "worker-0", Duration::from_secs(60)).await {
            Dispatch::GiveUp(_) => {}
            _ => panic!("exhausted job must be dead-lettered"),
        }
    }

    #[tokio::test]
    async fn test_dispatch_deadline_overrun_gives_up() {
        let store = FakeStore::default();
        let mut job = deploy_job(&store);
        job.increment_attempts();
        let engine = engine(
            FakeRuntime {
                build_delay: Some(Duration::from_secs(30)),
                ..Default::default()
            },
            store,
        );

        match dispatch(&engine, &job, "worker-0", Duration::from_millis(50)).await {
            Dispatch::GiveUp(error) => assert!(error.contains("timed out")),
            _ => panic!("deadline overrun must not be retried"),
        }
    }

    #[test]
    fn test_worker_pool_config_default() {
        let config = WorkerPoolConfig::default();

        assert_eq!(config.num_workers, 1);
        assert_eq!(config.poll_interval, Duration::from_secs(1));
        assert_eq!(config.job_timeout, Duration::from_secs(1800));
        assert_eq!(config.retry_base_delay, Duration::from_secs(2));
        assert_eq!(config.shutdown_timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_worker_pool_config_builder() {
        let config = WorkerPoolConfig::new(4)
            .with_poll_interval(Duration::from_secs(5))
            .with_job_timeout(Duration::from_secs(3600))
            .with_retry_base_delay(Duration::from_secs(1))
            .with_shutdown_timeout(Duration::from_secs(120));

        assert_eq!(config.num_workers, 4);
        assert_eq!(config.poll_interval, Duration::from_secs(5));
        assert_eq!(config.job_timeout, Duration::from_secs(3600));
        assert_eq!(config.retry_base_delay, Duration::from_secs(1));
        assert_eq!(config.shutdown_timeout, Duration::from_secs(120));
    }

    #[test]
    fn test_retry_delay_doubles_per_attempt() {
        let base = Duration::from_secs(2);

        assert_eq!(retry_delay(base, 1), Duration::from_secs(2));
        assert_eq!(retry_delay(base, 2), Duration::from_secs(4));
        assert_eq!(retry_delay(base, 3), Duration::from_secs(8));
    }

    #[test]
    fn test_retry_delay_is_capped() {
        let base = Duration::from_secs(2);

        assert_eq!(retry_delay(base, 20), Duration::from_secs(300));
        assert_eq!(retry_delay(base, u32::MAX), Duration::from_secs(300));
    }

    #[test]
    fn test_pool_stats_totals() {
        let stats = SharedPoolStats::new();

        stats.record_completion(Duration::from_secs(10));
        stats.record_completion(Duration::from_secs(20));
        stats.record_failure(Duration::from_secs(5));
        stats.record_retry();

        let pool_stats = stats.to_pool_stats(2);

        assert_eq!(pool_stats.num_workers, 2);
        assert_eq!(pool_stats.jobs_completed, 2);
        assert_eq!(pool_stats.jobs_failed, 1);
        assert_eq!(pool_stats.jobs_retried, 1);
        assert_eq!(pool_stats.total_processed(), 3);
        // Average: (10000 + 20000 + 5000) / 3 ms
        assert!(pool_stats.average_job_duration.as_millis() > 11000);
        assert!(pool_stats.average_job_duration.as_millis() < 12000);
    }

    #[test]
    fn test_shared_pool_stats_active_workers() {
        let stats = SharedPoolStats::new();

        assert_eq!(stats.active_workers.load(Ordering::SeqCst), 0);

        stats.increment_active();
        stats.increment_active();
        assert_eq!(stats.active_workers.load(Ordering::SeqCst), 2);

        stats.decrement_active();
        assert_eq!(stats.active_workers.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_pool_error_display() {
        let err = PoolError::AlreadyRunning;
        assert!(err.to_string().contains("already running"));

        let err = PoolError::ShutdownTimeout(Duration::from_secs(60));
        assert!(err.to_string().contains("60"));
    }
}
