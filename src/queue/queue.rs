//! Redis-based deployment job queue with reliable dequeue.
//!
//! The queue uses three Redis lists:
//!
//! - `{queue_name}`: main queue where jobs are enqueued
//! - `{queue_name}:processing`: jobs being processed (for crash recovery)
//! - `{queue_name}:dead_letter`: jobs that failed after max attempts
//!
//! Jobs are atomically moved from the main queue to the processing queue
//! with BRPOPLPUSH. If a worker crashes before acknowledging, the job is
//! recovered on the next worker startup and redelivered, giving
//! at-least-once delivery. Enqueue is durable before it returns: the LPUSH
//! has been accepted by Redis when `enqueue` resolves. FIFO ordering is
//! best-effort, not a correctness requirement; handlers are idempotent per
//! deployment instead.

use std::time::Duration;

use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use thiserror::Error;
use uuid::Uuid;

use super::job::{Job, JobResult};

/// How long completed job results are kept, in seconds (7 days).
const RESULT_TTL_SECS: u64 = 604_800;

/// Errors that can occur during queue operations.
#[derive(Debug, Error)]
pub enum QueueError {
    /// Failed to connect to Redis.
    #[error("Redis connection failed: {0}")]
    ConnectionFailed(String),

    /// Redis operation failed.
    #[error("Redis operation failed: {0}")]
    RedisError(#[from] redis::RedisError),

    /// Failed to serialize or deserialize a job.
    #[error("Serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),

    /// Job not found in the queue.
    #[error("Job {0} not found")]
    JobNotFound(Uuid),
}

/// Redis-backed job queue for deployment work.
pub struct JobQueue {
    /// Redis connection manager (handles reconnection automatically).
    redis: ConnectionManager,
    queue_name: String,
    processing_queue: String,
    dead_letter_queue: String,
    results_key: String,
}

impl JobQueue {
    /// Connects to Redis and creates a new job queue.
    ///
    /// # Errors
    ///
    /// Returns `QueueError::ConnectionFailed` if the connection fails.
    pub async fn connect(redis_url: &str, queue_name: &str) -> Result<Self, QueueError> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| QueueError::ConnectionFailed(e.to_string()))?;

        let redis = ConnectionManager::new(client)
            .await
            .map_err(|e| QueueError::ConnectionFailed(e.to_string()))?;

        Ok(Self::from_connection(redis, queue_name))
    }

    /// Creates a JobQueue from an existing connection manager.
    pub fn from_connection(redis: ConnectionManager, queue_name: &str) -> Self {
        Self {
            redis,
            queue_name: queue_name.to_string(),
            processing_queue: format!("{}:processing", queue_name),
            dead_letter_queue: format!("{}:dead_letter", queue_name),
            results_key: format!("{}:results", queue_name),
        }
    }

    /// Enqueues a job. Durable before this returns.
    pub async fn enqueue(&self, job: &Job) -> Result<(), QueueError> {
        let serialized = serde_json::to_string(job)?;
        let mut conn = self.redis.clone();
        conn.lpush::<_, _, ()>(&self.queue_name, serialized).await?;
        Ok(())
    }

    /// Dequeues the next job, blocking until one is available or the
    /// timeout elapses.
    ///
    /// BRPOPLPUSH atomically moves the job into the processing queue so a
    /// crashed worker cannot lose it.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(job))` if a job was dequeued
    /// - `Ok(None)` if the timeout expired with no job available
    pub async fn dequeue(&self, timeout: Duration) -> Result<Option<Job>, QueueError> {
        let mut conn = self.redis.clone();
        let timeout_secs = timeout.as_secs().max(1) as usize;

        let result: Option<String> = redis::cmd("BRPOPLPUSH")
            .arg(&self.queue_name)
            .arg(&self.processing_queue)
            .arg(timeout_secs)
            .query_async(&mut conn)
            .await?;

        match result {
            Some(data) => {
                let job: Job = serde_json::from_str(&data)?;
                Ok(Some(job))
            }
            None => Ok(None),
        }
    }

    /// Acknowledges a job: stores its result and removes it from the
    /// processing queue.
    pub async fn complete(&self, job_id: Uuid, result: &JobResult) -> Result<(), QueueError> {
        let mut conn = self.redis.clone();

        let result_key = format!("{}:{}", self.results_key, job_id);
        let result_data = serde_json::to_string(result)?;
        conn.set_ex::<_, _, ()>(&result_key, &result_data, RESULT_TTL_SECS)
            .await?;

        self.remove_from_processing(job_id).await
    }

    /// Returns a job to the main queue for a later retry attempt.
    ///
    /// The job's attempt counter must already be incremented. The job is
    /// pushed to the tail, so other pending work is not starved by a
    /// repeatedly failing job.
    pub async fn requeue(&self, job: &Job) -> Result<(), QueueError> {
        self.remove_from_processing(job.id).await?;

        let serialized = serde_json::to_string(job)?;
        let mut conn = self.redis.clone();
        conn.rpush::<_, _, ()>(&self.queue_name, serialized).await?;
        Ok(())
    }

    /// Moves a job to the dead letter queue after exhausting its attempts.
    pub async fn dead_letter(&self, job: &Job, error: &str) -> Result<(), QueueError> {
        self.remove_from_processing(job.id).await?;

        let entry = serde_json::json!({
            "job": job,
            "error": error,
            "moved_at": chrono::Utc::now().to_rfc3339(),
        });
        let serialized = serde_json::to_string(&entry)?;

        let mut conn = self.redis.clone();
        conn.lpush::<_, _, ()>(&self.dead_letter_queue, serialized)
            .await?;
        Ok(())
    }

    /// Recovers jobs stuck in the processing queue.
    ///
    /// Called on worker startup to reclaim jobs from workers that crashed
    /// mid-processing. Recovered jobs count as an attempt; jobs that are
    /// out of attempts go to the dead letter queue instead.
    ///
    /// # Returns
    ///
    /// The number of jobs moved back to the main queue.
    pub async fn recover_processing_jobs(&self) -> Result<usize, QueueError> {
        let mut conn = self.redis.clone();
        let mut recovered = 0;

        let jobs: Vec<String> = conn.lrange(&self.processing_queue, 0, -1).await?;

        for job_data in jobs {
            if let Ok(mut job) = serde_json::from_str::<Job>(&job_data) {
                job.increment_attempts();

                if job.should_retry() {
                    let serialized = serde_json::to_string(&job)?;

                    let mut pipe = redis::pipe();
                    pipe.atomic()
                        .lrem(&self.processing_queue, 1, &job_data)
                        .rpush(&self.queue_name, &serialized);
                    pipe.query_async::<_, ()>(&mut conn).await?;

                    recovered += 1;
                } else {
                    self.dead_letter(&job, "Recovered from processing queue after max attempts")
                        .await?;
                }
            }
        }

        Ok(recovered)
    }

    /// Retrieves a job result by job ID, if still retained.
    pub async fn get_result(&self, job_id: Uuid) -> Result<Option<JobResult>, QueueError> {
        let mut conn = self.redis.clone();
        let result_key = format!("{}:{}", self.results_key, job_id);

        let data: Option<String> = conn.get(&result_key).await?;
        match data {
            Some(s) => Ok(Some(serde_json::from_str(&s)?)),
            None => Ok(None),
        }
    }

    /// Returns the number of jobs waiting in the main queue.
    pub async fn len(&self) -> Result<usize, QueueError> {
        let mut conn = self.redis.clone();
        let len: usize = conn.llen(&self.queue_name).await?;
        Ok(len)
    }

    /// Returns whether the main queue is empty.
    pub async fn is_empty(&self) -> Result<bool, QueueError> {
        Ok(self.len().await? == 0)
    }

    /// Returns queue statistics.
    pub async fn stats(&self) -> Result<QueueStats, QueueError> {
        let mut conn = self.redis.clone();
        let pending: usize = conn.llen(&self.queue_name).await?;
        let processing: usize = conn.llen(&self.processing_queue).await?;
        let dead_letter: usize = conn.llen(&self.dead_letter_queue).await?;

        Ok(QueueStats {
            queue_name: self.queue_name.clone(),
            pending_jobs: pending,
            processing_jobs: processing,
            dead_letter_jobs: dead_letter,
        })
    }

    /// Helper to remove a job from the processing queue by ID.
    ///
    /// A job that is already gone is not an error; crash recovery may have
    /// moved it first.
    async fn remove_from_processing(&self, job_id: Uuid) -> Result<(), QueueError> {
        let mut conn = self.redis.clone();

        let jobs: Vec<String> = conn.lrange(&self.processing_queue, 0, -1).await?;
        for job_data in jobs {
            if let Ok(job) = serde_json::from_str::<Job>(&job_data) {
                if job.id == job_id {
                    conn.lrem::<_, _, ()>(&self.processing_queue, 1, &job_data)
                        .await?;
                    return Ok(());
                }
            }
        }

        Ok(())
    }

    /// Returns the queue name.
    pub fn queue_name(&self) -> &str {
        &self.queue_name
    }
}

/// Statistics about queue state.
#[derive(Debug, Clone)]
pub struct QueueStats {
    pub queue_name: String,
    /// Jobs waiting to be processed.
    pub pending_jobs: usize,
    /// Jobs currently being processed.
    pub processing_jobs: usize,
    /// Jobs that exhausted their attempts.
    pub dead_letter_jobs: usize,
}

impl QueueStats {
    /// Total jobs across all queues.
    pub fn total_jobs(&self) -> usize {
        self.pending_jobs + self.processing_jobs + self.dead_letter_jobs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::job::JobPayload;

    #[test]
    fn test_queue_error_display() {
        let err = QueueError::ConnectionFailed("timeout".to_string());
        assert!(err.to_string().contains("timeout"));

        let err = QueueError::JobNotFound(Uuid::new_v4());
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_queue_stats_totals() {
        let stats = QueueStats {
            queue_name: "deployments".to_string(),
            pending_jobs: 4,
            processing_jobs: 1,
            dead_letter_jobs: 2,
        };
        assert_eq!(stats.total_jobs(), 7);
    }

    #[test]
    fn test_dead_letter_entry_structure() {
        let job = Job {
            id: Uuid::new_v4(),
            payload: JobPayload::Unknown,
            created_at: chrono::Utc::now(),
            attempts: 3,
            max_attempts: 3,
        };

        let entry = serde_json::json!({
            "job": job,
            "error": "build exited 1",
            "moved_at": chrono::Utc::now().to_rfc3339(),
        });

        let serialized = serde_json::to_string(&entry).expect("entry should serialize");
        let parsed: serde_json::Value = serde_json::from_str(&serialized).expect("parse back");

        assert!(parsed.get("job").is_some());
        assert_eq!(parsed["error"], "build exited 1");
        assert!(parsed.get("moved_at").is_some());
    }
}
