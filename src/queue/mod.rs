//! Durable job queue and the deployment worker.
//!
//! The queue decouples job submission (the CRUD layer) from execution (the
//! worker). Delivery is at-least-once: a job dequeued by a worker that
//! crashes before acknowledgment is recovered and redelivered, so handlers
//! must be idempotent per deployment.

mod job;
pub mod queue;
pub mod worker;

pub use job::{DeployRequest, Job, JobPayload, JobResult, JobStatus};
pub use queue::{JobQueue, QueueError, QueueStats};
pub use worker::{PoolError, PoolStats, Worker, WorkerPool, WorkerPoolConfig};
