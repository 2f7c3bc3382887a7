//! Job definitions for the deployment queue.
//!
//! A `Job` is the durable envelope stored in Redis: identity, retry
//! bookkeeping, and a tagged payload. Dispatch is by payload variant, each
//! carrying its typed request; unrecognized kinds decode into
//! `JobPayload::Unknown` so one malformed producer cannot poison a worker.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{AppType, Application};

/// Default maximum number of attempts before a job is dead-lettered.
const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Payload of a deploy job.
///
/// Immutable once enqueued. Every field required by the application type's
/// build descriptor must be present here; the worker does not re-resolve
/// command defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeployRequest {
    pub app_id: Uuid,
    pub deployment_id: Uuid,
    pub app_type: AppType,
    pub git_url: String,
    pub git_branch: String,
    /// Subfolder within the repository; "." means repository root.
    #[serde(default = "default_git_folder")]
    pub git_folder: String,
    /// Token injected into the clone URL for private repositories.
    #[serde(default)]
    pub git_token: Option<String>,
    #[serde(default)]
    pub environment: HashMap<String, String>,
    pub install_command: String,
    pub build_command: String,
    pub start_command: String,
}

fn default_git_folder() -> String {
    ".".to_string()
}

impl DeployRequest {
    /// Builds the request for one deployment of an application, resolving
    /// unset commands to the type defaults. The enqueue path calls this
    /// before creating the job; the worker never re-resolves.
    pub fn from_application(app: &Application, deployment_id: Uuid) -> Self {
        Self {
            app_id: app.id,
            deployment_id,
            app_type: app.app_type,
            git_url: app.git_url.clone(),
            git_branch: app.git_branch.clone(),
            git_folder: app.git_folder.clone(),
            git_token: app.git_token.clone(),
            environment: app.environment.clone(),
            install_command: app.resolved_install_command(),
            build_command: app.resolved_build_command(),
            start_command: app.resolved_start_command(),
        }
    }
}

/// Tagged job payload, dispatched on by the worker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum JobPayload {
    /// Build an image for the referenced deployment and run it.
    Deploy(DeployRequest),
    /// Any job kind this worker does not understand. Logged and
    /// acknowledged without side effects, never requeued.
    #[serde(other)]
    Unknown,
}

impl JobPayload {
    /// Short tag for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            JobPayload::Deploy(_) => "deploy",
            JobPayload::Unknown => "unknown",
        }
    }
}

/// Durable envelope for one unit of asynchronous work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// Unique identifier for this job (not the deployment).
    pub id: Uuid,
    pub payload: JobPayload,
    pub created_at: DateTime<Utc>,
    /// Number of times this job has been attempted.
    pub attempts: u32,
    /// Maximum attempts before the job moves to the dead letter queue.
    pub max_attempts: u32,
}

impl Job {
    /// Creates a deploy job with default retry settings.
    pub fn deploy(request: DeployRequest) -> Self {
        Self {
            id: Uuid::new_v4(),
            payload: JobPayload::Deploy(request),
            created_at: Utc::now(),
            attempts: 0,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Sets the maximum number of attempts.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Increments the attempt counter; called before each execution attempt.
    pub fn increment_attempts(&mut self) {
        self.attempts += 1;
    }

    /// Whether the job has attempts left after a retryable failure.
    pub fn should_retry(&self) -> bool {
        self.attempts < self.max_attempts
    }

    /// The deployment this job targets, if it is a deploy job.
    pub fn deployment_id(&self) -> Option<Uuid> {
        match &self.payload {
            JobPayload::Deploy(req) => Some(req.deployment_id),
            JobPayload::Unknown => None,
        }
    }
}

/// Final status of a processed job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Completed,
    Failed,
    Timeout,
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Failed => write!(f, "failed"),
            JobStatus::Timeout => write!(f, "timeout"),
        }
    }
}

/// Outcome reported back to the queue after processing a job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobResult {
    pub job_id: Uuid,
    pub status: JobStatus,
    pub deployment_id: Option<Uuid>,
    pub error: Option<String>,
    pub completed_at: DateTime<Utc>,
    pub worker_id: String,
    pub duration_ms: u64,
}

impl JobResult {
    /// Creates a successful result.
    pub fn success(job: &Job, worker_id: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            job_id: job.id,
            status: JobStatus::Completed,
            deployment_id: job.deployment_id(),
            error: None,
            completed_at: Utc::now(),
            worker_id: worker_id.into(),
            duration_ms,
        }
    }

    /// Creates a failed result carrying the error summary.
    pub fn failure(
        job: &Job,
        worker_id: impl Into<String>,
        error: impl Into<String>,
        duration_ms: u64,
    ) -> Self {
        Self {
            job_id: job.id,
            status: JobStatus::Failed,
            deployment_id: job.deployment_id(),
            error: Some(error.into()),
            completed_at: Utc::now(),
            worker_id: worker_id.into(),
            duration_ms,
        }
    }

    /// Creates a timeout result.
    pub fn timeout(job: &Job, worker_id: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            job_id: job.id,
            status: JobStatus::Timeout,
            deployment_id: job.deployment_id(),
            error: Some("Job execution timed out".to_string()),
            completed_at: Utc::now(),
            worker_id: worker_id.into(),
            duration_ms,
        }
    }

    /// Returns whether the job completed successfully.
    pub fn is_success(&self) -> bool {
        self.status == JobStatus::Completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn sample_request() -> DeployRequest {
        DeployRequest {
            app_id: Uuid::new_v4(),
            deployment_id: Uuid::new_v4(),
            app_type: AppType::WebApplication,
            git_url: "https://example.com/r.git".to_string(),
            git_branch: "main".to_string(),
            git_folder: ".".to_string(),
            git_token: None,
            environment: HashMap::new(),
            install_command: "npm install".to_string(),
            build_command: "npm run build".to_string(),
            start_command: "npm start".to_string(),
        }
    }

    #[test]
    fn test_from_application_resolves_default_commands() {
        let app = Application {
            id: Uuid::new_v4(),
            name: "trading-bot".to_string(),
            app_type: AppType::BotService,
            git_url: "https://example.com/bot.git".to_string(),
            git_branch: "main".to_string(),
            git_token: None,
            git_folder: ".".to_string(),
            environment: HashMap::new(),
            start_command: None,
            install_command: None,
            build_command: Some("pip install -e .".to_string()),
        };
        let deployment_id = Uuid::new_v4();

        let request = DeployRequest::from_application(&app, deployment_id);

        assert_eq!(request.app_id, app.id);
        assert_eq!(request.deployment_id, deployment_id);
        assert_eq!(request.install_command, "pip install -r requirements.txt");
        assert_eq!(request.build_command, "pip install -e .");
        assert_eq!(request.start_command, "python3 main.py");
    }

    #[test]
    fn test_deploy_job_roundtrip() {
        let job = Job::deploy(sample_request());
        let json = serde_json::to_string(&job).expect("serialize");
        let parsed: Job = serde_json::from_str(&json).expect("deserialize");

        assert_eq!(parsed.id, job.id);
        assert_eq!(parsed.payload, job.payload);
        assert_eq!(parsed.attempts, 0);
        assert_eq!(parsed.max_attempts, DEFAULT_MAX_ATTEMPTS);
    }

    #[test]
    fn test_payload_is_tagged_by_kind() {
        let job = Job::deploy(sample_request());
        let value = serde_json::to_value(&job).expect("serialize");
        assert_eq!(value["payload"]["kind"], "deploy");
    }

    #[test]
    fn test_unknown_kind_decodes_without_error() {
        let json = r#"{
            "id": "8f3c6a1e-0000-4000-8000-000000000001",
            "payload": {"kind": "provision-database", "size": "large"},
            "created_at": "2026-01-01T00:00:00Z",
            "attempts": 0,
            "max_attempts": 3
        }"#;
        let job: Job = serde_json::from_str(json).expect("unknown kinds must decode");
        assert_eq!(job.payload, JobPayload::Unknown);
        assert_eq!(job.payload.kind(), "unknown");
        assert!(job.deployment_id().is_none());
    }

    #[test]
    fn test_retry_accounting() {
        let mut job = Job::deploy(sample_request()).with_max_attempts(2);
        assert!(job.should_retry());
        job.increment_attempts();
        assert!(job.should_retry());
        job.increment_attempts();
        assert!(!job.should_retry());
    }

    #[test]
    fn test_result_carries_deployment_id() {
        let job = Job::deploy(sample_request());
        let expected = job.deployment_id();

        let ok = JobResult::success(&job, "worker-0", 1200);
        assert!(ok.is_success());
        assert_eq!(ok.deployment_id, expected);

        let failed = JobResult::failure(&job, "worker-0", "build exited 1", 800);
        assert!(!failed.is_success());
        assert_eq!(failed.error.as_deref(), Some("build exited 1"));

        let timed_out = JobResult::timeout(&job, "worker-0", 30_000);
        assert_eq!(timed_out.status, JobStatus::Timeout);
    }
}
