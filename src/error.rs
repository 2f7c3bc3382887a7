//! Error types for shipwright operations.
//!
//! Defines the error taxonomy for the deployment pipeline:
//! - Job validation (rejected before any external call, never retried)
//! - Container runtime operations (image build, container create/start)
//! - The composite deploy operation, with retryability classification

use thiserror::Error;
use uuid::Uuid;

/// Errors raised while validating a deploy job before any external call.
///
/// Validation errors are terminal: the job is rejected without touching the
/// container runtime, the filesystem, or the store.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Missing required field '{0}' in deploy job")]
    MissingField(&'static str),

    #[error("Start command must be a non-empty, whitespace-tokenizable command")]
    EmptyStartCommand,

    #[error("Unsupported application type '{0}'")]
    UnsupportedAppType(String),

    #[error("Invalid environment variable key '{0}'")]
    InvalidEnvKey(String),
}

/// Errors raised by the container runtime (Docker via bollard).
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Image build failed: {0}")]
    BuildFailed(String),

    #[error("Container run failed: {0}")]
    RunFailed(String),

    #[error("Container '{id}' not found")]
    ContainerNotFound { id: String },

    #[error("Operation timed out after {seconds} seconds")]
    Timeout { seconds: u64 },

    #[error("Docker daemon not available: {0}")]
    DaemonUnavailable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by the composite deploy operation.
///
/// The variants mirror the failure channels of the pipeline. Only
/// infrastructure failures are retryable; validation, build, and run
/// failures are terminal per attempt.
#[derive(Debug, Error)]
pub enum DeployError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Build failed for deployment {deployment_id}: {detail}")]
    Build { deployment_id: Uuid, detail: String },

    #[error("Run failed for deployment {deployment_id}: {detail}")]
    Run { deployment_id: Uuid, detail: String },

    #[error("Deployment {0} not found in store")]
    DeploymentNotFound(Uuid),

    #[error("No free port available in the configured range")]
    PortsExhausted,

    #[error("Infrastructure error: {0}")]
    Infrastructure(String),
}

impl DeployError {
    /// Returns whether the failure may succeed on a later attempt.
    ///
    /// Infrastructure failures (daemon, store, or queue unreachable) are
    /// transient; everything else is terminal for this job.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DeployError::Infrastructure(_))
    }

    /// Classifies a runtime error into the matching deploy failure channel
    /// for the given deployment.
    pub fn from_runtime(deployment_id: Uuid, err: RuntimeError, building: bool) -> Self {
        match err {
            RuntimeError::DaemonUnavailable(msg) => DeployError::Infrastructure(msg),
            RuntimeError::Timeout { seconds } if building => DeployError::Build {
                deployment_id,
                detail: format!("build exceeded deadline of {seconds} seconds"),
            },
            other if building => DeployError::Build {
                deployment_id,
                detail: other.to_string(),
            },
            other => DeployError::Run {
                deployment_id,
                detail: other.to_string(),
            },
        }
    }
}
