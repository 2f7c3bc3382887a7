//! Deployment records and their status machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Status of a deployment.
///
/// Lifecycle: `pending` → `running` on success, `pending` → `failed` on any
/// failure. `building` is a transient phase that is never persisted.
/// `running` → `stopped` when the engine's stop operation tears the
/// container down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "VARCHAR", rename_all = "lowercase")]
pub enum DeploymentStatus {
    Pending,
    Running,
    Stopped,
    Failed,
}

impl std::fmt::Display for DeploymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeploymentStatus::Pending => write!(f, "pending"),
            DeploymentStatus::Running => write!(f, "running"),
            DeploymentStatus::Stopped => write!(f, "stopped"),
            DeploymentStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Persisted record of one attempt to run an application version.
///
/// Created in `pending` state by the enqueue path before the job exists on
/// the queue; mutated exclusively by the worker thereafter. `container_id`,
/// `url`, and `image_tag` are absent until the corresponding pipeline step
/// has succeeded, and are written back together in a single update.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Deployment {
    pub id: Uuid,
    pub app_id: Uuid,
    pub status: DeploymentStatus,
    pub container_id: Option<String>,
    pub url: Option<String>,
    pub image_tag: Option<String>,
    /// Error summary of the last failed attempt, if any.
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Deployment {
    /// Creates a fresh pending record for an application.
    pub fn pending(app_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            app_id,
            status: DeploymentStatus::Pending,
            container_id: None,
            url: None,
            image_tag: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// A deployment that already owns a container was processed before;
    /// redelivered jobs must skip re-creation.
    pub fn has_container(&self) -> bool {
        self.container_id.is_some()
    }
}
