//! Fakes behind the engine's seams, shared by engine and worker tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::RuntimeError;
use crate::model::{AppType, Deployment, DeploymentStatus};
use crate::queue::DeployRequest;
use crate::store::{DatabaseError, DeploymentStore};

use super::runtime::{ContainerRuntime, RunSpec};

pub(crate) use super::ports::testing::MemoryPortAllocator;

/// In-memory container runtime with switchable failure modes.
#[derive(Default)]
pub(crate) struct FakeRuntime {
    pub(crate) fail_build: bool,
    pub(crate) fail_run: bool,
    /// Stalls `build_image`, for exercising caller-side deadlines.
    pub(crate) build_delay: Option<Duration>,
    pub(crate) built_images: Mutex<Vec<String>>,
    pub(crate) removed_images: Mutex<Vec<String>>,
    pub(crate) containers: Mutex<Vec<String>>,
    pub(crate) removed_containers: Mutex<Vec<String>>,
    pub(crate) run_calls: Mutex<u32>,
}

#[async_trait]
impl ContainerRuntime for FakeRuntime {
    async fn build_image(&self, _context: Vec<u8>, tag: &str) -> Result<(), RuntimeError> {
        if let Some(delay) = self.build_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_build {
            return Err(RuntimeError::BuildFailed("npm run build exited 1".into()));
        }
        self.built_images.lock().unwrap().push(tag.to_string());
        Ok(())
    }

    async fn run_container(&self, spec: &RunSpec) -> Result<String, RuntimeError> {
        *self.run_calls.lock().unwrap() += 1;
        if self.fail_run {
            // Mirrors the real runtime's contract: a failed run leaves no
            // container of its own behind.
            return Err(RuntimeError::RunFailed("port is already allocated".into()));
        }
        let id = format!("ctr-{}", spec.container_name);
        self.containers.lock().unwrap().push(id.clone());
        Ok(id)
    }

    async fn stop_container(&self, _id: &str) -> Result<(), RuntimeError> {
        Ok(())
    }

    async fn remove_container(&self, id: &str) -> Result<(), RuntimeError> {
        self.removed_containers.lock().unwrap().push(id.to_string());
        self.containers.lock().unwrap().retain(|c| c != id);
        Ok(())
    }

    async fn remove_image(&self, tag: &str) -> Result<(), RuntimeError> {
        self.removed_images.lock().unwrap().push(tag.to_string());
        Ok(())
    }

    async fn container_exists(&self, id: &str) -> Result<bool, RuntimeError> {
        Ok(self.containers.lock().unwrap().iter().any(|c| c == id))
    }
}

/// In-memory deployment store.
#[derive(Default)]
pub(crate) struct FakeStore {
    pub(crate) deployments: Mutex<HashMap<Uuid, Deployment>>,
    pub(crate) fail_mark_running: bool,
}

impl FakeStore {
    pub(crate) fn insert_pending(&self, deployment_id: Uuid, app_id: Uuid) {
        let mut dep = Deployment::pending(app_id);
        dep.id = deployment_id;
        self.deployments.lock().unwrap().insert(deployment_id, dep);
    }

    pub(crate) fn get(&self, id: Uuid) -> Deployment {
        self.deployments.lock().unwrap().get(&id).unwrap().clone()
    }
}

#[async_trait]
impl DeploymentStore for FakeStore {
    async fn get_deployment(&self, id: Uuid) -> Result<Option<Deployment>, DatabaseError> {
        Ok(self.deployments.lock().unwrap().get(&id).cloned())
    }

    async fn mark_running(
        &self,
        id: Uuid,
        container_id: &str,
        url: &str,
        image_tag: &str,
    ) -> Result<(), DatabaseError> {
        if self.fail_mark_running {
            return Err(DatabaseError::ConnectionFailed("pg down".into()));
        }
        let mut deployments = self.deployments.lock().unwrap();
        let dep = deployments.get_mut(&id).ok_or(DatabaseError::NotFound(id))?;
        dep.status = DeploymentStatus::Running;
        dep.container_id = Some(container_id.to_string());
        dep.url = Some(url.to_string());
        dep.image_tag = Some(image_tag.to_string());
        dep.error = None;
        Ok(())
    }

    async fn mark_failed(&self, id: Uuid, error: &str) -> Result<(), DatabaseError> {
        let mut deployments = self.deployments.lock().unwrap();
        let dep = deployments.get_mut(&id).ok_or(DatabaseError::NotFound(id))?;
        dep.status = DeploymentStatus::Failed;
        dep.error = Some(error.to_string());
        Ok(())
    }

    async fn mark_stopped(&self, id: Uuid) -> Result<(), DatabaseError> {
        let mut deployments = self.deployments.lock().unwrap();
        let dep = deployments.get_mut(&id).ok_or(DatabaseError::NotFound(id))?;
        dep.status = DeploymentStatus::Stopped;
        dep.container_id = None;
        dep.url = None;
        Ok(())
    }
}

/// A minimal valid deploy request for a web application.
pub(crate) fn deploy_request(app_id: Uuid, deployment_id: Uuid) -> DeployRequest {
    DeployRequest {
        app_id,
        deployment_id,
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
