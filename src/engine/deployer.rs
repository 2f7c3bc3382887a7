//! The composite deploy operation.
//!
//! `deploy` drives one deployment attempt end to end: load the record,
//! validate and render the build descriptor, build the image under a
//! deadline, allocate a host port through the store, start the container,
//! and write the outcome back in a single update. The record is either left
//! untouched or fully populated; any failure after a side effect tears that
//! side effect down so no container, image, port, or workspace dangles.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::error::DeployError;
use crate::image::{BuildDescriptor, BuildWorkspace};
use crate::queue::DeployRequest;
use crate::store::{DatabaseError, DeploymentStore};

use super::ports::PortAllocator;
use super::runtime::{with_deadline, ContainerRuntime, RunSpec};

/// Deterministic image tag for an application: `app-<appId>:latest`.
pub fn image_tag(app_id: Uuid) -> String {
    format!("app-{app_id}:latest")
}

/// Stable, discoverable container name for an application.
pub fn container_name(app_id: Uuid) -> String {
    format!("container-{app_id}")
}

/// Engine tunables.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Hostname used when composing deployment URLs.
    pub public_host: String,
    /// Deadline for one image build.
    pub build_timeout: Duration,
    /// Deadline for container create/start.
    pub run_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            public_host: "localhost".to_string(),
            build_timeout: Duration::from_secs(900),
            run_timeout: Duration::from_secs(60),
        }
    }
}

/// Result of a successful deploy.
#[derive(Debug, Clone, PartialEq)]
pub struct DeploymentOutcome {
    pub deployment_id: Uuid,
    pub container_id: String,
    pub url: String,
    pub image_tag: String,
    /// True when a redelivered job found the work already done.
    pub already_deployed: bool,
}

/// Build-and-run engine over the runtime, store, and allocator seams.
pub struct DeployEngine {
    runtime: Arc<dyn ContainerRuntime>,
    store: Arc<dyn DeploymentStore>,
    ports: Arc<dyn PortAllocator>,
    config: EngineConfig,
}

impl DeployEngine {
    pub fn new(
        runtime: Arc<dyn ContainerRuntime>,
        store: Arc<dyn DeploymentStore>,
        ports: Arc<dyn PortAllocator>,
        config: EngineConfig,
    ) -> Self {
        Self {
            runtime,
            store,
            ports,
            config,
        }
    }

    /// Runs one deployment attempt.
    ///
    /// Idempotent per deployment: a record that already has a container id
    /// is a redelivery and is skipped without creating anything, provided
    /// the container still exists.
    #[instrument(skip(self, request), fields(deployment_id = %request.deployment_id, app_id = %request.app_id))]
    pub async fn deploy(&self, request: &DeployRequest) -> Result<DeploymentOutcome, DeployError> {
        let deployment = self
            .store
            .get_deployment(request.deployment_id)
            .await
            .map_err(infra)?
            .ok_or(DeployError::DeploymentNotFound(request.deployment_id))?;

        if let Some(existing) = self.detect_redelivery(&deployment, request).await? {
            return Ok(existing);
        }

        // Validation and rendering happen before any side effect: a request
        // rejected here leaves no workspace, image, or allocation behind.
        let descriptor = BuildDescriptor::render(request)?;

        let workspace = BuildWorkspace::provision(request.deployment_id, &descriptor)
            .map_err(|e| DeployError::Infrastructure(e.to_string()))?;
        let context = workspace
            .build_context()
            .map_err(|e| DeployError::Infrastructure(e.to_string()))?;

        let tag = image_tag(request.app_id);
        info!(image_tag = %tag, "Building image");

        with_deadline(
            self.config.build_timeout,
            self.runtime.build_image(context, &tag),
        )
        .await
        .map_err(|e| DeployError::from_runtime(request.deployment_id, e, true))?;

        let host_port = match self.ports.allocate(request.deployment_id).await {
            Ok(port) => port,
            Err(e) => {
                self.discard_image(&tag).await;
                return Err(e);
            }
        };

        let spec = RunSpec {
            image_tag: tag.clone(),
            container_name: container_name(request.app_id),
            container_port: descriptor.container_port,
            host_port,
        };

        info!(container_name = %spec.container_name, host_port, "Starting container");

        let container_id =
            match with_deadline(self.config.run_timeout, self.runtime.run_container(&spec)).await {
                Ok(id) => id,
                Err(e) => {
                    // The runtime removes its own half-created container, so
                    // only the image and port are left to clean up here.
                    // Removing by name would risk destroying a live container
                    // another attempt for this application owns.
                    self.discard_image(&tag).await;
                    self.release_port(request.deployment_id).await;
                    return Err(DeployError::from_runtime(request.deployment_id, e, false));
                }
            };

        let url = format!("http://{}:{}", self.config.public_host, host_port);

        if let Err(e) = self
            .store
            .mark_running(request.deployment_id, &container_id, &url, &tag)
            .await
        {
            // The record was not updated; tear the container back down so
            // store and runtime stay consistent.
            self.discard_container(&container_id).await;
            self.discard_image(&tag).await;
            self.release_port(request.deployment_id).await;
            return Err(infra(e));
        }

        info!(container_id = %container_id, url = %url, "Deployment running");

        Ok(DeploymentOutcome {
            deployment_id: request.deployment_id,
            container_id,
            url,
            image_tag: tag,
            already_deployed: false,
        })
    }

    /// Stops a running deployment and records the transition.
    ///
    /// The container is stopped and removed and the port released; the
    /// image stays so a later redeploy of the same application is cheap. A
    /// container that already vanished is tolerated, a deployment without
    /// one is an error.
    #[instrument(skip(self), fields(deployment_id = %deployment_id))]
    pub async fn stop(&self, deployment_id: Uuid) -> Result<(), DeployError> {
        let deployment = self
            .store
            .get_deployment(deployment_id)
            .await
            .map_err(infra)?
            .ok_or(DeployError::DeploymentNotFound(deployment_id))?;

        let Some(container_id) = deployment.container_id.as_deref() else {
            return Err(DeployError::Run {
                deployment_id,
                detail: "deployment has no container to stop".to_string(),
            });
        };

        let exists = self
            .runtime
            .container_exists(container_id)
            .await
            .map_err(|e| DeployError::Infrastructure(e.to_string()))?;

        if exists {
            if let Err(e) = self.runtime.stop_container(container_id).await {
                warn!(container_id, error = %e, "Stop returned an error, removing anyway");
            }
            self.runtime
                .remove_container(container_id)
                .await
                .map_err(|e| DeployError::from_runtime(deployment_id, e, false))?;
        } else {
            warn!(container_id, "Recorded container already gone");
        }

        self.release_port(deployment_id).await;
        self.store.mark_stopped(deployment_id).await.map_err(infra)?;

        info!(container_id, "Deployment stopped");
        Ok(())
    }

    /// Checks whether a redelivered job already produced a container.
    ///
    /// At-least-once delivery means a job can arrive again after a fully or
    /// partially successful run. A record with a container id that still
    /// exists is done; if the container vanished underneath the record, the
    /// attempt is rerun from scratch.
    async fn detect_redelivery(
        &self,
        deployment: &crate::model::Deployment,
        request: &DeployRequest,
    ) -> Result<Option<DeploymentOutcome>, DeployError> {
        let Some(container_id) = deployment.container_id.as_deref() else {
            return Ok(None);
        };

        let exists = self
            .runtime
            .container_exists(container_id)
            .await
            .map_err(|e| DeployError::Infrastructure(e.to_string()))?;

        if exists {
            info!(container_id, "Deployment already has a live container, skipping re-creation");
            return Ok(Some(DeploymentOutcome {
                deployment_id: request.deployment_id,
                container_id: container_id.to_string(),
                url: deployment.url.clone().unwrap_or_default(),
                image_tag: deployment
                    .image_tag
                    .clone()
                    .unwrap_or_else(|| image_tag(request.app_id)),
                already_deployed: true,
            }));
        }

        warn!(container_id, "Recorded container no longer exists, redeploying");
        Ok(None)
    }

    /// Best-effort container removal during failure cleanup.
    async fn discard_container(&self, container: &str) {
        if let Err(e) = self.runtime.remove_container(container).await {
            warn!(container, error = %e, "Failed to remove container during cleanup");
        }
    }

    /// Best-effort image removal during failure cleanup.
    async fn discard_image(&self, tag: &str) {
        if let Err(e) = self.runtime.remove_image(tag).await {
            warn!(image_tag = tag, error = %e, "Failed to remove image during cleanup");
        }
    }

    /// Best-effort port release during failure cleanup.
    async fn release_port(&self, deployment_id: Uuid) {
        if let Err(e) = self.ports.release(deployment_id).await {
            warn!(deployment_id = %deployment_id, error = %e, "Failed to release port during cleanup");
        }
    }
}

fn infra(e: DatabaseError) -> DeployError {
    DeployError::Infrastructure(e.to_string())
}
