//! Container runtime seam and its Docker implementation.
//!
//! `ContainerRuntime` is the narrow contract the deploy engine needs from a
//! container runtime: build an image from a tar context, create and start a
//! container with one port binding, and tear both down again. The real
//! implementation wraps the local Docker daemon through bollard.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use bollard::container::{Config, CreateContainerOptions, RemoveContainerOptions, StartContainerOptions, StopContainerOptions};
use bollard::image::{BuildImageOptions, RemoveImageOptions};
use bollard::models::{HostConfig, PortBinding};
use bollard::Docker;
use futures::StreamExt;
use tracing::{debug, instrument, warn};

use crate::error::RuntimeError;

/// Everything needed to create and start one container.
#[derive(Debug, Clone)]
pub struct RunSpec {
    /// Image to run, e.g. `app-<appId>:latest`.
    pub image_tag: String,
    /// Stable, discoverable container name, e.g. `container-<appId>`.
    pub container_name: String,
    /// Port the application listens on inside the container.
    pub container_port: u16,
    /// Allocated host port the container port is bound to.
    pub host_port: u16,
}

/// Contract between the deploy engine and the container runtime.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Builds an image from a gzipped tar build context, streaming progress
    /// to completion. The deadline is enforced by the caller's timeout
    /// wrapper; exceeding it is a build failure.
    async fn build_image(&self, context: Vec<u8>, image_tag: &str) -> Result<(), RuntimeError>;

    /// Creates and starts a container. Returns the container id.
    ///
    /// On failure the implementation must not leave behind a container it
    /// created: a container that was created but failed to start is removed
    /// before the error is returned, so callers never have to clean up by
    /// name and risk touching a container some other attempt owns.
    async fn run_container(&self, spec: &RunSpec) -> Result<String, RuntimeError>;

    /// Stops a running container, tolerating one that already exited.
    async fn stop_container(&self, container_id: &str) -> Result<(), RuntimeError>;

    /// Force-removes a container.
    async fn remove_container(&self, container_id: &str) -> Result<(), RuntimeError>;

    /// Removes an image by tag.
    async fn remove_image(&self, image_tag: &str) -> Result<(), RuntimeError>;

    /// Whether a container with this id exists (any state).
    async fn container_exists(&self, container_id: &str) -> Result<bool, RuntimeError>;
}

/// Docker implementation of the container runtime contract.
pub struct DockerRuntime {
    docker: Docker,
}

impl DockerRuntime {
    /// Connects to the local Docker daemon.
    ///
    /// # Errors
    ///
    /// Returns `RuntimeError::DaemonUnavailable` if the daemon is not
    /// accessible.
    pub fn new() -> Result<Self, RuntimeError> {
        let docker = Docker::connect_with_local_defaults()
            .map_err(|e| RuntimeError::DaemonUnavailable(format!("Failed to connect: {e}")))?;

        Ok(Self { docker })
    }

    /// Creates a runtime from an existing bollard Docker instance.
    pub fn from_docker(docker: Docker) -> Self {
        Self { docker }
    }
}

/// Image build options: intermediate containers are removed even when the
/// build fails, so a broken Dockerfile never accumulates leftovers.
fn build_options(image_tag: &str) -> BuildImageOptions<String> {
    BuildImageOptions {
        dockerfile: "Dockerfile".to_string(),
        t: image_tag.to_string(),
        rm: true,
        forcerm: true,
        ..Default::default()
    }
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    #[instrument(skip(self, context), fields(context_bytes = context.len()))]
    async fn build_image(&self, context: Vec<u8>, image_tag: &str) -> Result<(), RuntimeError> {
        let options = build_options(image_tag);

        let mut stream = self
            .docker
            .build_image(options, None, Some(context.into()));

        // The build has succeeded only once the progress stream terminates
        // without an error frame.
        while let Some(frame) = stream.next().await {
            let info =
                frame.map_err(|e| RuntimeError::BuildFailed(format!("Build stream error: {e}")))?;

            if let Some(detail) = info.error {
                return Err(RuntimeError::BuildFailed(detail));
            }
            if let Some(progress) = info.stream {
                let progress = progress.trim_end();
                if !progress.is_empty() {
                    debug!(step = %progress, "Build progress");
                }
            }
        }

        Ok(())
    }

    async fn run_container(&self, spec: &RunSpec) -> Result<String, RuntimeError> {
        let exposed = format!("{}/tcp", spec.container_port);

        let port_bindings = HashMap::from([(
            exposed.clone(),
            Some(vec![PortBinding {
                host_ip: Some("0.0.0.0".to_string()),
                host_port: Some(spec.host_port.to_string()),
            }]),
        )]);

        let host_config = HostConfig {
            port_bindings: Some(port_bindings),
            ..Default::default()
        };

        let container_config = Config {
            image: Some(spec.image_tag.clone()),
            exposed_ports: Some(HashMap::from([(exposed, HashMap::new())])),
            host_config: Some(host_config),
            ..Default::default()
        };

        let options = CreateContainerOptions {
            name: spec.container_name.clone(),
            platform: None,
        };

        let response = self
            .docker
            .create_container(Some(options), container_config)
            .await
            .map_err(|e| RuntimeError::RunFailed(format!("Failed to create container: {e}")))?;

        if let Err(e) = self
            .docker
            .start_container(&response.id, None::<StartContainerOptions<String>>)
            .await
        {
            // Remove the container this call created so nothing is left
            // holding the name. Removal only ever targets our own id.
            let removal = RemoveContainerOptions {
                force: true,
                v: true,
                ..Default::default()
            };
            if let Err(cleanup) = self
                .docker
                .remove_container(&response.id, Some(removal))
                .await
            {
                warn!(
                    container_id = %response.id,
                    error = %cleanup,
                    "Failed to remove container after start failure"
                );
            }

            return Err(RuntimeError::RunFailed(format!(
                "Failed to start container: {e}"
            )));
        }

        Ok(response.id)
    }

    async fn stop_container(&self, container_id: &str) -> Result<(), RuntimeError> {
        let options = StopContainerOptions { t: 10 };

        self.docker
            .stop_container(container_id, Some(options))
            .await
            .map_err(|e| RuntimeError::RunFailed(format!("Failed to stop container: {e}")))?;

        Ok(())
    }

    async fn remove_container(&self, container_id: &str) -> Result<(), RuntimeError> {
        let options = RemoveContainerOptions {
            force: true,
            v: true,
            ..Default::default()
        };

        self.docker
            .remove_container(container_id, Some(options))
            .await
            .map_err(|e| RuntimeError::RunFailed(format!("Failed to remove container: {e}")))?;

        Ok(())
    }

    async fn remove_image(&self, image_tag: &str) -> Result<(), RuntimeError> {
        let options = RemoveImageOptions {
            force: true,
            ..Default::default()
        };

        self.docker
            .remove_image(image_tag, Some(options), None)
            .await
            .map_err(|e| RuntimeError::BuildFailed(format!("Failed to remove image: {e}")))?;

        Ok(())
    }

    async fn container_exists(&self, container_id: &str) -> Result<bool, RuntimeError> {
        match self.docker.inspect_container(container_id, None).await {
            Ok(_) => Ok(true),
            Err(e) if e.to_string().contains("No such container") => Ok(false),
            Err(e) => Err(RuntimeError::RunFailed(format!(
                "Failed to inspect container: {e}"
            ))),
        }
    }
}

/// Wraps a runtime call with a deadline; an elapsed deadline maps to
/// `RuntimeError::Timeout`.
pub(crate) async fn with_deadline<T>(
    deadline: Duration,
    fut: impl std::future::Future<Output = Result<T, RuntimeError>>,
) -> Result<T, RuntimeError> {
    match tokio::time::timeout(deadline, fut).await {
        Ok(result) => result,
        Err(_) => Err(RuntimeError::Timeout {
            seconds: deadline.as_secs(),
        }),
    }
}
