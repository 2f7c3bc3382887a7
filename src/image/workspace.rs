//! Ephemeral per-deployment build workspaces.
//!
//! Each deployment attempt gets its own temporary directory, keyed by
//! deploymentId so concurrent deployments of the same application never
//! collide. The directory holds the rendered Dockerfile and is removed when
//! the workspace is dropped, on every exit path: success, build failure,
//! timeout, and panic unwinds alike.

use std::path::Path;

use flate2::write::GzEncoder;
use flate2::Compression;
use tempfile::TempDir;
use tracing::debug;
use uuid::Uuid;

use super::descriptor::BuildDescriptor;
use crate::error::RuntimeError;

/// A job-scoped workspace directory holding the build specification.
pub struct BuildWorkspace {
    dir: TempDir,
    deployment_id: Uuid,
}

impl BuildWorkspace {
    /// Creates the workspace and writes the descriptor's Dockerfile into it.
    pub fn provision(
        deployment_id: Uuid,
        descriptor: &BuildDescriptor,
    ) -> Result<Self, RuntimeError> {
        let dir = tempfile::Builder::new()
            .prefix(&format!("deploy-{deployment_id}-"))
            .tempdir()?;

        std::fs::write(dir.path().join("Dockerfile"), &descriptor.dockerfile)?;

        debug!(
            deployment_id = %deployment_id,
            path = %dir.path().display(),
            "Provisioned build workspace"
        );

        Ok(Self { dir, deployment_id })
    }

    /// Path of the workspace directory.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// The deployment this workspace belongs to.
    pub fn deployment_id(&self) -> Uuid {
        self.deployment_id
    }

    /// Packs the workspace into a gzipped tar archive, the build context
    /// format the container runtime consumes.
    pub fn build_context(&self) -> Result<Vec<u8>, RuntimeError> {
        let encoder = GzEncoder::new(Vec::new(), Compression::default());
        let mut tar = tar::Builder::new(encoder);

        tar.append_dir_all(".", self.dir.path())?;
        let encoder = tar.into_inner()?;
        Ok(encoder.finish()?)
    }
}
