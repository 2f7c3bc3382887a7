//! Container build & run engine.
//!
//! The engine turns a deploy request into a running container: render the
//! build descriptor, build the image under a deadline, allocate a host port
//! through the store, start the container, and write the outcome back in a
//! single update. The Docker daemon is behind the `ContainerRuntime` seam
//! and port arbitration behind `PortAllocator`, so the composite operation
//! is testable without a daemon.

mod deployer;
mod ports;
mod runtime;
#[cfg(test)]
pub(crate) mod testing;

pub use deployer::{container_name, image_tag, DeployEngine, DeploymentOutcome, EngineConfig};
pub use ports::{PgPortAllocator, PortAllocator};
pub use runtime::{ContainerRuntime, DockerRuntime, RunSpec};
