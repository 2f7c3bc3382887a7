//! Build descriptor generation and the ephemeral build workspace.
//!
//! A build descriptor is the self-contained recipe (base image, checkout,
//! install, build, exposed port, start command) the container runtime
//! consumes to produce an image. Each application type has its own
//! generator; there is deliberately no generic templating mechanism.

mod descriptor;
mod workspace;

pub use descriptor::BuildDescriptor;
pub use workspace::BuildWorkspace;
