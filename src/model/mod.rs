//! Domain records shared across the pipeline.
//!
//! The application contract is owned by the CRUD layer and read-only here;
//! the deployment record is created pending by the enqueue path and mutated
//! exclusively by the worker afterwards.

mod app;
mod deployment;

pub use app::{AppType, Application, CommandDefaults};
pub use deployment::{Deployment, DeploymentStatus};
