//! shipwright: Queue-driven container deployment orchestrator.
//!
//! This library turns git repositories into running containers: deployments
//! are submitted as durable jobs on a Redis queue, a worker pool renders a
//! build descriptor per application type, builds an image, runs it on a
//! store-arbitrated host port, and records the outcome in Postgres.

// Core modules
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod image;
pub mod model;
pub mod queue;
pub mod store;

// Re-export commonly used error types
pub use error::{DeployError, RuntimeError, ValidationError};
