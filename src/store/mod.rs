//! Postgres-backed deployment record sink.
//!
//! The store is the single arbitration point for the pipeline's shared
//! mutable state: deployment records and port allocations. Concurrent
//! workers never coordinate in process memory; uniqueness is enforced by
//! the database.

mod database;
mod migrations;
pub mod schema;

pub use database::{Database, DatabaseError, DeploymentStore};
pub use migrations::{MigrationError, MigrationRunner};
