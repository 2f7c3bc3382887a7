//! Command-line interface for shipwright.
//!
//! Provides commands for running the deployment worker, enqueueing
//! deployments, applying schema migrations, and inspecting queue state.

mod commands;

pub use commands::{parse_cli, run, run_with_cli, Cli};
