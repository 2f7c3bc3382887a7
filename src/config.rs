//! Orchestrator configuration.
//!
//! Configuration is read from environment variables with sensible defaults,
//! covering queue connectivity, the record store, port allocation, build and
//! run deadlines, and worker behaviour.

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable has an invalid value.
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    /// Configuration validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Configuration for the deployment orchestrator.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    // Queue settings
    /// Redis connection URL.
    pub redis_url: String,
    /// Name of the deployment job queue.
    pub queue_name: String,
    /// How long a dequeue blocks waiting for a job.
    pub poll_interval: Duration,

    // Store settings
    /// PostgreSQL connection URL for deployment records.
    pub database_url: String,

    // Worker settings
    /// Number of consumer slots in this worker process.
    pub workers: usize,
    /// Maximum attempts before a job is dead-lettered.
    pub max_attempts: u32,
    /// Base delay for exponential retry backoff.
    pub retry_base_delay: Duration,
    /// Overall deadline for processing a single job.
    pub job_timeout: Duration,
    /// Timeout for graceful worker shutdown.
    pub shutdown_timeout: Duration,

    // Engine settings
    /// Deadline for one image build.
    pub build_timeout: Duration,
    /// Deadline for container create/start calls.
    pub run_timeout: Duration,
    /// Hostname used when composing deployment URLs.
    pub public_host: String,
    /// First host port handed out by the allocator (inclusive).
    pub port_range_start: u16,
    /// Last host port handed out by the allocator (inclusive).
    pub port_range_end: u16,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://localhost:6379".to_string(),
            queue_name: "deployments".to_string(),
            poll_interval: Duration::from_secs(1),
            database_url: "postgres://localhost/shipwright".to_string(),
            workers: 1,
            max_attempts: 3,
            retry_base_delay: Duration::from_secs(2),
            job_timeout: Duration::from_secs(1800),
            shutdown_timeout: Duration::from_secs(60),
            build_timeout: Duration::from_secs(900),
            run_timeout: Duration::from_secs(60),
            public_host: "localhost".to_string(),
            port_range_start: 10000,
            port_range_end: 10999,
        }
    }
}

impl OrchestratorConfig {
    /// Loads configuration from environment variables.
    ///
    /// Unset variables fall back to defaults. Set variables that fail to
    /// parse are an error rather than silently ignored.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("REDIS_URL") {
            config.redis_url = url;
        }
        if let Ok(name) = std::env::var("QUEUE_NAME") {
            config.queue_name = name;
        }
        if let Ok(url) = std::env::var("DATABASE_URL") {
            config.database_url = url;
        }
        if let Ok(host) = std::env::var("PUBLIC_HOST") {
            config.public_host = host;
        }

        config.workers = parse_env("WORKERS", config.workers)?;
        config.max_attempts = parse_env("MAX_ATTEMPTS", config.max_attempts)?;
        config.port_range_start = parse_env("PORT_RANGE_START", config.port_range_start)?;
        config.port_range_end = parse_env("PORT_RANGE_END", config.port_range_end)?;

        config.poll_interval = parse_env_secs("POLL_INTERVAL_SECS", config.poll_interval)?;
        config.retry_base_delay = parse_env_secs("RETRY_BASE_DELAY_SECS", config.retry_base_delay)?;
        config.job_timeout = parse_env_secs("JOB_TIMEOUT_SECS", config.job_timeout)?;
        config.shutdown_timeout = parse_env_secs("SHUTDOWN_TIMEOUT_SECS", config.shutdown_timeout)?;
        config.build_timeout = parse_env_secs("BUILD_TIMEOUT_SECS", config.build_timeout)?;
        config.run_timeout = parse_env_secs("RUN_TIMEOUT_SECS", config.run_timeout)?;

        config.validate()?;
        Ok(config)
    }

    /// Validates invariants across fields.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::ValidationFailed(
                "workers must be at least 1".to_string(),
            ));
        }
        if self.max_attempts == 0 {
            return Err(ConfigError::ValidationFailed(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        if self.port_range_start > self.port_range_end {
            return Err(ConfigError::ValidationFailed(format!(
                "port range start {} exceeds end {}",
                self.port_range_start, self.port_range_end
            )));
        }
        if self.public_host.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "public_host must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(value) => value.parse().map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("{e}"),
        }),
        Err(_) => Ok(default),
    }
}

fn parse_env_secs(key: &str, default: Duration) -> Result<Duration, ConfigError> {
    Ok(Duration::from_secs(parse_env(key, default.as_secs())?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = OrchestratorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.queue_name, "deployments");
        assert_eq!(config.workers, 1);
        assert!(config.port_range_start < config.port_range_end);
    }

    #[test]
    fn test_validate_rejects_inverted_port_range() {
        let config = OrchestratorConfig {
            port_range_start: 11000,
            port_range_end: 10000,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_workers() {
        let config = OrchestratorConfig {
            workers: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_attempts() {
        let config = OrchestratorConfig {
            max_attempts: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
