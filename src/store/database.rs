//! PostgreSQL client for deployment records and port arbitration.
//!
//! Write-backs are all-or-nothing by construction: each state transition is
//! a single UPDATE statement, so a failure anywhere in the pipeline can
//! never leave a partially-updated record behind.

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use thiserror::Error;
use uuid::Uuid;

use crate::model::{Deployment, DeploymentStatus};

use super::migrations::MigrationRunner;

/// Errors that can occur during database operations.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Connection to the database failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(#[from] sqlx::Error),

    /// Record not found.
    #[error("Deployment {0} not found")]
    NotFound(Uuid),

    /// Migration error.
    #[error("Migration error: {0}")]
    Migration(#[from] super::migrations::MigrationError),
}

/// Narrow write contract between the worker and the record sink.
///
/// The worker is the exclusive mutator of deployment records after the
/// enqueue path creates them pending; this trait is the whole surface it
/// needs, and the seam test doubles stand behind.
#[async_trait]
pub trait DeploymentStore: Send + Sync {
    /// Fetches a deployment record by id.
    async fn get_deployment(&self, id: Uuid) -> Result<Option<Deployment>, DatabaseError>;

    /// Transitions a deployment to `running`, populating container id, url,
    /// and image tag together in one statement.
    async fn mark_running(
        &self,
        id: Uuid,
        container_id: &str,
        url: &str,
        image_tag: &str,
    ) -> Result<(), DatabaseError>;

    /// Transitions a deployment to `failed` with an error summary.
    async fn mark_failed(&self, id: Uuid, error: &str) -> Result<(), DatabaseError>;

    /// Transitions a deployment to `stopped`, clearing container id and
    /// url. The image tag is kept for a cheap redeploy.
    async fn mark_stopped(&self, id: Uuid) -> Result<(), DatabaseError>;
}

/// PostgreSQL database client.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Connects to the database and returns a new client.
    pub async fn connect(database_url: &str) -> Result<Self, DatabaseError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .min_connections(1)
            .acquire_timeout(std::time::Duration::from_secs(30))
            .connect(database_url)
            .await
            .map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))?;

        Ok(Self { pool })
    }

    /// Creates a client from an existing pool.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs database migrations.
    pub async fn run_migrations(&self) -> Result<(), DatabaseError> {
        let runner = MigrationRunner::new(self.pool.clone());
        runner.run_migrations().await?;
        Ok(())
    }

    /// Inserts a fresh pending deployment record.
    ///
    /// Used by the enqueue path only; the pipeline itself never creates
    /// records.
    pub async fn create_deployment(&self, deployment: &Deployment) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO deployments (id, app_id, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(deployment.id)
        .bind(deployment.app_id)
        .bind(deployment.status.to_string())
        .bind(deployment.created_at)
        .bind(deployment.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    // =========================================================================
    // Port allocation
    // =========================================================================

    /// Returns the port already allocated to a deployment, if any.
    ///
    /// Redelivered jobs reuse their original allocation instead of taking a
    /// second port.
    pub async fn allocated_port(&self, deployment_id: Uuid) -> Result<Option<u16>, DatabaseError> {
        let row = sqlx::query("SELECT port FROM port_allocations WHERE deployment_id = $1")
            .bind(deployment_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| r.get::<i32, _>("port") as u16))
    }

    /// Finds the smallest unallocated port in the inclusive range.
    pub async fn smallest_free_port(
        &self,
        range_start: u16,
        range_end: u16,
    ) -> Result<Option<u16>, DatabaseError> {
        let row = sqlx::query(
            r#"
            SELECT s.port
            FROM generate_series($1::int, $2::int) AS s(port)
            LEFT JOIN port_allocations p ON p.port = s.port
            WHERE p.port IS NULL
            ORDER BY s.port
            LIMIT 1
            "#,
        )
        .bind(range_start as i32)
        .bind(range_end as i32)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.get::<i32, _>("port") as u16))
    }

    /// Attempts to claim a specific port for a deployment.
    ///
    /// Returns `false` when another worker claimed the port first; the
    /// caller probes the next candidate. The primary key on `port` is the
    /// arbitration point.
    pub async fn try_allocate_port(
        &self,
        deployment_id: Uuid,
        port: u16,
    ) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
            r#"
            INSERT INTO port_allocations (port, deployment_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(port as i32)
        .bind(deployment_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Releases a deployment's port allocation.
    pub async fn release_port(&self, deployment_id: Uuid) -> Result<(), DatabaseError> {
        sqlx::query("DELETE FROM port_allocations WHERE deployment_id = $1")
            .bind(deployment_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

#[async_trait]
impl DeploymentStore for Database {
    async fn get_deployment(&self, id: Uuid) -> Result<Option<Deployment>, DatabaseError> {
        let deployment = sqlx::query_as::<_, Deployment>(
            r#"
            SELECT id, app_id, status, container_id, url, image_tag, error,
                   created_at, updated_at
            FROM deployments
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(deployment)
    }

    async fn mark_running(
        &self,
        id: Uuid,
        container_id: &str,
        url: &str,
        image_tag: &str,
    ) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            r#"
            UPDATE deployments
            SET status = $2, container_id = $3, url = $4, image_tag = $5,
                error = NULL, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(DeploymentStatus::Running.to_string())
        .bind(container_id)
        .bind(url)
        .bind(image_tag)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(id));
        }
        Ok(())
    }

    async fn mark_failed(&self, id: Uuid, error: &str) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            r#"
            UPDATE deployments
            SET status = $2, error = $3, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(DeploymentStatus::Failed.to_string())
        .bind(error)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(id));
        }
        Ok(())
    }

    async fn mark_stopped(&self, id: Uuid) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            r#"
            UPDATE deployments
            SET status = $2, container_id = NULL, url = NULL, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(DeploymentStatus::Stopped.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(id));
        }
        Ok(())
    }
}
