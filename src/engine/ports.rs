//! Host port allocation.
//!
//! Ports are shared mutable state across worker processes, so allocation is
//! arbitrated by the store rather than in-process memory: the allocator
//! probes the smallest free port in its range and claims it with an insert
//! that the `port_allocations` primary key makes race-safe. A lost race
//! simply moves on to the next candidate.

use async_trait::async_trait;
use tracing::debug;
use uuid::Uuid;

use crate::error::DeployError;
use crate::store::Database;

/// How many lost claim races to tolerate before giving up. Each retry
/// re-probes, so this only triggers when the range is nearly exhausted
/// under heavy contention.
const MAX_CLAIM_ATTEMPTS: u32 = 16;

/// Contract for host port arbitration.
#[async_trait]
pub trait PortAllocator: Send + Sync {
    /// Allocates a host port for a deployment.
    ///
    /// Idempotent per deployment: a redelivered job gets its original port
    /// back rather than a second allocation.
    async fn allocate(&self, deployment_id: Uuid) -> Result<u16, DeployError>;

    /// Releases a deployment's port, if it holds one.
    async fn release(&self, deployment_id: Uuid) -> Result<(), DeployError>;
}

/// Store-arbitrated port allocator over the `port_allocations` table.
pub struct PgPortAllocator {
    db: Database,
    range_start: u16,
    range_end: u16,
}

impl PgPortAllocator {
    /// Creates an allocator over an inclusive port range.
    pub fn new(db: Database, range_start: u16, range_end: u16) -> Self {
        Self {
            db,
            range_start,
            range_end,
        }
    }
}

#[async_trait]
impl PortAllocator for PgPortAllocator {
    async fn allocate(&self, deployment_id: Uuid) -> Result<u16, DeployError> {
        let existing = self
            .db
            .allocated_port(deployment_id)
            .await
            .map_err(|e| DeployError::Infrastructure(e.to_string()))?;

        if let Some(port) = existing {
            debug!(deployment_id = %deployment_id, port, "Reusing existing port allocation");
            return Ok(port);
        }

        for _ in 0..MAX_CLAIM_ATTEMPTS {
            let candidate = self
                .db
                .smallest_free_port(self.range_start, self.range_end)
                .await
                .map_err(|e| DeployError::Infrastructure(e.to_string()))?
                .ok_or(DeployError::PortsExhausted)?;

            let claimed = self
                .db
                .try_allocate_port(deployment_id, candidate)
                .await
                .map_err(|e| DeployError::Infrastructure(e.to_string()))?;

            if claimed {
                debug!(deployment_id = %deployment_id, port = candidate, "Allocated port");
                return Ok(candidate);
            }
            // Another worker claimed the candidate between probe and
            // insert; probe again.
        }

        Err(DeployError::PortsExhausted)
    }

    async fn release(&self, deployment_id: Uuid) -> Result<(), DeployError> {
        self.db
            .release_port(deployment_id)
            .await
            .map_err(|e| DeployError::Infrastructure(e.to_string()))
    }
}


#[cfg(test)]
mod tests {
    use super::testing::MemoryPortAllocator;
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_concurrent_allocations_are_distinct() {
        let allocator = Arc::new(MemoryPortAllocator::new(10000, 10999));

        let mut handles = Vec::new();
        for _ in 0..32 {
            let allocator = Arc::clone(&allocator);
            handles.push(tokio::spawn(async move {
                allocator.allocate(Uuid::new_v4()).await.expect("allocate")
            }));
        }

        let mut ports = HashSet::new();
        for handle in handles {
            let port = handle.await.expect("join");
            assert!(
                ports.insert(port),
                "port {port} handed out to two deployments"
            );
        }
        assert_eq!(ports.len(), 32);
    }

    #[tokio::test]
    async fn test_allocation_is_idempotent_per_deployment() {
        let allocator = MemoryPortAllocator::new(10000, 10999);
        let deployment_id = Uuid::new_v4();

        let first = allocator.allocate(deployment_id).await.expect("allocate");
        let second = allocator.allocate(deployment_id).await.expect("allocate");
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_exhausted_range_is_an_error() {
        let allocator = MemoryPortAllocator::new(10000, 10001);
        allocator.allocate(Uuid::new_v4()).await.expect("first");
        allocator.allocate(Uuid::new_v4()).await.expect("second");

        let err = allocator.allocate(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, DeployError::PortsExhausted));
    }
}
