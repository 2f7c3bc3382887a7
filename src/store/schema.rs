//! Database schema constants.
//!
//! SQL definitions for the tables the pipeline owns. Applications and users
//! belong to the CRUD layer; `deployments.app_id` is a plain column here so
//! the core can run against a store it does not administer.

/// SQL schema for the deployments table.
pub const CREATE_DEPLOYMENTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS deployments (
    id UUID PRIMARY KEY,
    app_id UUID NOT NULL,
    status VARCHAR(16) NOT NULL DEFAULT 'pending',
    container_id TEXT,
    url TEXT,
    image_tag TEXT,
    error TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
)
"#;

/// Index for listing an application's deployments.
pub const CREATE_DEPLOYMENTS_APP_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_deployments_app_id ON deployments (app_id)
"#;

/// SQL schema for the port allocation table.
///
/// `port` is the primary key and `deployment_id` is unique: the database,
/// not worker memory, guarantees a port is never handed to two deployments
/// and a deployment never holds two ports. Rows cascade away with their
/// deployment.
pub const CREATE_PORT_ALLOCATIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS port_allocations (
    port INTEGER PRIMARY KEY,
    deployment_id UUID NOT NULL UNIQUE REFERENCES deployments(id) ON DELETE CASCADE,
    allocated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
)
"#;

/// Returns all schema statements in application order.
pub fn all_schema_statements() -> Vec<&'static str> {
    vec![
        CREATE_DEPLOYMENTS_TABLE,
        CREATE_DEPLOYMENTS_APP_INDEX,
        CREATE_PORT_ALLOCATIONS_TABLE,
    ]
}
