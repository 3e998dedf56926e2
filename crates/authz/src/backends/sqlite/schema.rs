//! SQLite schema definitions and migrations.

use rusqlite::Connection;
use tracing::info;

use crate::error::{AuthzError, AuthzResult, BackendError};

/// Current schema version.
pub const SCHEMA_VERSION: i32 = 2;

/// Initialize the database schema.
pub fn initialize_schema(conn: &Connection) -> AuthzResult<()> {
    let current_version = get_schema_version(conn)?;

    if current_version == 0 {
        create_schema_v1(conn)?;
        set_schema_version(conn, 1)?;
        migrate_schema(conn, 1)?;
    } else if current_version < SCHEMA_VERSION {
        migrate_schema(conn, current_version)?;
    }

    Ok(())
}

fn migration_error(step: &str, e: rusqlite::Error) -> AuthzError {
    AuthzError::Backend(BackendError::MigrationError {
        message: format!("{}: {}", step, e),
    })
}

/// Get the current schema version.
pub fn get_schema_version(conn: &Connection) -> AuthzResult<i32> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER NOT NULL
        )",
        [],
    )
    .map_err(|e| migration_error("Failed to create schema_version table", e))?;

    let version: Option<i32> = conn
        .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
            row.get(0)
        })
        .ok();

    Ok(version.unwrap_or(0))
}

fn set_schema_version(conn: &Connection, version: i32) -> AuthzResult<()> {
    conn.execute("DELETE FROM schema_version", [])
        .map_err(|e| migration_error("Failed to clear schema_version", e))?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])
        .map_err(|e| migration_error("Failed to set schema_version", e))?;
    Ok(())
}

/// Create the initial schema (version 1): both trees and the permission catalogue.
fn create_schema_v1(conn: &Connection) -> AuthzResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS organizations (
            id TEXT PRIMARY KEY,
            parent_id TEXT REFERENCES organizations(id),
            attributes TEXT NOT NULL,
            version INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_organizations_parent ON organizations(parent_id);

        CREATE TABLE IF NOT EXISTS roles (
            id TEXT PRIMARY KEY,
            parent_id TEXT REFERENCES roles(id),
            tenant_id TEXT REFERENCES organizations(id),
            attributes TEXT NOT NULL,
            version INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_roles_parent ON roles(parent_id);
        CREATE INDEX IF NOT EXISTS idx_roles_tenant ON roles(tenant_id);

        CREATE TABLE IF NOT EXISTS permissions (
            id TEXT PRIMARY KEY,
            resource_id TEXT NOT NULL,
            action TEXT NOT NULL,
            UNIQUE (resource_id, action)
        );

        CREATE TABLE IF NOT EXISTS role_permissions (
            role_id TEXT NOT NULL REFERENCES roles(id) ON DELETE CASCADE,
            permission_id TEXT NOT NULL REFERENCES permissions(id) ON DELETE CASCADE,
            PRIMARY KEY (role_id, permission_id)
        );",
    )
    .map_err(|e| migration_error("Failed to create v1 schema", e))
}

/// Run migrations from the given version to the current version.
fn migrate_schema(conn: &Connection, from_version: i32) -> AuthzResult<()> {
    if from_version < 2 {
        migrate_v1_to_v2(conn)?;
        set_schema_version(conn, 2)?;
    }
    Ok(())
}

/// Version 2 adds subject role assignments.
fn migrate_v1_to_v2(conn: &Connection) -> AuthzResult<()> {
    info!("Migrating SQLite tree store schema to v2");
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS role_assignments (
            subject_id TEXT NOT NULL,
            role_id TEXT NOT NULL REFERENCES roles(id) ON DELETE CASCADE,
            assigned_at TEXT NOT NULL,
            PRIMARY KEY (subject_id, role_id)
        );
        CREATE INDEX IF NOT EXISTS idx_role_assignments_role ON role_assignments(role_id);",
    )
    .map_err(|e| migration_error("Failed to migrate to v2", e))
}
