//! SQLite tree store.
//!
//! Supports in-memory databases (handy for tests) and file-based databases.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use helios_authz::backends::sqlite::SqliteStore;
//! use helios_authz::hierarchy::HierarchyManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Opening the store creates or migrates the schema.
//! let store = SqliteStore::open("authz.db")?;
//! let manager = HierarchyManager::new(Arc::new(store));
//! # Ok(())
//! # }
//! ```
//!
//! # Schema
//!
//! ```sql
//! CREATE TABLE organizations (
//!     id TEXT PRIMARY KEY,
//!     parent_id TEXT REFERENCES organizations(id),
//!     attributes TEXT NOT NULL,      -- JSON object
//!     version INTEGER NOT NULL,
//!     created_at TEXT NOT NULL,
//!     updated_at TEXT NOT NULL
//! );
//!
//! -- Same shape plus the owning organization.
//! CREATE TABLE roles (..., tenant_id TEXT REFERENCES organizations(id), ...);
//!
//! CREATE TABLE permissions (
//!     id TEXT PRIMARY KEY,
//!     resource_id TEXT NOT NULL,
//!     action TEXT NOT NULL,
//!     UNIQUE (resource_id, action)
//! );
//!
//! CREATE TABLE role_permissions (role_id, permission_id, PRIMARY KEY (role_id, permission_id));
//! CREATE TABLE role_assignments (subject_id, role_id, assigned_at, PRIMARY KEY (subject_id, role_id));
//! ```

mod backend;
mod schema;
mod storage;

pub use backend::{SqliteStore, SqliteStoreConfig};
pub use schema::SCHEMA_VERSION;
