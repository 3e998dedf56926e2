//! Helios Authorization Core
//!
//! This crate manages two trees and answers permission questions over them:
//!
//! - an **organization** tree (global, one per deployment), and
//! - **role** trees, either global or scoped to a tenant organization.
//!
//! A role inherits every permission attached to its ancestors. All writes go
//! through the [`HierarchyManager`], which keeps both trees acyclic, keeps
//! role trees inside their tenant, and reports per-item outcomes for batch
//! operations.
//!
//! # Backend Features
//!
//! - `sqlite` (default) - SQLite storage with in-memory and file modes
//!
//! The [`InMemoryStore`](backends::memory::InMemoryStore) is always available.
//!
//! # Architecture
//!
//! - [`types`] - Nodes, patches, permissions and batch results
//! - [`error`] - Error types for all operations
//! - [`core`] - The [`TreeStore`] persistence contract
//! - [`backends`] - Store implementations
//! - [`hierarchy`] - Navigation, cycle prevention, permission resolution and writes
//! - [`config`] - Tunables for batch operations
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use helios_authz::{HierarchyManager, NodeKind};
//! use helios_authz::backends::memory::InMemoryStore;
//! use helios_authz::types::NewNode;
//!
//! # let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
//! # rt.block_on(async {
//! let manager = HierarchyManager::new(Arc::new(InMemoryStore::new()));
//!
//! let acme = manager.create(NewNode::organization().with_id("acme")).await?;
//! let admin = manager
//!     .create(NewNode::role(Some(acme.id.clone())).with_id("admin"))
//!     .await?;
//! let agent = manager
//!     .create(
//!         NewNode::role(Some(acme.id.clone()))
//!             .with_id("agent")
//!             .with_parent("admin"),
//!     )
//!     .await?;
//!
//! let manage = manager.define_permission("billing", "manage").await?;
//! manager.grant_permission(&admin.id, &manage.id).await?;
//!
//! // Inherited from "admin"
//! assert!(manager.is_authorized(&agent.id, "billing", "manage").await?);
//!
//! // Cycles are rejected
//! let err = manager
//!     .reparent(NodeKind::Role, &admin.id, Some(agent.id.clone()))
//!     .await
//!     .unwrap_err();
//! assert_eq!(err.code(), "CircularReference");
//! # Ok::<(), helios_authz::AuthzError>(())
//! # }).unwrap();
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod backends;
pub mod config;
pub mod core;
pub mod error;
pub mod hierarchy;
pub mod types;

// Re-export commonly used types at crate root
pub use config::HierarchyConfig;
pub use error::{AuthzError, AuthzResult};
pub use types::{
    BatchOutcome, EffectivePermissions, NewNode, Node, NodeId, NodeKind, NodePatch, Permission,
};

pub use core::TreeStore;
pub use hierarchy::HierarchyManager;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
