//! Core types for the authorization trees.
//!
//! - [`NodeId`], [`Node`], [`NodeKind`], [`TenantScope`] - tree nodes
//! - [`NewNode`], [`NodePatch`] - mutation inputs
//! - [`Permission`], [`PermissionKey`], [`EffectivePermissions`] - grants
//! - [`BatchOutcome`], [`BatchItemError`] - partial-success batch results

mod batch;
mod id;
mod node;
mod patch;
mod permission;

pub use batch::{BatchItemError, BatchOutcome};
pub use id::NodeId;
pub use node::{NewNode, Node, NodeKind, TenantScope};
pub use patch::NodePatch;
pub use permission::{EffectivePermissions, Permission, PermissionKey};
