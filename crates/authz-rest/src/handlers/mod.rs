//! HTTP request handlers for the authorization API.
//!
//! - [`nodes`] - Create, list, read, update and delete tree nodes
//! - [`tree`] - Children, descendants and ancestors of a node
//! - [`bulk`] - Partial-success batch operations
//! - [`permissions`] - Permission catalogue, grants and effective permissions
//! - [`assignments`] - Subject role assignments and authorization checks
//! - [`health`] - Health check endpoints
//!
//! Node routes are shared by both trees; the first path segment
//! (`organizations` or `roles`) selects the tree.

pub mod assignments;
pub mod bulk;
pub mod health;
pub mod nodes;
pub mod permissions;
pub mod tree;

use helios_authz::NodeKind;

use crate::error::{RestError, RestResult};

// Re-export handlers for convenience
pub use assignments::{
    assign_role_handler, authorize_handler, subject_permissions_handler, subject_roles_handler,
    unassign_role_handler,
};
pub use bulk::{bulk_change_parent_handler, bulk_delete_handler, bulk_update_handler};
pub use health::{health_handler, liveness_handler, readiness_handler};
pub use nodes::{create_handler, delete_handler, list_handler, read_handler, update_handler};
pub use permissions::{
    define_permission_handler, effective_permissions_handler, grant_permission_handler,
    list_permissions_handler, read_permission_handler, revoke_permission_handler,
    role_permissions_handler,
};
pub use tree::{ancestors_handler, children_handler, descendants_handler};

/// Resolves a collection path segment to the tree it names.
pub(crate) fn tree_kind(collection: &str) -> RestResult<NodeKind> {
    [NodeKind::Organization, NodeKind::Role]
        .into_iter()
        .find(|kind| kind.collection() == collection)
        .ok_or_else(|| RestError::NotFound {
            code: "NotFound",
            message: format!("Unknown collection: {}", collection),
        })
}
