//! Tree storage trait.
//!
//! This module defines the [`TreeStore`] trait, the persistence seam of the
//! authorization core. Stores are deliberately dumb: they persist exactly
//! what they are told and never validate tree invariants. All invariant
//! checks live in the [`HierarchyManager`](crate::hierarchy::HierarchyManager),
//! which serializes writers before calling into the store.

use std::collections::{HashSet, VecDeque};

use async_trait::async_trait;

use crate::error::AuthzResult;
use crate::types::{Node, NodeId, NodeKind, NodePatch, Permission};

/// A role, the rows of its parent chain and the direct grants of all of
/// them, read together.
#[derive(Debug, Clone)]
pub struct RoleGrants {
    /// The role itself.
    pub role: Node,
    /// The chain above the role, unordered, as [`TreeStore::ancestor_rows`]
    /// returns it.
    pub ancestor_rows: Vec<Node>,
    /// `(role id, permission)` pairs for the role and every ancestor row.
    pub grants: Vec<(NodeId, Permission)>,
}

/// Persistence for organization and role trees, permissions and role
/// assignments.
///
/// # Consistency
///
/// Every method observes and produces committed state only. Multi-row
/// writes ([`patch_nodes`](Self::patch_nodes), [`remove_node`](Self::remove_node))
/// are atomic: either every row changes or none does. The `*_snapshot`
/// reads return rows that were all committed together; the provided
/// defaults compose single reads and only backends without a snapshot
/// mechanism should rely on them.
///
/// # Ordering
///
/// Methods returning several nodes of one parent return them in creation
/// order (creation time ascending, ties broken by insertion order).
#[async_trait]
pub trait TreeStore: Send + Sync {
    /// Returns a human-readable name for this storage backend.
    fn backend_name(&self) -> &'static str;

    /// Verifies that the backend can serve requests.
    async fn health_check(&self) -> AuthzResult<()> {
        Ok(())
    }

    // ------------------------------------------------------------------
    // Nodes
    // ------------------------------------------------------------------

    /// Inserts a new node.
    ///
    /// # Errors
    ///
    /// * `HierarchyError::AlreadyExists` - If a node with the same kind and id exists
    async fn insert_node(&self, node: &Node) -> AuthzResult<()>;

    /// Reads a node by kind and id.
    async fn get_node(&self, kind: NodeKind, id: &NodeId) -> AuthzResult<Option<Node>>;

    /// Reads several nodes. Missing ids are skipped.
    async fn get_nodes(&self, kind: NodeKind, ids: &[NodeId]) -> AuthzResult<Vec<Node>> {
        let mut nodes = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(node) = self.get_node(kind, id).await? {
                nodes.push(node);
            }
        }
        Ok(nodes)
    }

    /// Lists every node of a kind in creation order.
    async fn list_nodes(&self, kind: NodeKind) -> AuthzResult<Vec<Node>>;

    /// Lists the direct children of a node in creation order.
    async fn list_children(&self, kind: NodeKind, id: &NodeId) -> AuthzResult<Vec<Node>>;

    /// Fetches every node reachable downward from `id` in one bulk operation.
    ///
    /// Rows come back in creation order, without duplicates, and never
    /// include `id` itself unless the persisted data loops back to it. The
    /// traversal must terminate even if parent pointers form a cycle.
    async fn descendant_rows(&self, kind: NodeKind, id: &NodeId) -> AuthzResult<Vec<Node>> {
        let mut rows = Vec::new();
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([id.clone()]);
        while let Some(current) = queue.pop_front() {
            for child in self.list_children(kind, &current).await? {
                if seen.insert(child.id.clone()) {
                    queue.push_back(child.id.clone());
                    rows.push(child);
                }
            }
        }
        rows.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(rows)
    }

    /// Fetches the nodes on the parent chain above `id`, unordered.
    ///
    /// Like [`descendant_rows`](Self::descendant_rows), this must terminate on
    /// looping data; it may then include `id` itself.
    async fn ancestor_rows(&self, kind: NodeKind, id: &NodeId) -> AuthzResult<Vec<Node>> {
        let mut rows = Vec::new();
        let mut seen = HashSet::new();
        let Some(node) = self.get_node(kind, id).await? else {
            return Ok(rows);
        };
        let mut current = node.parent_id;
        while let Some(parent_id) = current {
            if !seen.insert(parent_id.clone()) {
                break;
            }
            match self.get_node(kind, &parent_id).await? {
                Some(parent) => {
                    current = parent.parent_id.clone();
                    rows.push(parent);
                }
                None => break,
            }
        }
        Ok(rows)
    }

    /// Reads a node and its [`descendant_rows`](Self::descendant_rows) from
    /// one snapshot. Returns `None` if the node does not exist.
    async fn subtree_snapshot(
        &self,
        kind: NodeKind,
        id: &NodeId,
    ) -> AuthzResult<Option<(Node, Vec<Node>)>> {
        let Some(node) = self.get_node(kind, id).await? else {
            return Ok(None);
        };
        let rows = self.descendant_rows(kind, id).await?;
        Ok(Some((node, rows)))
    }

    /// Reads a node and its [`ancestor_rows`](Self::ancestor_rows) from one
    /// snapshot. Returns `None` if the node does not exist.
    async fn lineage_snapshot(
        &self,
        kind: NodeKind,
        id: &NodeId,
    ) -> AuthzResult<Option<(Node, Vec<Node>)>> {
        let Some(node) = self.get_node(kind, id).await? else {
            return Ok(None);
        };
        let rows = self.ancestor_rows(kind, id).await?;
        Ok(Some((node, rows)))
    }

    /// Reads a role, its ancestor rows and their direct grants from one
    /// snapshot. Returns `None` if the role does not exist.
    async fn role_grants_snapshot(&self, role_id: &NodeId) -> AuthzResult<Option<RoleGrants>> {
        let Some((role, ancestor_rows)) = self.lineage_snapshot(NodeKind::Role, role_id).await?
        else {
            return Ok(None);
        };
        let ids = grant_owners(&role, &ancestor_rows);
        let grants = self.direct_permissions(&ids).await?;
        Ok(Some(RoleGrants {
            role,
            ancestor_rows,
            grants,
        }))
    }

    /// Applies a patch to every listed node in one atomic write.
    ///
    /// Attribute patches are RFC 7396 merge patches. Each written node has its
    /// version bumped. Returns the updated nodes in the order of `ids`.
    ///
    /// # Errors
    ///
    /// * `HierarchyError::NotFound` - If any id is missing (nothing is written)
    async fn patch_nodes(
        &self,
        kind: NodeKind,
        ids: &[NodeId],
        patch: &NodePatch,
    ) -> AuthzResult<Vec<Node>>;

    /// Removes a node in one atomic write.
    ///
    /// Every direct child is first reassigned to the removed node's own parent.
    /// For roles, the node's permission grants and subject assignments are
    /// removed as well. Returns the ids of the reassigned children.
    ///
    /// # Errors
    ///
    /// * `HierarchyError::NotFound` - If the node does not exist
    async fn remove_node(&self, kind: NodeKind, id: &NodeId) -> AuthzResult<Vec<NodeId>>;

    /// Counts the nodes of a kind.
    async fn count_nodes(&self, kind: NodeKind) -> AuthzResult<u64>;

    /// Counts the roles scoped to an organization.
    async fn count_tenant_roles(&self, tenant_id: &NodeId) -> AuthzResult<u64>;

    // ------------------------------------------------------------------
    // Permissions
    // ------------------------------------------------------------------

    /// Defines a permission, returning the existing record if the
    /// `(resource_id, action)` pair is already defined.
    async fn upsert_permission(&self, resource_id: &str, action: &str) -> AuthzResult<Permission>;

    /// Reads a permission record.
    async fn get_permission(&self, permission_id: &str) -> AuthzResult<Option<Permission>>;

    /// Lists every permission record ordered by resource and action.
    async fn list_permissions(&self) -> AuthzResult<Vec<Permission>>;

    /// Attaches a permission to a role. Returns `false` if it was attached already.
    async fn grant_permission(&self, role_id: &NodeId, permission_id: &str) -> AuthzResult<bool>;

    /// Detaches a permission from a role. Returns `false` if it was not attached.
    async fn revoke_permission(&self, role_id: &NodeId, permission_id: &str)
    -> AuthzResult<bool>;

    /// Fetches the direct permissions of several roles in one bulk operation.
    ///
    /// Each row pairs a role id with one permission attached to it.
    async fn direct_permissions(
        &self,
        role_ids: &[NodeId],
    ) -> AuthzResult<Vec<(NodeId, Permission)>>;

    // ------------------------------------------------------------------
    // Role assignments
    // ------------------------------------------------------------------

    /// Assigns a role to a subject. Returns `false` if it was assigned already.
    async fn assign_role(&self, subject_id: &str, role_id: &NodeId) -> AuthzResult<bool>;

    /// Removes a role from a subject. Returns `false` if it was not assigned.
    async fn unassign_role(&self, subject_id: &str, role_id: &NodeId) -> AuthzResult<bool>;

    /// Lists the roles assigned to a subject.
    async fn subject_roles(&self, subject_id: &str) -> AuthzResult<Vec<NodeId>>;
}

/// The ids whose grants feed a role's effective permissions: the role and
/// every fetched ancestor row, without duplicates.
pub(crate) fn grant_owners(role: &Node, ancestor_rows: &[Node]) -> Vec<NodeId> {
    let mut seen = HashSet::new();
    std::iter::once(&role.id)
        .chain(ancestor_rows.iter().map(|n| &n.id))
        .filter(|id| seen.insert(*id))
        .cloned()
        .collect()
}
