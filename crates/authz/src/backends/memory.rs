//! In-memory tree store.
//!
//! Keeps every table in a single [`parking_lot::RwLock`]. Multi-row writes
//! happen under one write guard, so readers never observe a half-applied
//! change. Useful for tests and for single-process deployments that do not
//! need durability.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use uuid::Uuid;

use crate::core::{RoleGrants, TreeStore, grant_owners};
use crate::error::{AuthzResult, HierarchyError};
use crate::types::{Node, NodeId, NodeKind, NodePatch, Permission, PermissionKey};

/// A stored node plus its insertion sequence, used to order siblings that
/// share a creation timestamp.
#[derive(Debug, Clone)]
struct Entry {
    seq: u64,
    node: Node,
}

#[derive(Debug, Default)]
struct MemoryState {
    organizations: HashMap<NodeId, Entry>,
    roles: HashMap<NodeId, Entry>,
    next_seq: u64,
    permissions: HashMap<String, Permission>,
    permission_keys: HashMap<PermissionKey, String>,
    role_permissions: BTreeSet<(NodeId, String)>,
    // (subject, role)
    assignments: BTreeSet<(String, NodeId)>,
}

impl MemoryState {
    fn tree(&self, kind: NodeKind) -> &HashMap<NodeId, Entry> {
        match kind {
            NodeKind::Organization => &self.organizations,
            NodeKind::Role => &self.roles,
        }
    }

    fn tree_mut(&mut self, kind: NodeKind) -> &mut HashMap<NodeId, Entry> {
        match kind {
            NodeKind::Organization => &mut self.organizations,
            NodeKind::Role => &mut self.roles,
        }
    }

    /// Returns the nodes matching `filter`, in creation order.
    fn ordered<F>(&self, kind: NodeKind, filter: F) -> Vec<Node>
    where
        F: Fn(&Node) -> bool,
    {
        creation_order(
            self.tree(kind)
                .values()
                .filter(|e| filter(&e.node))
                .collect(),
        )
    }

    fn children_ids(&self, kind: NodeKind, id: &NodeId) -> Vec<NodeId> {
        self.tree(kind)
            .values()
            .filter(|e| e.node.parent_id.as_ref() == Some(id))
            .map(|e| e.node.id.clone())
            .collect()
    }

    /// Everything reachable downward from `id`, in creation order.
    ///
    /// The tree is indexed by parent once, so the walk is linear in the size
    /// of the tree however deep it is.
    fn descendants(&self, kind: NodeKind, id: &NodeId) -> Vec<Node> {
        let mut children: HashMap<&NodeId, Vec<&Entry>> = HashMap::new();
        for entry in self.tree(kind).values() {
            if let Some(parent_id) = &entry.node.parent_id {
                children.entry(parent_id).or_default().push(entry);
            }
        }

        let mut reached: HashSet<&NodeId> = HashSet::new();
        let mut entries = Vec::new();
        let mut queue = VecDeque::from([id]);
        while let Some(current) = queue.pop_front() {
            for &entry in children.get(current).into_iter().flatten() {
                if reached.insert(&entry.node.id) {
                    queue.push_back(&entry.node.id);
                    entries.push(entry);
                }
            }
        }
        creation_order(entries)
    }

    /// The parent chain above `id`, stopping at a missing parent or a loop.
    fn ancestors(&self, kind: NodeKind, id: &NodeId) -> Vec<Node> {
        let tree = self.tree(kind);
        let mut rows = Vec::new();
        let mut seen = HashSet::new();
        let mut current = tree.get(id).and_then(|e| e.node.parent_id.as_ref());
        while let Some(parent_id) = current {
            if !seen.insert(parent_id) {
                break;
            }
            let Some(entry) = tree.get(parent_id) else {
                break;
            };
            current = entry.node.parent_id.as_ref();
            rows.push(entry.node.clone());
        }
        rows
    }

    fn grants(&self, role_ids: &[NodeId]) -> Vec<(NodeId, Permission)> {
        let wanted: BTreeSet<&NodeId> = role_ids.iter().collect();
        let mut rows = Vec::new();
        for role_id in wanted {
            let attached = self
                .role_permissions
                .range((role_id.clone(), String::new())..)
                .take_while(|(owner, _)| owner == role_id);
            for (owner, permission_id) in attached {
                if let Some(permission) = self.permissions.get(permission_id) {
                    rows.push((owner.clone(), permission.clone()));
                }
            }
        }
        rows
    }
}

fn creation_order(mut entries: Vec<&Entry>) -> Vec<Node> {
    entries.sort_by(|a, b| {
        a.node
            .created_at
            .cmp(&b.node.created_at)
            .then(a.seq.cmp(&b.seq))
    });
    entries.into_iter().map(|e| e.node.clone()).collect()
}

/// An in-memory implementation of [`TreeStore`].
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use helios_authz::backends::memory::InMemoryStore;
/// use helios_authz::core::TreeStore;
/// use helios_authz::hierarchy::HierarchyManager;
///
/// let manager = HierarchyManager::new(Arc::new(InMemoryStore::new()));
/// assert_eq!(manager.store().backend_name(), "memory");
/// ```
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: RwLock<MemoryState>,
}

impl InMemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TreeStore for InMemoryStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn insert_node(&self, node: &Node) -> AuthzResult<()> {
        let mut state = self.state.write();
        if state.tree(node.kind).contains_key(&node.id) {
            return Err(HierarchyError::AlreadyExists {
                kind: node.kind,
                id: node.id.clone(),
            }
            .into());
        }
        let seq = state.next_seq;
        state.next_seq += 1;
        state.tree_mut(node.kind).insert(
            node.id.clone(),
            Entry {
                seq,
                node: node.clone(),
            },
        );
        Ok(())
    }

    async fn get_node(&self, kind: NodeKind, id: &NodeId) -> AuthzResult<Option<Node>> {
        let state = self.state.read();
        Ok(state.tree(kind).get(id).map(|e| e.node.clone()))
    }

    async fn get_nodes(&self, kind: NodeKind, ids: &[NodeId]) -> AuthzResult<Vec<Node>> {
        let state = self.state.read();
        let tree = state.tree(kind);
        Ok(ids
            .iter()
            .filter_map(|id| tree.get(id).map(|e| e.node.clone()))
            .collect())
    }

    async fn list_nodes(&self, kind: NodeKind) -> AuthzResult<Vec<Node>> {
        let state = self.state.read();
        Ok(state.ordered(kind, |_| true))
    }

    async fn list_children(&self, kind: NodeKind, id: &NodeId) -> AuthzResult<Vec<Node>> {
        let state = self.state.read();
        Ok(state.ordered(kind, |n| n.parent_id.as_ref() == Some(id)))
    }

    async fn descendant_rows(&self, kind: NodeKind, id: &NodeId) -> AuthzResult<Vec<Node>> {
        let state = self.state.read();
        Ok(state.descendants(kind, id))
    }

    async fn ancestor_rows(&self, kind: NodeKind, id: &NodeId) -> AuthzResult<Vec<Node>> {
        let state = self.state.read();
        Ok(state.ancestors(kind, id))
    }

    async fn subtree_snapshot(
        &self,
        kind: NodeKind,
        id: &NodeId,
    ) -> AuthzResult<Option<(Node, Vec<Node>)>> {
        let state = self.state.read();
        Ok(state
            .tree(kind)
            .get(id)
            .map(|e| (e.node.clone(), state.descendants(kind, id))))
    }

    async fn lineage_snapshot(
        &self,
        kind: NodeKind,
        id: &NodeId,
    ) -> AuthzResult<Option<(Node, Vec<Node>)>> {
        let state = self.state.read();
        Ok(state
            .tree(kind)
            .get(id)
            .map(|e| (e.node.clone(), state.ancestors(kind, id))))
    }

    async fn role_grants_snapshot(&self, role_id: &NodeId) -> AuthzResult<Option<RoleGrants>> {
        let state = self.state.read();
        let Some(entry) = state.roles.get(role_id) else {
            return Ok(None);
        };
        let ancestor_rows = state.ancestors(NodeKind::Role, role_id);
        let grants = state.grants(&grant_owners(&entry.node, &ancestor_rows));
        Ok(Some(RoleGrants {
            role: entry.node.clone(),
            ancestor_rows,
            grants,
        }))
    }

    async fn patch_nodes(
        &self,
        kind: NodeKind,
        ids: &[NodeId],
        patch: &NodePatch,
    ) -> AuthzResult<Vec<Node>> {
        let mut state = self.state.write();
        let tree = state.tree_mut(kind);

        if let Some(missing) = ids.iter().find(|id| !tree.contains_key(*id)) {
            return Err(HierarchyError::NotFound {
                kind,
                id: missing.clone(),
            }
            .into());
        }

        let mut updated = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(entry) = tree.get_mut(id) {
                if let Some(attributes) = &patch.attributes {
                    json_patch::merge(&mut entry.node.attributes, attributes);
                }
                if let Some(parent_id) = &patch.parent_id {
                    entry.node.parent_id = parent_id.clone();
                }
                entry.node.touch();
                updated.push(entry.node.clone());
            }
        }
        Ok(updated)
    }

    async fn remove_node(&self, kind: NodeKind, id: &NodeId) -> AuthzResult<Vec<NodeId>> {
        let mut state = self.state.write();
        let Some(removed) = state.tree_mut(kind).remove(id) else {
            return Err(HierarchyError::NotFound {
                kind,
                id: id.clone(),
            }
            .into());
        };

        let children = state.children_ids(kind, id);
        let tree = state.tree_mut(kind);
        for child_id in &children {
            if let Some(child) = tree.get_mut(child_id) {
                child.node.parent_id = removed.node.parent_id.clone();
                child.node.touch();
            }
        }

        if kind == NodeKind::Role {
            state.role_permissions.retain(|(role_id, _)| role_id != id);
            state.assignments.retain(|(_, role_id)| role_id != id);
        }
        Ok(children)
    }

    async fn count_nodes(&self, kind: NodeKind) -> AuthzResult<u64> {
        let state = self.state.read();
        Ok(state.tree(kind).len() as u64)
    }

    async fn count_tenant_roles(&self, tenant_id: &NodeId) -> AuthzResult<u64> {
        let state = self.state.read();
        Ok(state
            .roles
            .values()
            .filter(|e| e.node.tenant_id.as_ref() == Some(tenant_id))
            .count() as u64)
    }

    async fn upsert_permission(&self, resource_id: &str, action: &str) -> AuthzResult<Permission> {
        let mut state = self.state.write();
        let key = PermissionKey::new(resource_id, action);
        if let Some(existing) = state
            .permission_keys
            .get(&key)
            .and_then(|id| state.permissions.get(id))
        {
            return Ok(existing.clone());
        }
        let permission = Permission::new(Uuid::new_v4().to_string(), resource_id, action);
        state.permission_keys.insert(key, permission.id.clone());
        state
            .permissions
            .insert(permission.id.clone(), permission.clone());
        Ok(permission)
    }

    async fn get_permission(&self, permission_id: &str) -> AuthzResult<Option<Permission>> {
        let state = self.state.read();
        Ok(state.permissions.get(permission_id).cloned())
    }

    async fn list_permissions(&self) -> AuthzResult<Vec<Permission>> {
        let state = self.state.read();
        let mut permissions: Vec<Permission> = state.permissions.values().cloned().collect();
        permissions.sort_by(|a, b| a.key().cmp(&b.key()));
        Ok(permissions)
    }

    async fn grant_permission(&self, role_id: &NodeId, permission_id: &str) -> AuthzResult<bool> {
        let mut state = self.state.write();
        Ok(state
            .role_permissions
            .insert((role_id.clone(), permission_id.to_string())))
    }

    async fn revoke_permission(
        &self,
        role_id: &NodeId,
        permission_id: &str,
    ) -> AuthzResult<bool> {
        let mut state = self.state.write();
        Ok(state
            .role_permissions
            .remove(&(role_id.clone(), permission_id.to_string())))
    }

    async fn direct_permissions(
        &self,
        role_ids: &[NodeId],
    ) -> AuthzResult<Vec<(NodeId, Permission)>> {
        let state = self.state.read();
        Ok(state.grants(role_ids))
    }

    async fn assign_role(&self, subject_id: &str, role_id: &NodeId) -> AuthzResult<bool> {
        let mut state = self.state.write();
        Ok(state
            .assignments
            .insert((subject_id.to_string(), role_id.clone())))
    }

    async fn unassign_role(&self, subject_id: &str, role_id: &NodeId) -> AuthzResult<bool> {
        let mut state = self.state.write();
        Ok(state
            .assignments
            .remove(&(subject_id.to_string(), role_id.clone())))
    }

    async fn subject_roles(&self, subject_id: &str) -> AuthzResult<Vec<NodeId>> {
        let state = self.state.read();
        Ok(state
            .assignments
            .iter()
            .filter(|(subject, _)| subject == subject_id)
            .map(|(_, role_id)| role_id.clone())
            .collect())
    }
}

impl InMemoryStore {
    /// Returns the number of stored permission grants. Used in tests to check
    /// that deleting a role cleans up its edges.
    pub fn grant_count(&self) -> usize {
        self.state.read().role_permissions.len()
    }
}
