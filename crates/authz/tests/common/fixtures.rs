//! Tree-building helpers.

use serde_json::Value;

use helios_authz::types::NewNode;
use helios_authz::{HierarchyManager, Node, NodeId, TreeStore};

/// Creates an organization.
pub async fn org<S: TreeStore + ?Sized>(
    m: &HierarchyManager<S>,
    id: &str,
    parent: Option<&str>,
) -> Node {
    let mut new = NewNode::organization().with_id(id);
    if let Some(parent) = parent {
        new = new.with_parent(parent);
    }
    m.create(new)
        .await
        .unwrap_or_else(|e| panic!("Failed to create organization {}: {}", id, e))
}

/// Creates a role, global when `tenant` is `None`.
pub async fn role<S: TreeStore + ?Sized>(
    m: &HierarchyManager<S>,
    tenant: Option<&str>,
    id: &str,
    parent: Option<&str>,
) -> Node {
    let mut new = NewNode::role(tenant.map(NodeId::new)).with_id(id);
    if let Some(parent) = parent {
        new = new.with_parent(parent);
    }
    m.create(new)
        .await
        .unwrap_or_else(|e| panic!("Failed to create role {}: {}", id, e))
}

/// Creates a role with attributes.
pub async fn role_with<S: TreeStore + ?Sized>(
    m: &HierarchyManager<S>,
    id: &str,
    attributes: Value,
) -> Node {
    m.create(NewNode::role(None).with_id(id).with_attributes(attributes))
        .await
        .unwrap_or_else(|e| panic!("Failed to create role {}: {}", id, e))
}

/// Creates a chain of global roles, each below the previous one.
pub async fn role_chain<S: TreeStore + ?Sized>(m: &HierarchyManager<S>, ids: &[&str]) -> Vec<Node> {
    let mut nodes = Vec::with_capacity(ids.len());
    let mut parent: Option<&str> = None;
    for id in ids {
        nodes.push(role(m, None, id, parent).await);
        parent = Some(*id);
    }
    nodes
}

/// Defines a permission and grants it to a role, returning the permission id.
pub async fn grant<S: TreeStore + ?Sized>(
    m: &HierarchyManager<S>,
    role_id: &str,
    resource: &str,
    action: &str,
) -> String {
    let permission = m
        .define_permission(resource, action)
        .await
        .expect("Failed to define permission");
    m.grant_permission(&NodeId::new(role_id), &permission.id)
        .await
        .expect("Failed to grant permission");
    permission.id
}

/// Converts string ids.
pub fn ids(list: &[&str]) -> Vec<NodeId> {
    list.iter().map(|id| NodeId::new(*id)).collect()
}

/// The ids of a node list, in order.
pub fn id_strings(nodes: &[Node]) -> Vec<String> {
    nodes.iter().map(|n| n.id.to_string()).collect()
}
