//! Read-side tree traversal.

use tracing::{debug, error};

use crate::core::TreeStore;
use crate::error::{AuthzError, AuthzResult};
use crate::types::{Node, NodeId, NodeKind};

use super::closure::{SubtreeClosure, ancestor_chain};

/// Computes children, descendants and ancestor chains.
///
/// Each call performs one bulk fetch from the store and orders the result in
/// memory, so deep trees never cost one round trip per level.
pub struct TreeNavigator<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S: TreeStore + ?Sized> TreeNavigator<'a, S> {
    /// Creates a navigator over the given store.
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Loads a node or fails with `NotFound`.
    pub async fn node(&self, kind: NodeKind, id: &NodeId) -> AuthzResult<Node> {
        self.store
            .get_node(kind, id)
            .await?
            .ok_or_else(|| AuthzError::not_found(kind, id))
    }

    /// Direct children of `id` in creation order.
    pub async fn children(&self, kind: NodeKind, id: &NodeId) -> AuthzResult<Vec<Node>> {
        self.node(kind, id).await?;
        let children = self.store.list_children(kind, id).await?;
        debug!(kind = %kind, id = %id, count = children.len(), "Listed children");
        Ok(children)
    }

    /// The descendant closure of `id`.
    pub async fn closure(&self, kind: NodeKind, id: &NodeId) -> AuthzResult<SubtreeClosure> {
        let rows = self.store.descendant_rows(kind, id).await?;
        closure_of(kind, id, rows)
    }

    /// Every node below `id` in breadth-first discovery order, excluding `id`.
    ///
    /// The node and its subtree are read from one snapshot.
    pub async fn descendants(&self, kind: NodeKind, id: &NodeId) -> AuthzResult<Vec<Node>> {
        let (_, rows) = self
            .store
            .subtree_snapshot(kind, id)
            .await?
            .ok_or_else(|| AuthzError::not_found(kind, id))?;
        let closure = closure_of(kind, id, rows)?;
        debug!(kind = %kind, id = %id, count = closure.len(), "Computed descendants");
        Ok(closure.into_nodes())
    }

    /// The parent chain of `id`, immediate parent first and root last.
    pub async fn ancestors(&self, kind: NodeKind, id: &NodeId) -> AuthzResult<Vec<Node>> {
        let (node, rows) = self
            .store
            .lineage_snapshot(kind, id)
            .await?
            .ok_or_else(|| AuthzError::not_found(kind, id))?;
        chain_of(&node, rows)
    }
}

fn closure_of(kind: NodeKind, id: &NodeId, rows: Vec<Node>) -> AuthzResult<SubtreeClosure> {
    SubtreeClosure::build(kind, id, rows).inspect_err(|e| {
        error!(kind = %kind, id = %id, error = %e, "Descendant closure is corrupt");
    })
}

/// Orders fetched ancestor rows into the chain of `node`, logging corruption.
pub(crate) fn chain_of(node: &Node, rows: Vec<Node>) -> AuthzResult<Vec<Node>> {
    if node.is_root() {
        return Ok(Vec::new());
    }
    ancestor_chain(node, rows).inspect_err(|e| {
        error!(kind = %node.kind, id = %node.id, error = %e, "Ancestor chain is corrupt");
    })
}
