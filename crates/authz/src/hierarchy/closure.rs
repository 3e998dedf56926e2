//! Pure closure computations over fetched rows.
//!
//! Stores hand back unordered bulk results; the functions here turn them into
//! ordered descendant lists and ancestor chains while checking that the
//! persisted parent pointers really form a tree.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::error::AuthzError;
use crate::types::{Node, NodeId, NodeKind};

/// The descendant closure of one node, in breadth-first discovery order.
///
/// # Examples
///
/// ```
/// use helios_authz::hierarchy::SubtreeClosure;
/// use helios_authz::types::{Node, NodeId, NodeKind};
/// use serde_json::json;
///
/// let child = |id: &str, parent: &str| {
///     Node::new(NodeKind::Role, NodeId::new(id), Some(NodeId::new(parent)), None, json!({}))
/// };
/// let rows = vec![child("b", "a"), child("c", "b"), child("d", "a")];
///
/// let closure = SubtreeClosure::build(NodeKind::Role, &NodeId::new("a"), rows).unwrap();
/// let order: Vec<_> = closure.nodes().iter().map(|n| n.id.as_str()).collect();
/// assert_eq!(order, vec!["b", "d", "c"]);
/// assert!(closure.contains(&NodeId::new("c")));
/// assert!(!closure.contains(&NodeId::new("a")));
/// ```
#[derive(Debug, Clone)]
pub struct SubtreeClosure {
    root: NodeId,
    nodes: Vec<Node>,
    members: HashSet<NodeId>,
}

impl SubtreeClosure {
    /// Orders `rows` breadth-first below `root`.
    ///
    /// `rows` must be in creation order; siblings keep that order. Rows not
    /// connected to `root` are ignored.
    ///
    /// # Errors
    ///
    /// `CorruptHierarchy` if any node, including `root`, is reached twice.
    pub fn build(kind: NodeKind, root: &NodeId, rows: Vec<Node>) -> Result<Self, AuthzError> {
        let mut slots: Vec<Option<Node>> = Vec::with_capacity(rows.len());
        let mut children: HashMap<NodeId, Vec<usize>> = HashMap::new();
        let mut fetched = HashSet::new();
        for row in rows {
            if !fetched.insert(row.id.clone()) {
                continue;
            }
            if let Some(parent_id) = &row.parent_id {
                children.entry(parent_id.clone()).or_default().push(slots.len());
            }
            slots.push(Some(row));
        }

        let mut members = HashSet::from([root.clone()]);
        let mut nodes = Vec::new();
        let mut queue = VecDeque::from([root.clone()]);
        while let Some(current) = queue.pop_front() {
            let Some(indexes) = children.get(&current) else {
                continue;
            };
            for &index in indexes {
                let Some(node) = slots[index].take() else {
                    continue;
                };
                if !members.insert(node.id.clone()) {
                    return Err(AuthzError::corrupt(
                        kind,
                        &node.id,
                        format!("node is reachable twice below {}", root),
                    ));
                }
                queue.push_back(node.id.clone());
                nodes.push(node);
            }
        }
        members.remove(root);

        Ok(Self {
            root: root.clone(),
            nodes,
            members,
        })
    }

    /// The node the closure was computed for.
    pub fn root(&self) -> &NodeId {
        &self.root
    }

    /// Returns `true` if `id` lies strictly below the root.
    pub fn contains(&self, id: &NodeId) -> bool {
        self.members.contains(id)
    }

    /// The descendants in breadth-first discovery order.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Number of descendants.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if the root has no descendants.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Consumes the closure, returning the ordered descendants.
    pub fn into_nodes(self) -> Vec<Node> {
        self.nodes
    }
}

/// Orders `rows` into the parent chain of `node`, immediate parent first.
///
/// # Errors
///
/// `CorruptHierarchy` if the chain revisits a node or points at a parent
/// that was not fetched (a dangling reference).
pub fn ancestor_chain(node: &Node, rows: Vec<Node>) -> Result<Vec<Node>, AuthzError> {
    let mut by_id: HashMap<NodeId, Node> =
        rows.into_iter().map(|n| (n.id.clone(), n)).collect();
    let mut visited = HashSet::from([node.id.clone()]);
    let mut chain = Vec::new();

    let mut current = node.parent_id.clone();
    while let Some(parent_id) = current {
        if !visited.insert(parent_id.clone()) {
            return Err(AuthzError::corrupt(
                node.kind,
                &node.id,
                format!("ancestor chain revisits {}", parent_id),
            ));
        }
        let parent = by_id.remove(&parent_id).ok_or_else(|| {
            AuthzError::corrupt(
                node.kind,
                &node.id,
                format!("ancestor chain references missing node {}", parent_id),
            )
        })?;
        current = parent.parent_id.clone();
        chain.push(parent);
    }

    Ok(chain)
}
