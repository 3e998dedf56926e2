//! Cycle prevention.

use crate::core::TreeStore;
use crate::error::AuthzResult;
use crate::types::{NodeId, NodeKind};

use super::navigator::TreeNavigator;

/// Answers "is this node below that one?" before a reparent is committed.
pub struct CycleGuard<'a, S: ?Sized> {
    navigator: TreeNavigator<'a, S>,
}

impl<'a, S: TreeStore + ?Sized> CycleGuard<'a, S> {
    /// Creates a guard over the given store.
    pub fn new(store: &'a S) -> Self {
        Self {
            navigator: TreeNavigator::new(store),
        }
    }

    /// Returns `true` if `node_id` lies in the subtree rooted at
    /// `ancestor_candidate_id`.
    ///
    /// A node is not its own descendant, so equal ids give `false`. Moving
    /// `x` under `y` creates a cycle exactly when `is_descendant(x, y)`.
    ///
    /// # Errors
    ///
    /// `CorruptHierarchy` if the persisted subtree already loops.
    pub async fn is_descendant(
        &self,
        kind: NodeKind,
        ancestor_candidate_id: &NodeId,
        node_id: &NodeId,
    ) -> AuthzResult<bool> {
        if ancestor_candidate_id == node_id {
            return Ok(false);
        }
        let closure = self.navigator.closure(kind, ancestor_candidate_id).await?;
        Ok(closure.contains(node_id))
    }
}
