//! Partial-success batch results.

use serde::Serialize;

use super::NodeId;
use crate::error::AuthzError;

/// The failure of one item in a batch operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchItemError {
    /// The item that failed.
    pub id: NodeId,
    /// Stable error kind, such as `"NotFound"` or `"CircularReference"`.
    pub error: String,
    /// Human-readable detail.
    pub message: String,
}

impl BatchItemError {
    /// Captures an error for the given item.
    pub fn new(id: NodeId, error: &AuthzError) -> Self {
        Self {
            id,
            error: error.code().to_string(),
            message: error.to_string(),
        }
    }
}

/// The result of a batch operation.
///
/// `count` is the number of items that succeeded. Every failed item appears
/// in `errors`; a failure never rolls back items that succeeded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchOutcome {
    /// Items that succeeded.
    pub count: u64,
    /// Items that failed.
    pub errors: Vec<BatchItemError>,
}

impl BatchOutcome {
    /// Records a failed item.
    pub fn fail(&mut self, id: NodeId, error: &AuthzError) {
        self.errors.push(BatchItemError::new(id, error));
    }

    /// Returns `true` if every item succeeded.
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }

    /// Ids of the failed items.
    pub fn failed_ids(&self) -> impl Iterator<Item = &NodeId> {
        self.errors.iter().map(|e| &e.id)
    }
}
