//! Node mutation input.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::NodeId;

/// A change to apply to one or more nodes.
///
/// `attributes` is an RFC 7396 JSON merge patch applied to the node's
/// attributes. `parent_id` distinguishes three states: absent (keep the
/// parent), `Some(None)` (make the node a root) and `Some(Some(id))`
/// (move the node under `id`).
///
/// # Examples
///
/// ```
/// use helios_authz::types::{NodeId, NodePatch};
/// use serde_json::json;
///
/// let patch: NodePatch = serde_json::from_value(json!({"parentId": null})).unwrap();
/// assert_eq!(patch.parent_id, Some(None));
///
/// let patch: NodePatch = serde_json::from_value(json!({"attributes": {"active": false}})).unwrap();
/// assert_eq!(patch.parent_id, None);
/// assert!(patch.attributes.is_some());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodePatch {
    /// Merge patch for the attributes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Value>,

    /// New parent, when present.
    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub parent_id: Option<Option<NodeId>>,
}

impl NodePatch {
    /// A patch that only merges attributes.
    pub fn attributes(patch: Value) -> Self {
        Self {
            attributes: Some(patch),
            parent_id: None,
        }
    }

    /// A patch that only moves the node.
    pub fn reparent(parent_id: Option<NodeId>) -> Self {
        Self {
            attributes: None,
            parent_id: Some(parent_id),
        }
    }

    /// Adds a parent change to this patch.
    pub fn with_parent(mut self, parent_id: Option<NodeId>) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    /// Returns `true` if the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        self.attributes.is_none() && self.parent_id.is_none()
    }

    /// Returns the requested parent, if the patch moves the node.
    pub fn new_parent(&self) -> Option<Option<&NodeId>> {
        self.parent_id.as_ref().map(Option::as_ref)
    }
}

// A present field (including an explicit null) becomes `Some(..)`.
fn deserialize_present<'de, D>(deserializer: D) -> Result<Option<Option<NodeId>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<NodeId>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_absent_parent_keeps_parent() {
        let patch: NodePatch = serde_json::from_value(json!({})).unwrap();
        assert!(patch.is_empty());
        assert_eq!(patch.new_parent(), None);
    }

    #[test]
    fn test_explicit_parent() {
        let patch: NodePatch = serde_json::from_value(json!({"parentId": "r1"})).unwrap();
        assert_eq!(patch.new_parent(), Some(Some(&NodeId::new("r1"))));
    }

    #[test]
    fn test_builders() {
        let patch = NodePatch::attributes(json!({"name": "x"})).with_parent(None);
        assert_eq!(patch.parent_id, Some(None));
        assert!(!patch.is_empty());
        assert_eq!(NodePatch::reparent(None).attributes, None);
    }
}
