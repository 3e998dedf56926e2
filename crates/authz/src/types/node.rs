//! Tree node types.
//!
//! Organizations and roles share one node representation. The [`NodeKind`]
//! tag selects which tree a node belongs to; only roles carry a tenant.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::NodeId;

/// The tree a node belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// A node of the organization tree. Organizations are the tenant dimension.
    Organization,
    /// A node of the role tree, optionally scoped to an organization.
    Role,
}

impl NodeKind {
    /// Returns the singular lowercase name of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Organization => "organization",
            NodeKind::Role => "role",
        }
    }

    /// Returns the plural collection name used in URLs.
    pub fn collection(&self) -> &'static str {
        match self {
            NodeKind::Organization => "organizations",
            NodeKind::Role => "roles",
        }
    }

    /// Returns `true` if nodes of this kind carry a tenant.
    pub fn is_tenant_scoped(&self) -> bool {
        matches!(self, NodeKind::Role)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for NodeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "organization" | "organizations" => Ok(NodeKind::Organization),
            "role" | "roles" => Ok(NodeKind::Role),
            _ => Err(format!("Unknown node kind: {}", s)),
        }
    }
}

/// The tenant dimension of a role.
///
/// Two roles may only be related as parent and child when their scopes are
/// equal: both global, or both belonging to the same organization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TenantScope {
    /// Assignable across all tenants.
    Global,
    /// Scoped to one organization.
    Tenant(NodeId),
}

impl TenantScope {
    /// Builds a scope from an optional tenant id.
    pub fn from_tenant(tenant_id: Option<&NodeId>) -> Self {
        match tenant_id {
            Some(id) => TenantScope::Tenant(id.clone()),
            None => TenantScope::Global,
        }
    }

    /// Returns the organization id, or `None` for the global scope.
    pub fn tenant_id(&self) -> Option<&NodeId> {
        match self {
            TenantScope::Global => None,
            TenantScope::Tenant(id) => Some(id),
        }
    }

    /// Returns `true` for the global scope.
    pub fn is_global(&self) -> bool {
        matches!(self, TenantScope::Global)
    }
}

impl fmt::Display for TenantScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TenantScope::Global => write!(f, "global"),
            TenantScope::Tenant(id) => write!(f, "tenant {}", id),
        }
    }
}

/// A persisted node of either tree.
///
/// `attributes` is an opaque JSON object owned by the caller (names, status
/// flags and so on). The tree algorithms only look at `id`, `parent_id` and
/// `tenant_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    /// Which tree the node belongs to.
    pub kind: NodeKind,
    /// Immutable identifier.
    pub id: NodeId,
    /// Parent in the same tree, `None` for a root.
    pub parent_id: Option<NodeId>,
    /// Owning organization (roles only), `None` for global roles.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<NodeId>,
    /// Kind-specific payload.
    pub attributes: Value,
    /// Incremented on every write to the node.
    pub version: u64,
    /// When the node was created.
    pub created_at: DateTime<Utc>,
    /// When the node was last written.
    pub updated_at: DateTime<Utc>,
}

impl Node {
    /// Creates a version-1 node stamped with the current time.
    pub fn new(
        kind: NodeKind,
        id: NodeId,
        parent_id: Option<NodeId>,
        tenant_id: Option<NodeId>,
        attributes: Value,
    ) -> Self {
        let now = Utc::now();
        Self {
            kind,
            id,
            parent_id,
            tenant_id,
            attributes,
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns `true` if the node has no parent.
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Returns the tenant scope of the node. Organizations are always global.
    pub fn scope(&self) -> TenantScope {
        TenantScope::from_tenant(self.tenant_id.as_ref())
    }

    /// Marks the node as written: bumps the version and the update time.
    pub fn touch(&mut self) {
        self.version += 1;
        self.updated_at = Utc::now();
    }
}

/// Input for creating a node.
///
/// # Examples
///
/// ```
/// use helios_authz::types::{NewNode, NodeId, NodeKind};
/// use serde_json::json;
///
/// let new = NewNode::role(Some(NodeId::new("org-acme")))
///     .with_parent(NodeId::new("role-admin"))
///     .with_attributes(json!({"name": "Manager"}));
///
/// assert_eq!(new.kind, NodeKind::Role);
/// assert_eq!(new.parent_id, Some(NodeId::new("role-admin")));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct NewNode {
    /// Which tree to create the node in.
    pub kind: NodeKind,
    /// Caller-supplied id; generated when `None`.
    pub id: Option<NodeId>,
    /// Optional parent in the same tree.
    pub parent_id: Option<NodeId>,
    /// Owning organization (roles only).
    pub tenant_id: Option<NodeId>,
    /// Initial payload. Must be a JSON object.
    pub attributes: Value,
}

impl NewNode {
    /// Starts a node of the given kind with empty attributes.
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            id: None,
            parent_id: None,
            tenant_id: None,
            attributes: Value::Object(Map::new()),
        }
    }

    /// Starts an organization node.
    pub fn organization() -> Self {
        Self::new(NodeKind::Organization)
    }

    /// Starts a role node in the given tenant (`None` for a global role).
    pub fn role(tenant_id: Option<NodeId>) -> Self {
        Self {
            tenant_id,
            ..Self::new(NodeKind::Role)
        }
    }

    /// Sets an explicit id.
    pub fn with_id(mut self, id: impl Into<NodeId>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Sets the parent.
    pub fn with_parent(mut self, parent_id: impl Into<NodeId>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    /// Sets the initial attributes.
    pub fn with_attributes(mut self, attributes: Value) -> Self {
        self.attributes = attributes;
        self
    }
}
