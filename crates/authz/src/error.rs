//! Error types for the authorization core.
//!
//! Errors are grouped by category: hierarchy errors (tree invariants),
//! permission errors, validation errors and backend errors. [`AuthzError`]
//! wraps all of them and exposes a stable [`code`](AuthzError::code) used in
//! batch results and HTTP bodies.

// Error enum variant fields are self-documenting via their #[error(...)] messages
#![allow(missing_docs)]

use thiserror::Error;

use crate::types::{NodeId, NodeKind, TenantScope};

/// The primary error type for all authorization operations.
#[derive(Error, Debug)]
pub enum AuthzError {
    /// Tree invariant and lookup errors
    #[error(transparent)]
    Hierarchy(#[from] HierarchyError),

    /// Permission catalogue errors
    #[error(transparent)]
    Permission(#[from] PermissionError),

    /// Input validation errors
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Backend-specific errors
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Errors raised while reading or mutating a tree.
#[derive(Error, Debug)]
pub enum HierarchyError {
    /// The node does not exist.
    #[error("{kind} not found: {id}")]
    NotFound { kind: NodeKind, id: NodeId },

    /// A node with the given id already exists.
    #[error("{kind} already exists: {id}")]
    AlreadyExists { kind: NodeKind, id: NodeId },

    /// The requested parent does not exist.
    #[error("parent {kind} not found: {parent_id}")]
    ParentNotFound { kind: NodeKind, parent_id: NodeId },

    /// A node was asked to become its own parent.
    #[error("{kind} {id} cannot be its own parent")]
    SelfParent { kind: NodeKind, id: NodeId },

    /// The requested parent lies in the node's own subtree.
    #[error("moving {kind} {id} under {parent_id} would create a cycle")]
    CircularReference {
        kind: NodeKind,
        id: NodeId,
        parent_id: NodeId,
    },

    /// A role and its parent belong to different tenants.
    #[error("role {id} ({scope}) cannot be related to role {other_id} ({other_scope})")]
    TenantMismatch {
        id: NodeId,
        scope: TenantScope,
        other_id: NodeId,
        other_scope: TenantScope,
    },

    /// A role was scoped to an organization that does not exist.
    #[error("tenant organization not found: {tenant_id}")]
    TenantNotFound { tenant_id: NodeId },

    /// An organization still scopes roles and cannot be deleted.
    #[error("organization {tenant_id} still scopes {role_count} role(s)")]
    TenantInUse { tenant_id: NodeId, role_count: u64 },

    /// Persisted parent pointers violate acyclicity or referential integrity.
    #[error("corrupt {kind} hierarchy at {id}: {reason}")]
    CorruptHierarchy {
        kind: NodeKind,
        id: NodeId,
        reason: String,
    },
}

/// Errors related to the permission catalogue.
#[derive(Error, Debug)]
pub enum PermissionError {
    /// The permission record does not exist.
    #[error("permission not found: {permission_id}")]
    NotFound { permission_id: String },
}

/// Errors related to request validation.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Attributes must be a JSON object.
    #[error("invalid attributes: {message}")]
    InvalidAttributes { message: String },

    /// A required field is missing or blank.
    #[error("missing required field: {field}")]
    MissingRequiredField { field: String },

    /// A tenant was supplied for a kind that has none.
    #[error("{kind} nodes cannot carry a tenant")]
    UnexpectedTenant { kind: NodeKind },

    /// The batch exceeds the configured maximum.
    #[error("batch of {size} items exceeds the maximum of {max}")]
    BatchTooLarge { size: usize, max: usize },

    /// The operation is not valid for the node kind.
    #[error("{operation} is not supported for {kind} nodes")]
    UnsupportedKind { kind: NodeKind, operation: String },
}

/// Errors originating from a storage backend.
#[derive(Error, Debug)]
pub enum BackendError {
    /// The backend is currently unavailable.
    #[error("backend unavailable: {backend_name}")]
    Unavailable {
        backend_name: String,
        message: String,
    },

    /// Connection to the backend failed.
    #[error("connection failed to {backend_name}: {message}")]
    ConnectionFailed {
        backend_name: String,
        message: String,
    },

    /// Connection pool exhausted.
    #[error("connection pool exhausted for {backend_name}")]
    PoolExhausted { backend_name: String },

    /// Schema migration error.
    #[error("schema migration failed: {message}")]
    MigrationError { message: String },

    /// Internal backend error.
    #[error("internal error in {backend_name}: {message}")]
    Internal {
        backend_name: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Serialization/deserialization error.
    #[error("serialization error: {message}")]
    SerializationError { message: String },
}

impl AuthzError {
    /// Returns the stable error kind name.
    ///
    /// These names appear in batch `errors` arrays and HTTP error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            AuthzError::Hierarchy(err) => match err {
                HierarchyError::NotFound { .. } => "NotFound",
                HierarchyError::AlreadyExists { .. } => "AlreadyExists",
                HierarchyError::ParentNotFound { .. } => "ParentNotFound",
                HierarchyError::SelfParent { .. } => "SelfParent",
                HierarchyError::CircularReference { .. } => "CircularReference",
                HierarchyError::TenantMismatch { .. } => "TenantMismatch",
                HierarchyError::TenantNotFound { .. } => "TenantNotFound",
                HierarchyError::TenantInUse { .. } => "TenantInUse",
                HierarchyError::CorruptHierarchy { .. } => "CorruptHierarchy",
            },
            AuthzError::Permission(PermissionError::NotFound { .. }) => "PermissionNotFound",
            AuthzError::Validation(_) => "Validation",
            AuthzError::Backend(_) => "Backend",
        }
    }

    /// Returns `true` for errors that must abort batch processing.
    ///
    /// A corrupt hierarchy means earlier invariant checks were bypassed, so
    /// no further answer from the tree can be trusted.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AuthzError::Hierarchy(HierarchyError::CorruptHierarchy { .. })
        )
    }

    /// Shorthand for [`HierarchyError::NotFound`].
    pub fn not_found(kind: NodeKind, id: &NodeId) -> Self {
        HierarchyError::NotFound {
            kind,
            id: id.clone(),
        }
        .into()
    }

    /// Shorthand for [`HierarchyError::CorruptHierarchy`].
    pub fn corrupt(kind: NodeKind, id: &NodeId, reason: impl Into<String>) -> Self {
        HierarchyError::CorruptHierarchy {
            kind,
            id: id.clone(),
            reason: reason.into(),
        }
        .into()
    }
}

/// Result type alias for authorization operations.
pub type AuthzResult<T> = Result<T, AuthzError>;

impl From<serde_json::Error> for AuthzError {
    fn from(err: serde_json::Error) -> Self {
        AuthzError::Backend(BackendError::SerializationError {
            message: err.to_string(),
        })
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for AuthzError {
    fn from(err: rusqlite::Error) -> Self {
        AuthzError::Backend(BackendError::Internal {
            backend_name: "sqlite".to_string(),
            message: err.to_string(),
            source: Some(Box::new(err)),
        })
    }
}

#[cfg(feature = "sqlite")]
impl From<r2d2::Error> for AuthzError {
    fn from(_err: r2d2::Error) -> Self {
        AuthzError::Backend(BackendError::PoolExhausted {
            backend_name: "sqlite".to_string(),
        })
    }
}
