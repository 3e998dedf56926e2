//! The write path of the authorization core.
//!
//! [`HierarchyManager`] is the only component that mutates trees. Every
//! mutation runs under the writer lock of the scopes it touches, re-reads the
//! nodes it validates, checks every invariant and only then writes.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::config::HierarchyConfig;
use crate::core::TreeStore;
use crate::error::{AuthzError, AuthzResult, HierarchyError, PermissionError, ValidationError};
use crate::types::{
    BatchItemError, BatchOutcome, EffectivePermissions, NewNode, Node, NodeId, NodeKind,
    NodePatch, Permission, TenantScope,
};

use super::guard::CycleGuard;
use super::locks::{LockScope, TreeLocks};
use super::navigator::TreeNavigator;
use super::resolver::PermissionResolver;

/// Orchestrates every operation on the organization and role trees.
///
/// # Invariants
///
/// - No node is its own ancestor.
/// - A role's parent has the same tenant (both global or the same organization).
/// - A non-null parent references an existing node of the same kind.
///
/// Single-target operations either fully succeed or change nothing. Batch
/// operations report each item's outcome independently.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use helios_authz::backends::memory::InMemoryStore;
/// use helios_authz::hierarchy::HierarchyManager;
/// use helios_authz::types::NewNode;
///
/// # tokio_test_block_on(async {
/// let manager = HierarchyManager::new(Arc::new(InMemoryStore::new()));
///
/// let root = manager.create(NewNode::role(None).with_id("root")).await?;
/// let child = manager
///     .create(NewNode::role(None).with_id("child").with_parent("root"))
///     .await?;
///
/// let read = manager.define_permission("invoices", "read").await?;
/// manager.grant_permission(&root.id, &read.id).await?;
///
/// assert!(manager.is_authorized(&child.id, "invoices", "read").await?);
/// # Ok::<(), helios_authz::AuthzError>(())
/// # }).unwrap();
/// # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
/// #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
/// # }
/// ```
pub struct HierarchyManager<S: ?Sized> {
    store: Arc<S>,
    config: HierarchyConfig,
    locks: TreeLocks,
    revision: AtomicU64,
}

impl<S: ?Sized> std::fmt::Debug for HierarchyManager<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HierarchyManager")
            .field("config", &self.config)
            .field("revision", &self.revision.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

/// Normalizes creation attributes: `null` becomes an empty object.
fn normalize_attributes(attributes: Value) -> AuthzResult<Value> {
    match attributes {
        Value::Null => Ok(Value::Object(Map::new())),
        Value::Object(_) => Ok(attributes),
        other => Err(ValidationError::InvalidAttributes {
            message: format!("expected a JSON object, got {}", json_type(&other)),
        }
        .into()),
    }
}

fn validate_patch(patch: &NodePatch) -> AuthzResult<()> {
    match &patch.attributes {
        Some(Value::Object(_)) | None => Ok(()),
        Some(other) => Err(ValidationError::InvalidAttributes {
            message: format!("merge patch must be a JSON object, got {}", json_type(other)),
        }
        .into()),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn require(field: &str, value: &str) -> AuthzResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::MissingRequiredField {
            field: field.to_string(),
        }
        .into());
    }
    Ok(())
}

impl<S: TreeStore + ?Sized> HierarchyManager<S> {
    /// Creates a manager with the default configuration.
    pub fn new(store: Arc<S>) -> Self {
        Self::with_config(store, HierarchyConfig::default())
    }

    /// Creates a manager with a custom configuration.
    pub fn with_config(store: Arc<S>, config: HierarchyConfig) -> Self {
        Self {
            store,
            config,
            locks: TreeLocks::new(),
            revision: AtomicU64::new(0),
        }
    }

    /// Returns the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Returns the configuration.
    pub fn config(&self) -> &HierarchyConfig {
        &self.config
    }

    /// A navigator over the managed store.
    pub fn navigator(&self) -> TreeNavigator<'_, S> {
        TreeNavigator::new(&*self.store)
    }

    /// A cycle guard over the managed store.
    pub fn guard(&self) -> CycleGuard<'_, S> {
        CycleGuard::new(&*self.store)
    }

    /// A permission resolver over the managed store.
    pub fn resolver(&self) -> PermissionResolver<'_, S> {
        PermissionResolver::new(&*self.store)
    }

    /// A counter that changes after every committed write made through this
    /// manager.
    ///
    /// Callers caching effective permissions can key their cache on
    /// `(role_id, revision)` and drop entries whose revision is stale.
    pub fn revision(&self) -> u64 {
        self.revision.load(Ordering::SeqCst)
    }

    fn bump(&self) {
        self.revision.fetch_add(1, Ordering::SeqCst);
    }

    /// Verifies that the store can serve requests.
    pub async fn health_check(&self) -> AuthzResult<()> {
        self.store.health_check().await
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// Loads a node.
    ///
    /// # Errors
    ///
    /// * `HierarchyError::NotFound` - If the node does not exist
    pub async fn get(&self, kind: NodeKind, id: &NodeId) -> AuthzResult<Node> {
        self.navigator().node(kind, id).await
    }

    /// Lists every node of a kind in creation order.
    pub async fn list(&self, kind: NodeKind) -> AuthzResult<Vec<Node>> {
        self.store.list_nodes(kind).await
    }

    /// Direct children of a node in creation order.
    pub async fn children(&self, kind: NodeKind, id: &NodeId) -> AuthzResult<Vec<Node>> {
        self.navigator().children(kind, id).await
    }

    /// All descendants of a node in breadth-first order.
    pub async fn descendants(&self, kind: NodeKind, id: &NodeId) -> AuthzResult<Vec<Node>> {
        self.navigator().descendants(kind, id).await
    }

    /// The ancestor chain of a node, immediate parent first.
    pub async fn ancestors(&self, kind: NodeKind, id: &NodeId) -> AuthzResult<Vec<Node>> {
        self.navigator().ancestors(kind, id).await
    }

    /// Returns `true` if `node_id` lies below `ancestor_candidate_id`.
    pub async fn is_descendant(
        &self,
        kind: NodeKind,
        ancestor_candidate_id: &NodeId,
        node_id: &NodeId,
    ) -> AuthzResult<bool> {
        self.guard()
            .is_descendant(kind, ancestor_candidate_id, node_id)
            .await
    }

    // ------------------------------------------------------------------
    // Single-target writes
    // ------------------------------------------------------------------

    /// Creates a node.
    ///
    /// A new node is a leaf, so only the parent's existence and, for roles,
    /// tenant equality need checking.
    ///
    /// # Errors
    ///
    /// * `ValidationError` - If attributes are not an object, or an organization carries a tenant
    /// * `HierarchyError::TenantNotFound` - If the role's organization does not exist
    /// * `HierarchyError::AlreadyExists` - If the id is taken
    /// * `HierarchyError::ParentNotFound` - If the parent does not exist
    /// * `HierarchyError::TenantMismatch` - If a role's parent has another tenant
    pub async fn create(&self, new: NewNode) -> AuthzResult<Node> {
        let NewNode {
            kind,
            id,
            parent_id,
            tenant_id,
            attributes,
        } = new;

        let attributes = normalize_attributes(attributes)?;
        if !kind.is_tenant_scoped() && tenant_id.is_some() {
            return Err(ValidationError::UnexpectedTenant { kind }.into());
        }
        let id = match id {
            Some(id) if id.is_blank() => {
                return Err(ValidationError::MissingRequiredField {
                    field: "id".to_string(),
                }
                .into());
            }
            Some(id) => id,
            None => NodeId::generate(),
        };

        let mut scopes = vec![LockScope::of(kind, tenant_id.as_ref())];
        if tenant_id.is_some() {
            // Keeps the tenant organization from being deleted meanwhile.
            scopes.push(LockScope::Organizations);
        }
        let _guard = self.locks.acquire(scopes).await;

        if let Some(tenant) = &tenant_id {
            if self
                .store
                .get_node(NodeKind::Organization, tenant)
                .await?
                .is_none()
            {
                return Err(HierarchyError::TenantNotFound {
                    tenant_id: tenant.clone(),
                }
                .into());
            }
        }

        if self.store.get_node(kind, &id).await?.is_some() {
            return Err(HierarchyError::AlreadyExists { kind, id }.into());
        }

        if let Some(parent_id) = &parent_id {
            let parent = self.load_parent(kind, parent_id).await?;
            if kind.is_tenant_scoped() && parent.tenant_id != tenant_id {
                return Err(HierarchyError::TenantMismatch {
                    id: id.clone(),
                    scope: TenantScope::from_tenant(tenant_id.as_ref()),
                    other_id: parent.id.clone(),
                    other_scope: parent.scope(),
                }
                .into());
            }
        }

        let node = Node::new(kind, id, parent_id, tenant_id, attributes);
        self.store.insert_node(&node).await?;
        self.bump();

        info!(
            kind = %kind,
            id = %node.id,
            parent_id = ?node.parent_id,
            tenant_id = ?node.tenant_id,
            "Created node"
        );
        Ok(node)
    }

    /// Applies an attribute merge patch and/or a reparent to one node.
    ///
    /// The whole patch is validated before anything is written; a failing
    /// reparent leaves the attributes untouched too.
    ///
    /// # Errors
    ///
    /// * `HierarchyError::NotFound` - If the node does not exist
    /// * Any error of [`reparent`](Self::reparent) when the patch moves the node
    pub async fn update(
        &self,
        kind: NodeKind,
        id: &NodeId,
        mut patch: NodePatch,
    ) -> AuthzResult<Node> {
        validate_patch(&patch)?;
        let current = self.get(kind, id).await?;
        if patch.is_empty() {
            return Ok(current);
        }

        let _guard = self.locks.acquire([LockScope::of_node(&current)]).await;
        let node = self.get(kind, id).await?;

        let unchanged_parent = match patch.new_parent() {
            Some(new_parent) if node.parent_id.as_ref() == new_parent => true,
            Some(new_parent) => {
                self.validate_reparent(&node, new_parent).await?;
                false
            }
            None => false,
        };
        if unchanged_parent {
            patch.parent_id = None;
        }
        if patch.is_empty() {
            debug!(kind = %kind, id = %id, "Reparent to current parent is a no-op");
            return Ok(node);
        }

        let updated = self
            .store
            .patch_nodes(kind, std::slice::from_ref(id), &patch)
            .await?
            .pop()
            .ok_or_else(|| AuthzError::not_found(kind, id))?;
        self.bump();

        info!(
            kind = %kind,
            id = %id,
            parent_id = ?updated.parent_id,
            version = updated.version,
            "Updated node"
        );
        Ok(updated)
    }

    /// Moves a node under `new_parent_id`, or makes it a root when `None`.
    ///
    /// Moving a node to its current parent succeeds without writing.
    ///
    /// # Errors
    ///
    /// * `HierarchyError::NotFound` - If the node does not exist
    /// * `HierarchyError::SelfParent` - If `new_parent_id` is the node itself
    /// * `HierarchyError::ParentNotFound` - If the new parent does not exist
    /// * `HierarchyError::TenantMismatch` - If a role would get a parent of another tenant
    /// * `HierarchyError::CircularReference` - If the new parent lies below the node
    pub async fn reparent(
        &self,
        kind: NodeKind,
        id: &NodeId,
        new_parent_id: Option<NodeId>,
    ) -> AuthzResult<Node> {
        self.update(kind, id, NodePatch::reparent(new_parent_id))
            .await
    }

    /// Deletes a node, moving its children up to its own parent.
    ///
    /// For roles, permission grants and subject assignments of the node are
    /// removed in the same store transaction.
    ///
    /// # Errors
    ///
    /// * `HierarchyError::NotFound` - If the node does not exist
    /// * `HierarchyError::TenantInUse` - If an organization still scopes roles
    pub async fn delete(&self, kind: NodeKind, id: &NodeId) -> AuthzResult<()> {
        let current = self.get(kind, id).await?;
        let _guard = self.locks.acquire(Self::delete_scopes(&current)).await;
        let node = self.get(kind, id).await?;
        self.delete_locked(&node).await
    }

    fn delete_scopes(node: &Node) -> Vec<LockScope> {
        match node.kind {
            // Role creation in this tenant also takes the organization lock.
            NodeKind::Organization => vec![LockScope::Organizations],
            NodeKind::Role => vec![LockScope::of_node(node)],
        }
    }

    async fn delete_locked(&self, node: &Node) -> AuthzResult<()> {
        if node.kind == NodeKind::Organization {
            let role_count = self.store.count_tenant_roles(&node.id).await?;
            if role_count > 0 {
                return Err(HierarchyError::TenantInUse {
                    tenant_id: node.id.clone(),
                    role_count,
                }
                .into());
            }
        }

        let moved = self.store.remove_node(node.kind, &node.id).await?;
        self.bump();

        info!(
            kind = %node.kind,
            id = %node.id,
            new_parent_id = ?node.parent_id,
            reassigned = moved.len(),
            "Deleted node"
        );
        Ok(())
    }

    async fn load_parent(&self, kind: NodeKind, parent_id: &NodeId) -> AuthzResult<Node> {
        self.store.get_node(kind, parent_id).await?.ok_or_else(|| {
            HierarchyError::ParentNotFound {
                kind,
                parent_id: parent_id.clone(),
            }
            .into()
        })
    }

    /// Checks that `node` may be moved under `new_parent`. Must run under the
    /// node's scope lock.
    async fn validate_reparent(&self, node: &Node, new_parent: Option<&NodeId>) -> AuthzResult<()> {
        let Some(parent_id) = new_parent else {
            return Ok(());
        };

        if *parent_id == node.id {
            return Err(HierarchyError::SelfParent {
                kind: node.kind,
                id: node.id.clone(),
            }
            .into());
        }

        let parent = self.load_parent(node.kind, parent_id).await?;

        if node.kind.is_tenant_scoped() && parent.tenant_id != node.tenant_id {
            return Err(HierarchyError::TenantMismatch {
                id: node.id.clone(),
                scope: node.scope(),
                other_id: parent.id.clone(),
                other_scope: parent.scope(),
            }
            .into());
        }

        if self.guard().is_descendant(node.kind, &node.id, parent_id).await? {
            return Err(HierarchyError::CircularReference {
                kind: node.kind,
                id: node.id.clone(),
                parent_id: parent_id.clone(),
            }
            .into());
        }

        Ok(())
    }

    // ------------------------------------------------------------------
    // Batch writes
    // ------------------------------------------------------------------

    /// Validates the batch size and removes duplicate ids, keeping the first
    /// occurrence.
    fn prepare_batch(&self, ids: &[NodeId]) -> AuthzResult<Vec<NodeId>> {
        if ids.len() > self.config.max_batch_size {
            return Err(ValidationError::BatchTooLarge {
                size: ids.len(),
                max: self.config.max_batch_size,
            }
            .into());
        }
        let mut seen = HashSet::new();
        Ok(ids
            .iter()
            .filter(|id| seen.insert((*id).clone()))
            .cloned()
            .collect())
    }

    /// Reads a chunk before locking, to learn which scopes it touches.
    async fn read_chunk(
        &self,
        kind: NodeKind,
        chunk: &[NodeId],
    ) -> AuthzResult<HashMap<NodeId, Node>> {
        Ok(self
            .store
            .get_nodes(kind, chunk)
            .await?
            .into_iter()
            .map(|n| (n.id.clone(), n))
            .collect())
    }

    fn chunk_scopes(kind: NodeKind, nodes: &HashMap<NodeId, Node>) -> Vec<LockScope> {
        let mut scopes: Vec<LockScope> = nodes
            .values()
            .flat_map(Self::delete_scopes)
            .collect();
        if scopes.is_empty() {
            scopes.push(LockScope::of(kind, None));
        }
        scopes
    }

    fn record_failure(
        outcome: &mut BatchOutcome,
        kind: NodeKind,
        id: &NodeId,
        error: AuthzError,
    ) -> AuthzResult<()> {
        if error.is_fatal() {
            return Err(error);
        }
        warn!(kind = %kind, id = %id, error = %error, "Batch item failed");
        outcome.fail(id.clone(), &error);
        Ok(())
    }

    /// Deletes many nodes. Each deletion is independent; failures are
    /// reported per item and never roll back earlier deletions.
    ///
    /// # Errors
    ///
    /// * `ValidationError::BatchTooLarge` - If more ids than allowed are given
    /// * `HierarchyError::CorruptHierarchy` - Aborts the remaining items
    pub async fn bulk_delete(&self, kind: NodeKind, ids: &[NodeId]) -> AuthzResult<BatchOutcome> {
        let ids = self.prepare_batch(ids)?;
        let mut outcome = BatchOutcome::default();

        for chunk in ids.chunks(self.config.bulk_chunk_size.max(1)) {
            let known = self.read_chunk(kind, chunk).await?;
            let _guard = self.locks.acquire(Self::chunk_scopes(kind, &known)).await;

            for id in chunk {
                let result = match known.get(id) {
                    Some(_) => match self.store.get_node(kind, id).await {
                        Ok(Some(node)) => self.delete_locked(&node).await,
                        Ok(None) => Err(AuthzError::not_found(kind, id)),
                        Err(e) => Err(e),
                    },
                    None => Err(AuthzError::not_found(kind, id)),
                };
                match result {
                    Ok(()) => outcome.count += 1,
                    Err(e) => Self::record_failure(&mut outcome, kind, id, e)?,
                }
            }
        }

        info!(
            kind = %kind,
            deleted = outcome.count,
            failed = outcome.errors.len(),
            "Bulk delete finished"
        );
        Ok(outcome)
    }

    /// Applies one patch to many nodes.
    ///
    /// When the patch moves nodes, each item is validated like a single
    /// reparent first; invalid items are reported and excluded. The remaining
    /// items of each chunk are written in one batched store write.
    ///
    /// # Errors
    ///
    /// * `ValidationError` - If the patch is empty or malformed, or the batch is too large
    /// * `HierarchyError::CorruptHierarchy` - Aborts the remaining items
    pub async fn bulk_update_attributes(
        &self,
        kind: NodeKind,
        ids: &[NodeId],
        patch: NodePatch,
    ) -> AuthzResult<BatchOutcome> {
        validate_patch(&patch)?;
        if patch.is_empty() {
            return Err(ValidationError::MissingRequiredField {
                field: "attributes".to_string(),
            }
            .into());
        }
        let outcome = self.bulk_patch(kind, ids, &patch).await?;
        info!(
            kind = %kind,
            updated = outcome.count,
            failed = outcome.errors.len(),
            "Bulk attribute update finished"
        );
        Ok(outcome)
    }

    /// Moves many nodes under one new parent (or to the root when `None`).
    ///
    /// Each id is checked independently for `SelfParent`, `ParentNotFound`,
    /// `TenantMismatch` and `CircularReference`. Nodes already under the new
    /// parent count as updated without being written.
    ///
    /// # Errors
    ///
    /// * `ValidationError::BatchTooLarge` - If more ids than allowed are given
    /// * `HierarchyError::CorruptHierarchy` - Aborts the remaining items
    pub async fn bulk_change_parent(
        &self,
        kind: NodeKind,
        ids: &[NodeId],
        new_parent_id: Option<NodeId>,
    ) -> AuthzResult<BatchOutcome> {
        let outcome = self
            .bulk_patch(kind, ids, &NodePatch::reparent(new_parent_id))
            .await?;
        info!(
            kind = %kind,
            updated = outcome.count,
            failed = outcome.errors.len(),
            "Bulk change parent finished"
        );
        Ok(outcome)
    }

    async fn bulk_patch(
        &self,
        kind: NodeKind,
        ids: &[NodeId],
        patch: &NodePatch,
    ) -> AuthzResult<BatchOutcome> {
        let ids = self.prepare_batch(ids)?;
        let moves_only = patch.attributes.is_none();
        let mut outcome = BatchOutcome::default();

        for chunk in ids.chunks(self.config.bulk_chunk_size.max(1)) {
            let known = self.read_chunk(kind, chunk).await?;
            let _guard = self.locks.acquire(Self::chunk_scopes(kind, &known)).await;

            let mut valid = Vec::with_capacity(chunk.len());
            for id in chunk {
                if !known.contains_key(id) {
                    Self::record_failure(&mut outcome, kind, id, AuthzError::not_found(kind, id))?;
                    continue;
                }
                let node = match self.store.get_node(kind, id).await {
                    Ok(Some(node)) => node,
                    Ok(None) => {
                        let err = AuthzError::not_found(kind, id);
                        Self::record_failure(&mut outcome, kind, id, err)?;
                        continue;
                    }
                    Err(e) => {
                        Self::record_failure(&mut outcome, kind, id, e)?;
                        continue;
                    }
                };

                match patch.new_parent() {
                    Some(new_parent) if node.parent_id.as_ref() == new_parent => {
                        if moves_only {
                            outcome.count += 1;
                        } else {
                            valid.push(node.id);
                        }
                    }
                    Some(new_parent) => match self.validate_reparent(&node, new_parent).await {
                        Ok(()) => valid.push(node.id),
                        Err(e) => Self::record_failure(&mut outcome, kind, id, e)?,
                    },
                    None => valid.push(node.id),
                }
            }

            if valid.is_empty() {
                continue;
            }
            match self.store.patch_nodes(kind, &valid, patch).await {
                Ok(updated) => {
                    outcome.count += updated.len() as u64;
                    self.bump();
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!(kind = %kind, error = %e, items = valid.len(), "Batched write failed");
                    outcome
                        .errors
                        .extend(valid.into_iter().map(|id| BatchItemError::new(id, &e)));
                }
            }
        }

        Ok(outcome)
    }

    // ------------------------------------------------------------------
    // Permissions
    // ------------------------------------------------------------------

    /// Defines a `(resource_id, action)` permission, returning the existing
    /// record if the pair is already defined.
    pub async fn define_permission(
        &self,
        resource_id: &str,
        action: &str,
    ) -> AuthzResult<Permission> {
        require("resourceId", resource_id)?;
        require("action", action)?;
        let permission = self.store.upsert_permission(resource_id, action).await?;
        self.bump();
        debug!(permission_id = %permission.id, resource_id, action, "Defined permission");
        Ok(permission)
    }

    /// Loads a permission record.
    pub async fn get_permission(&self, permission_id: &str) -> AuthzResult<Permission> {
        self.store
            .get_permission(permission_id)
            .await?
            .ok_or_else(|| {
                PermissionError::NotFound {
                    permission_id: permission_id.to_string(),
                }
                .into()
            })
    }

    /// Lists every defined permission.
    pub async fn list_permissions(&self) -> AuthzResult<Vec<Permission>> {
        self.store.list_permissions().await
    }

    /// Attaches a permission to a role. Returns `false` if it was attached already.
    pub async fn grant_permission(
        &self,
        role_id: &NodeId,
        permission_id: &str,
    ) -> AuthzResult<bool> {
        let role = self.get(NodeKind::Role, role_id).await?;
        let _guard = self.locks.acquire([LockScope::of_node(&role)]).await;
        self.get(NodeKind::Role, role_id).await?;
        self.get_permission(permission_id).await?;

        let granted = self.store.grant_permission(role_id, permission_id).await?;
        if granted {
            self.bump();
            info!(role_id = %role_id, permission_id, "Granted permission");
        }
        Ok(granted)
    }

    /// Detaches a permission from a role. Returns `false` if it was not attached.
    pub async fn revoke_permission(
        &self,
        role_id: &NodeId,
        permission_id: &str,
    ) -> AuthzResult<bool> {
        let role = self.get(NodeKind::Role, role_id).await?;
        let _guard = self.locks.acquire([LockScope::of_node(&role)]).await;

        let revoked = self.store.revoke_permission(role_id, permission_id).await?;
        if revoked {
            self.bump();
            info!(role_id = %role_id, permission_id, "Revoked permission");
        }
        Ok(revoked)
    }

    /// The permissions attached directly to a role.
    pub async fn direct_permissions(&self, role_id: &NodeId) -> AuthzResult<Vec<Permission>> {
        self.resolver().direct_permissions(role_id).await
    }

    /// The role's permissions including everything inherited from ancestors.
    pub async fn effective_permissions(
        &self,
        role_id: &NodeId,
    ) -> AuthzResult<EffectivePermissions> {
        self.resolver().effective_permissions(role_id).await
    }

    /// Returns `true` if the role grants `action` on `resource_id`.
    pub async fn is_authorized(
        &self,
        role_id: &NodeId,
        resource_id: &str,
        action: &str,
    ) -> AuthzResult<bool> {
        self.resolver()
            .is_authorized(role_id, resource_id, action)
            .await
    }

    // ------------------------------------------------------------------
    // Role assignments
    // ------------------------------------------------------------------

    /// Assigns a role to a subject. Returns `false` if it was assigned already.
    pub async fn assign_role(&self, subject_id: &str, role_id: &NodeId) -> AuthzResult<bool> {
        require("subjectId", subject_id)?;
        let role = self.get(NodeKind::Role, role_id).await?;
        let _guard = self.locks.acquire([LockScope::of_node(&role)]).await;
        self.get(NodeKind::Role, role_id).await?;

        let assigned = self.store.assign_role(subject_id, role_id).await?;
        if assigned {
            self.bump();
            info!(subject_id, role_id = %role_id, "Assigned role");
        }
        Ok(assigned)
    }

    /// Removes a role from a subject. Returns `false` if it was not assigned.
    pub async fn unassign_role(&self, subject_id: &str, role_id: &NodeId) -> AuthzResult<bool> {
        require("subjectId", subject_id)?;
        let unassigned = self.store.unassign_role(subject_id, role_id).await?;
        if unassigned {
            self.bump();
            info!(subject_id, role_id = %role_id, "Unassigned role");
        }
        Ok(unassigned)
    }

    /// The roles assigned to a subject.
    pub async fn subject_roles(&self, subject_id: &str) -> AuthzResult<Vec<Node>> {
        require("subjectId", subject_id)?;
        let ids = self.store.subject_roles(subject_id).await?;
        self.store.get_nodes(NodeKind::Role, &ids).await
    }

    /// The union of the effective permissions of a subject's roles.
    pub async fn subject_permissions(&self, subject_id: &str) -> AuthzResult<EffectivePermissions> {
        self.resolver().subject_permissions(subject_id).await
    }

    /// Returns `true` if any role assigned to the subject grants `action` on
    /// `resource_id`.
    pub async fn authorize_subject(
        &self,
        subject_id: &str,
        resource_id: &str,
        action: &str,
    ) -> AuthzResult<bool> {
        let allowed = self
            .subject_permissions(subject_id)
            .await?
            .contains(resource_id, action);
        debug!(subject_id, resource_id, action, allowed, "Authorization check");
        Ok(allowed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::memory::InMemoryStore;
    use serde_json::json;

    fn manager() -> HierarchyManager<InMemoryStore> {
        HierarchyManager::new(Arc::new(InMemoryStore::new()))
    }

    #[test]
    fn test_normalize_attributes() {
        assert_eq!(normalize_attributes(Value::Null).unwrap(), json!({}));
        assert!(normalize_attributes(json!([1])).is_err());
    }

    #[tokio::test]
    async fn test_create_rejects_non_object_attributes() {
        let err = manager()
            .create(NewNode::organization().with_attributes(json!("acme")))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "Validation");
    }

    #[tokio::test]
    async fn test_organization_cannot_carry_tenant() {
        let mut new = NewNode::organization();
        new.tenant_id = Some(NodeId::new("acme"));
        let err = manager().create(new).await.unwrap_err();
        assert!(matches!(
            err,
            AuthzError::Validation(ValidationError::UnexpectedTenant { .. })
        ));
    }

    #[tokio::test]
    async fn test_generated_ids() {
        let m = manager();
        let node = m.create(NewNode::organization()).await.unwrap();
        assert!(!node.id.is_blank());
        assert_eq!(node.attributes, json!({}));
    }

    #[tokio::test]
    async fn test_revision_changes_on_writes_only() {
        let m = manager();
        assert_eq!(m.revision(), 0);
        let node = m.create(NewNode::role(None).with_id("r")).await.unwrap();
        let after_create = m.revision();
        assert!(after_create > 0);

        m.get(NodeKind::Role, &node.id).await.unwrap();
        m.effective_permissions(&node.id).await.unwrap();
        assert_eq!(m.revision(), after_create);

        m.reparent(NodeKind::Role, &node.id, None).await.unwrap();
        assert_eq!(m.revision(), after_create);
    }

    #[tokio::test]
    async fn test_batch_too_large() {
        let m = HierarchyManager::with_config(
            Arc::new(InMemoryStore::new()),
            HierarchyConfig::default().with_max_batch_size(2),
        );
        let ids: Vec<NodeId> = ["a", "b", "c"].into_iter().map(NodeId::new).collect();
        let err = m.bulk_delete(NodeKind::Role, &ids).await.unwrap_err();
        assert_eq!(err.code(), "Validation");
    }

    #[tokio::test]
    async fn test_batch_dedupes_ids() {
        let m = manager();
        m.create(NewNode::role(None).with_id("a")).await.unwrap();
        let ids = vec![NodeId::new("a"), NodeId::new("a")];
        let outcome = m.bulk_delete(NodeKind::Role, &ids).await.unwrap();
        assert_eq!(outcome.count, 1);
        assert!(outcome.is_complete());
    }

    #[tokio::test]
    async fn test_empty_bulk_patch_rejected() {
        let err = manager()
            .bulk_update_attributes(NodeKind::Role, &[NodeId::new("a")], NodePatch::default())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "Validation");
    }

    #[tokio::test]
    async fn test_permission_requires_fields() {
        let err = manager().define_permission("", "read").await.unwrap_err();
        assert_eq!(err.to_string(), "missing required field: resourceId");
    }
}
