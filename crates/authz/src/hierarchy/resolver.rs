//! Effective permission resolution.

use std::collections::HashMap;

use tracing::debug;

use crate::core::{RoleGrants, TreeStore};
use crate::error::{AuthzError, AuthzResult, ValidationError};
use crate::types::{EffectivePermissions, NodeId, NodeKind, Permission};

use super::navigator::{TreeNavigator, chain_of};

/// Resolves what a role grants once inheritance from its ancestors is applied.
///
/// Permissions are additive: a role grants its own permissions plus every
/// permission of every ancestor. There is no deny. Nothing is cached here;
/// see [`HierarchyManager::revision`](super::HierarchyManager::revision).
pub struct PermissionResolver<'a, S: ?Sized> {
    store: &'a S,
    navigator: TreeNavigator<'a, S>,
}

impl<'a, S: TreeStore + ?Sized> PermissionResolver<'a, S> {
    /// Creates a resolver over the given store.
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            navigator: TreeNavigator::new(store),
        }
    }

    /// The permissions attached directly to a role.
    pub async fn direct_permissions(&self, role_id: &NodeId) -> AuthzResult<Vec<Permission>> {
        self.navigator.node(NodeKind::Role, role_id).await?;
        let rows = self
            .store
            .direct_permissions(std::slice::from_ref(role_id))
            .await?;
        Ok(rows.into_iter().map(|(_, p)| p).collect())
    }

    /// The union of the role's direct permissions and those of all its
    /// ancestors, de-duplicated by `(resourceId, action)`.
    ///
    /// When the same pair is attached at several levels, the record closest
    /// to the role is kept. The role, its chain and every grant are read from
    /// one snapshot, so a concurrent reparent or grant is either fully
    /// visible or not at all.
    pub async fn effective_permissions(
        &self,
        role_id: &NodeId,
    ) -> AuthzResult<EffectivePermissions> {
        let RoleGrants {
            role,
            ancestor_rows,
            grants,
        } = self
            .store
            .role_grants_snapshot(role_id)
            .await?
            .ok_or_else(|| AuthzError::not_found(NodeKind::Role, role_id))?;
        let chain = chain_of(&role, ancestor_rows)?;

        let mut levels = Vec::with_capacity(chain.len() + 1);
        levels.push(role.id);
        levels.extend(chain.into_iter().map(|n| n.id));

        let mut by_role: HashMap<NodeId, Vec<Permission>> = HashMap::new();
        for (owner, permission) in grants {
            by_role.entry(owner).or_default().push(permission);
        }

        let mut effective = EffectivePermissions::new();
        for level in &levels {
            for permission in by_role.remove(level).unwrap_or_default() {
                effective.insert(permission);
            }
        }

        debug!(
            role_id = %role_id,
            depth = levels.len(),
            count = effective.len(),
            "Resolved effective permissions"
        );
        Ok(effective)
    }

    /// Returns `true` if the role grants `action` on `resource_id`.
    pub async fn is_authorized(
        &self,
        role_id: &NodeId,
        resource_id: &str,
        action: &str,
    ) -> AuthzResult<bool> {
        Ok(self
            .effective_permissions(role_id)
            .await?
            .contains(resource_id, action))
    }

    /// The union of the effective permissions of every role assigned to a
    /// subject. Roles that no longer exist are skipped.
    pub async fn subject_permissions(&self, subject_id: &str) -> AuthzResult<EffectivePermissions> {
        if subject_id.trim().is_empty() {
            return Err(ValidationError::MissingRequiredField {
                field: "subjectId".to_string(),
            }
            .into());
        }

        let mut effective = EffectivePermissions::new();
        for role_id in self.store.subject_roles(subject_id).await? {
            match self.effective_permissions(&role_id).await {
                Ok(set) => effective.extend(set),
                Err(AuthzError::Hierarchy(crate::error::HierarchyError::NotFound { .. })) => {
                    continue;
                }
                Err(e) => return Err(e),
            }
        }
        Ok(effective)
    }
}
