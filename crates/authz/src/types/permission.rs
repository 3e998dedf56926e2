//! Permission types and the effective permission set.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A globally defined `(resourceId, action)` grant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Permission {
    /// Record id.
    pub id: String,
    /// The protected resource.
    pub resource_id: String,
    /// The action allowed on the resource.
    pub action: String,
}

impl Permission {
    /// Creates a permission record.
    pub fn new(
        id: impl Into<String>,
        resource_id: impl Into<String>,
        action: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            resource_id: resource_id.into(),
            action: action.into(),
        }
    }

    /// Returns the identity of the grant, independent of the record id.
    pub fn key(&self) -> PermissionKey {
        PermissionKey::new(&self.resource_id, &self.action)
    }
}

/// The `(resourceId, action)` identity of a permission.
///
/// Two permission records with the same key grant the same thing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionKey {
    /// The protected resource.
    pub resource_id: String,
    /// The action allowed on the resource.
    pub action: String,
}

impl PermissionKey {
    /// Creates a key.
    pub fn new(resource_id: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            resource_id: resource_id.into(),
            action: action.into(),
        }
    }
}

impl fmt::Display for PermissionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.resource_id, self.action)
    }
}

/// The permissions a role grants once inheritance is resolved.
///
/// Entries are de-duplicated by [`PermissionKey`]. When several records
/// share a key, the first one inserted is kept, so inserting the role's own
/// permissions before its ancestors' keeps the closest record.
///
/// # Examples
///
/// ```
/// use helios_authz::types::{EffectivePermissions, Permission};
///
/// let mut set = EffectivePermissions::new();
/// set.insert(Permission::new("p1", "invoices", "read"));
/// set.insert(Permission::new("p2", "invoices", "read"));
///
/// assert_eq!(set.len(), 1);
/// assert!(set.contains("invoices", "read"));
/// assert!(!set.contains("invoices", "write"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EffectivePermissions {
    entries: BTreeMap<PermissionKey, Permission>,
}

impl EffectivePermissions {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a permission unless its key is already present.
    ///
    /// Returns `true` if the permission was added.
    pub fn insert(&mut self, permission: Permission) -> bool {
        let key = permission.key();
        if self.entries.contains_key(&key) {
            return false;
        }
        self.entries.insert(key, permission);
        true
    }

    /// Returns `true` if the set grants `action` on `resource_id`.
    pub fn contains(&self, resource_id: &str, action: &str) -> bool {
        self.entries
            .contains_key(&PermissionKey::new(resource_id, action))
    }

    /// Returns `true` if the set contains the given key.
    pub fn contains_key(&self, key: &PermissionKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of distinct grants.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is granted.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates the grants ordered by key.
    pub fn iter(&self) -> impl Iterator<Item = &Permission> {
        self.entries.values()
    }

    /// Iterates the distinct keys.
    pub fn keys(&self) -> impl Iterator<Item = &PermissionKey> {
        self.entries.keys()
    }

    /// Merges another set into this one, keeping existing entries.
    pub fn extend(&mut self, other: EffectivePermissions) {
        for permission in other.entries.into_values() {
            self.insert(permission);
        }
    }

    /// Consumes the set, returning the grants ordered by key.
    pub fn into_vec(self) -> Vec<Permission> {
        self.entries.into_values().collect()
    }
}

impl FromIterator<Permission> for EffectivePermissions {
    fn from_iter<I: IntoIterator<Item = Permission>>(iter: I) -> Self {
        let mut set = EffectivePermissions::new();
        for permission in iter {
            set.insert(permission);
        }
        set
    }
}

impl Serialize for EffectivePermissions {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.entries.values())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_record_wins() {
        let mut set = EffectivePermissions::new();
        assert!(set.insert(Permission::new("own", "doc", "read")));
        assert!(!set.insert(Permission::new("inherited", "doc", "read")));

        let kept: Vec<_> = set.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(kept, vec!["own"]);
    }

    #[test]
    fn test_from_iterator_dedupes() {
        let set: EffectivePermissions = vec![
            Permission::new("a", "doc", "read"),
            Permission::new("b", "doc", "write"),
            Permission::new("c", "doc", "read"),
        ]
        .into_iter()
        .collect();
        assert_eq!(set.len(), 2);
        assert!(set.contains_key(&PermissionKey::new("doc", "write")));
    }

    #[test]
    fn test_serializes_as_array() {
        let set: EffectivePermissions = vec![Permission::new("a", "doc", "read")]
            .into_iter()
            .collect();
        let value = serde_json::to_value(&set).unwrap();
        assert_eq!(
            value,
            serde_json::json!([{"id": "a", "resourceId": "doc", "action": "read"}])
        );
    }

    #[test]
    fn test_extend_keeps_existing() {
        let mut left: EffectivePermissions =
            vec![Permission::new("a", "doc", "read")].into_iter().collect();
        let right: EffectivePermissions = vec![
            Permission::new("b", "doc", "read"),
            Permission::new("c", "doc", "delete"),
        ]
        .into_iter()
        .collect();
        left.extend(right);
        assert_eq!(left.len(), 2);
        assert_eq!(left.iter().find(|p| p.action == "read").unwrap().id, "a");
    }
}
