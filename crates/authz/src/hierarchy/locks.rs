//! Writer serialization per tree scope.
//!
//! Every mutation validates invariants against the tree and then writes. The
//! validation is only meaningful if no other writer changes the same tree in
//! between, so writers hold the lock of every scope they touch for the whole
//! read-validate-write sequence. Readers never take these locks.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::trace;

use crate::types::{Node, NodeId, NodeKind, TenantScope};

/// A unit of writer serialization.
///
/// Scopes are totally ordered: the organization tree first, then role
/// scopes (global before tenants, tenants by id). Locks are always acquired
/// in that order, which rules out deadlocks between multi-scope writers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LockScope {
    /// The whole organization tree.
    Organizations,
    /// The roles of one tenant, or the global roles.
    Roles(TenantScope),
}

impl LockScope {
    /// The scope a node of the given kind and tenant belongs to.
    pub fn of(kind: NodeKind, tenant_id: Option<&NodeId>) -> Self {
        match kind {
            NodeKind::Organization => LockScope::Organizations,
            NodeKind::Role => LockScope::Roles(TenantScope::from_tenant(tenant_id)),
        }
    }

    /// The scope of an existing node.
    pub fn of_node(node: &Node) -> Self {
        Self::of(node.kind, node.tenant_id.as_ref())
    }
}

type Registry = Arc<Mutex<HashMap<LockScope, Arc<AsyncMutex<()>>>>>;

/// Registry of per-scope writer locks.
///
/// Entries only live while some writer holds or waits for them, so the
/// registry does not grow with the number of tenants ever written.
#[derive(Debug, Default)]
pub struct TreeLocks {
    scopes: Registry,
}

/// Holds the locks of one or more scopes until dropped.
#[derive(Debug)]
pub struct TreeGuard {
    scopes: Vec<LockScope>,
    guards: Vec<OwnedMutexGuard<()>>,
    registry: Registry,
}

impl TreeGuard {
    /// The scopes held, in acquisition order.
    pub fn scopes(&self) -> &[LockScope] {
        &self.scopes
    }

    /// Returns `true` if the guard holds the given scope.
    pub fn holds(&self, scope: &LockScope) -> bool {
        self.scopes.contains(scope)
    }
}

impl Drop for TreeGuard {
    fn drop(&mut self) {
        self.guards.clear();
        // Handles are cloned under the registry lock, so a count of one here
        // means no writer holds or awaits the scope.
        let mut registry = self.registry.lock();
        for scope in &self.scopes {
            if registry
                .get(scope)
                .is_some_and(|lock| Arc::strong_count(lock) == 1)
            {
                registry.remove(scope);
                trace!(scope = ?scope, "Released idle tree lock");
            }
        }
    }
}

impl TreeLocks {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of scopes currently held or awaited.
    pub fn len(&self) -> usize {
        self.scopes.lock().len()
    }

    /// Returns `true` if no scope is held or awaited.
    pub fn is_empty(&self) -> bool {
        self.scopes.lock().is_empty()
    }

    fn handle(&self, scope: &LockScope) -> Arc<AsyncMutex<()>> {
        let mut scopes = self.scopes.lock();
        scopes.entry(scope.clone()).or_default().clone()
    }

    /// Acquires every listed scope, de-duplicated, in the global order.
    pub async fn acquire<I>(&self, scopes: I) -> TreeGuard
    where
        I: IntoIterator<Item = LockScope>,
    {
        let ordered: BTreeSet<LockScope> = scopes.into_iter().collect();
        let mut guards = Vec::with_capacity(ordered.len());
        for scope in &ordered {
            guards.push(self.handle(scope).lock_owned().await);
            trace!(scope = ?scope, "Acquired tree lock");
        }
        TreeGuard {
            scopes: ordered.into_iter().collect(),
            guards,
            registry: self.scopes.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn tenant(id: &str) -> LockScope {
        LockScope::Roles(TenantScope::Tenant(NodeId::new(id)))
    }

    #[tokio::test]
    async fn test_scopes_are_acquired_in_order() {
        let locks = TreeLocks::new();
        let guard = locks
            .acquire([tenant("b"), LockScope::Organizations, tenant("a"), tenant("b")])
            .await;
        assert_eq!(
            guard.scopes(),
            &[LockScope::Organizations, tenant("a"), tenant("b")]
        );
        assert!(guard.holds(&tenant("a")));
        assert!(!guard.holds(&LockScope::Roles(TenantScope::Global)));
    }

    #[tokio::test]
    async fn test_same_scope_is_exclusive() {
        let locks = Arc::new(TreeLocks::new());
        let guard = locks.acquire([tenant("acme")]).await;

        let contender = locks.clone();
        let blocked = tokio::time::timeout(
            Duration::from_millis(50),
            contender.acquire([tenant("acme")]),
        )
        .await;
        assert!(blocked.is_err());

        drop(guard);
        let acquired =
            tokio::time::timeout(Duration::from_millis(500), locks.acquire([tenant("acme")]))
                .await;
        assert!(acquired.is_ok());
    }

    #[tokio::test]
    async fn test_different_scopes_do_not_block() {
        let locks = TreeLocks::new();
        let _acme = locks.acquire([tenant("acme")]).await;
        let other =
            tokio::time::timeout(Duration::from_millis(500), locks.acquire([tenant("globex")]))
                .await;
        assert!(other.is_ok());
    }

    #[tokio::test]
    async fn test_released_scopes_leave_the_registry() {
        let locks = TreeLocks::new();
        for i in 0..1_000 {
            let guard = locks
                .acquire([tenant(&format!("tenant-{i}")), LockScope::Organizations])
                .await;
            assert_eq!(locks.len(), 2);
            drop(guard);
        }
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_awaited_scope_survives_release() {
        let locks = Arc::new(TreeLocks::new());
        let first = locks.acquire([tenant("acme")]).await;

        let (acquired_tx, acquired_rx) = tokio::sync::oneshot::channel();
        let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();
        let waiter = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.acquire([tenant("acme")]).await;
                let _ = acquired_tx.send(());
                let _ = release_rx.await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        drop(first);
        assert_eq!(locks.len(), 1);
        acquired_rx.await.unwrap();
        assert_eq!(locks.len(), 1);

        // A third writer still contends with the waiter that now holds it.
        let blocked =
            tokio::time::timeout(Duration::from_millis(50), locks.acquire([tenant("acme")])).await;
        assert!(blocked.is_err());

        release_tx.send(()).unwrap();
        waiter.await.unwrap();
        assert!(locks.is_empty());
    }

    #[test]
    fn test_scope_of_node() {
        assert_eq!(
            LockScope::of(NodeKind::Organization, None),
            LockScope::Organizations
        );
        assert_eq!(
            LockScope::of(NodeKind::Role, None),
            LockScope::Roles(TenantScope::Global)
        );
        assert!(LockScope::Organizations < LockScope::Roles(TenantScope::Global));
        assert!(LockScope::Roles(TenantScope::Global) < tenant("a"));
    }
}
