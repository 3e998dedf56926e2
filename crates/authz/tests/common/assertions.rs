//! Assertion helpers for hierarchy tests.

use std::collections::HashSet;
use std::fmt::Debug;
use std::sync::Arc;

use helios_authz::{AuthzResult, BatchOutcome, HierarchyManager, NodeId, NodeKind, TreeStore};

use super::fixtures::{grant, role};

/// Asserts that a result failed with the given error code.
pub fn assert_error_code<T: Debug>(result: AuthzResult<T>, code: &str) {
    match result {
        Ok(value) => panic!("Expected {} error, got Ok({:?})", code, value),
        Err(err) => assert_eq!(
            err.code(),
            code,
            "Expected {} error, got {} ({})",
            code,
            err.code(),
            err
        ),
    }
}

/// Asserts that a batch failed for exactly the listed `(id, code)` pairs, in order.
pub fn assert_batch_errors(outcome: &BatchOutcome, expected: &[(&str, &str)]) {
    let actual: Vec<(String, String)> = outcome
        .errors
        .iter()
        .map(|e| (e.id.to_string(), e.error.clone()))
        .collect();
    let expected: Vec<(String, String)> = expected
        .iter()
        .map(|(id, code)| (id.to_string(), code.to_string()))
        .collect();
    assert_eq!(actual, expected, "Unexpected batch errors");
}

/// Asserts that every node of the kind has a finite ancestor chain that
/// never contains the node itself.
pub async fn assert_acyclic<S: TreeStore + ?Sized>(m: &HierarchyManager<S>, kind: NodeKind) {
    for node in m.list(kind).await.expect("Failed to list nodes") {
        let chain = m
            .ancestors(kind, &node.id)
            .await
            .unwrap_or_else(|e| panic!("Ancestor chain of {} failed: {}", node.id, e));
        let ids: HashSet<_> = chain.iter().map(|n| n.id.clone()).collect();
        assert_eq!(ids.len(), chain.len(), "Chain of {} repeats a node", node.id);
        assert!(!ids.contains(&node.id), "{} is its own ancestor", node.id);
    }
}

/// Moves a role back and forth between two parents while readers resolve
/// it, asserting that every read reflects exactly one committed parent.
///
/// `left` grants `ledger:read`, `right` grants `ledger:write` and the moving
/// role `leaf` grants `ledger:audit` itself.
pub async fn assert_reads_follow_one_parent<S: TreeStore + ?Sized + 'static>(
    m: Arc<HierarchyManager<S>>,
    moves: usize,
) {
    role(&m, None, "left", None).await;
    role(&m, None, "right", None).await;
    role(&m, None, "leaf", Some("left")).await;
    grant(&m, "left", "ledger", "read").await;
    grant(&m, "right", "ledger", "write").await;
    grant(&m, "leaf", "ledger", "audit").await;

    let mover = {
        let m = Arc::clone(&m);
        tokio::spawn(async move {
            for i in 0..moves {
                let parent = if i % 2 == 0 { "right" } else { "left" };
                m.reparent(NodeKind::Role, &NodeId::new("leaf"), Some(NodeId::new(parent)))
                    .await
                    .unwrap_or_else(|e| panic!("Move {} failed: {}", i, e));
            }
        })
    };

    let mut readers = Vec::new();
    for _ in 0..4 {
        let m = Arc::clone(&m);
        readers.push(tokio::spawn(async move {
            let leaf = NodeId::new("leaf");
            for _ in 0..moves {
                let effective = m
                    .effective_permissions(&leaf)
                    .await
                    .unwrap_or_else(|e| panic!("Resolution failed: {}", e));
                assert_eq!(effective.len(), 2, "Mixed states: {:?}", effective);
                assert!(effective.contains("ledger", "audit"));
                assert_ne!(
                    effective.contains("ledger", "read"),
                    effective.contains("ledger", "write"),
                    "Grants of both parents: {:?}",
                    effective
                );

                let chain = m
                    .ancestors(NodeKind::Role, &leaf)
                    .await
                    .unwrap_or_else(|e| panic!("Ancestor chain failed: {}", e));
                assert_eq!(chain.len(), 1);

                let below_left = m
                    .descendants(NodeKind::Role, &NodeId::new("left"))
                    .await
                    .unwrap_or_else(|e| panic!("Descendants failed: {}", e));
                assert!(below_left.len() <= 1);
                tokio::task::yield_now().await;
            }
        }));
    }

    mover.await.unwrap();
    for reader in readers {
        reader.await.unwrap();
    }
}

/// Assertion macro for error codes.
macro_rules! assert_error {
    ($result:expr, $code:literal) => {
        $crate::common::assertions::assert_error_code($result, $code)
    };
}
