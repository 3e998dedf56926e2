//! Batch operation tests: partial success, chunking and per-item validation.

#[macro_use]
mod common;

use serde_json::json;

use common::*;
use helios_authz::{HierarchyConfig, HierarchyManager, NodeId, NodeKind, NodePatch, TreeStore};

fn small_chunks() -> HierarchyConfig {
    HierarchyConfig::default()
        .with_bulk_chunk_size(2)
        .with_max_batch_size(10)
}

// ============================================================================
// Bulk delete
// ============================================================================

async fn bulk_delete_partial_success<S: TreeStore + ?Sized>(m: HierarchyManager<S>) {
    role(&m, None, "valid", None).await;

    let outcome = m
        .bulk_delete(NodeKind::Role, &ids(&["valid", "missing"]))
        .await
        .unwrap();

    assert_eq!(outcome.count, 1);
    assert_batch_errors(&outcome, &[("missing", "NotFound")]);
    assert_error!(m.get(NodeKind::Role, &NodeId::new("valid")).await, "NotFound");
}
backend_test!(bulk_delete_partial_success, bulk_delete_partial_success);

async fn bulk_delete_parent_and_child<S: TreeStore + ?Sized>(m: HierarchyManager<S>) {
    role_chain(&m, &["a", "b", "c", "d"]).await;

    let outcome = m
        .bulk_delete(NodeKind::Role, &ids(&["b", "c"]))
        .await
        .unwrap();
    assert_eq!(outcome.count, 2);
    assert!(outcome.is_complete());

    let d = m.get(NodeKind::Role, &NodeId::new("d")).await.unwrap();
    assert_eq!(d.parent_id, Some(NodeId::new("a")));
}
backend_test!(bulk_delete_parent_and_child, bulk_delete_parent_and_child);

async fn bulk_delete_across_chunks<S: TreeStore + ?Sized>(m: HierarchyManager<S>) {
    for id in ["r1", "r2", "r3", "r4", "r5"] {
        role(&m, None, id, None).await;
    }

    let outcome = m
        .bulk_delete(NodeKind::Role, &ids(&["r1", "x1", "r2", "r3", "x2", "r4", "r5"]))
        .await
        .unwrap();

    assert_eq!(outcome.count, 5);
    assert_batch_errors(&outcome, &[("x1", "NotFound"), ("x2", "NotFound")]);
    assert!(m.list(NodeKind::Role).await.unwrap().is_empty());
}
backend_test!(bulk_delete_across_chunks, bulk_delete_across_chunks, config: small_chunks());

async fn bulk_rejects_oversized_batches<S: TreeStore + ?Sized>(m: HierarchyManager<S>) {
    let many: Vec<NodeId> = (0..11).map(|i| NodeId::new(format!("r{}", i))).collect();
    assert_error!(m.bulk_delete(NodeKind::Role, &many).await, "Validation");
    assert_error!(
        m.bulk_change_parent(NodeKind::Role, &many, None).await,
        "Validation"
    );

    let empty = m.bulk_delete(NodeKind::Role, &[]).await.unwrap();
    assert_eq!(empty.count, 0);
    assert!(empty.is_complete());
}
backend_test!(bulk_rejects_oversized_batches, bulk_rejects_oversized_batches, config: small_chunks());

// ============================================================================
// Bulk update
// ============================================================================

async fn bulk_update_attributes<S: TreeStore + ?Sized>(m: HierarchyManager<S>) {
    role_with(&m, "a", json!({"team": "red", "keep": true})).await;
    role_with(&m, "b", json!({"team": "blue"})).await;
    role_with(&m, "c", json!({})).await;

    let outcome = m
        .bulk_update_attributes(
            NodeKind::Role,
            &ids(&["a", "ghost", "b", "c"]),
            NodePatch::attributes(json!({"team": "green"})),
        )
        .await
        .unwrap();

    assert_eq!(outcome.count, 3);
    assert_batch_errors(&outcome, &[("ghost", "NotFound")]);

    let a = m.get(NodeKind::Role, &NodeId::new("a")).await.unwrap();
    assert_eq!(a.attributes, json!({"team": "green", "keep": true}));
    assert_eq!(a.version, 2);
    for id in ["b", "c"] {
        let node = m.get(NodeKind::Role, &NodeId::new(id)).await.unwrap();
        assert_eq!(node.attributes["team"], "green");
    }
}
backend_test!(bulk_update_attributes, bulk_update_attributes, config: small_chunks());

async fn bulk_update_validates_patch<S: TreeStore + ?Sized>(m: HierarchyManager<S>) {
    role(&m, None, "a", None).await;
    assert_error!(
        m.bulk_update_attributes(NodeKind::Role, &ids(&["a"]), NodePatch::attributes(json!("x")))
            .await,
        "Validation"
    );
    assert_error!(
        m.bulk_update_attributes(NodeKind::Role, &ids(&["a"]), NodePatch::default())
            .await,
        "Validation"
    );
    assert_eq!(m.get(NodeKind::Role, &NodeId::new("a")).await.unwrap().version, 1);
}
backend_test!(bulk_update_validates_patch, bulk_update_validates_patch);

// ============================================================================
// Bulk change parent
// ============================================================================

async fn bulk_change_parent_mixed<S: TreeStore + ?Sized>(m: HierarchyManager<S>) {
    // a -> b -> target, plus free-standing x and y
    role_chain(&m, &["a", "b", "target"]).await;
    role(&m, None, "x", None).await;
    role(&m, None, "y", None).await;

    let outcome = m
        .bulk_change_parent(
            NodeKind::Role,
            &ids(&["x", "a", "target", "ghost", "y", "b"]),
            Some(NodeId::new("target")),
        )
        .await
        .unwrap();

    // "target" lies below both "a" and "b".
    assert_eq!(outcome.count, 2);
    assert_batch_errors(
        &outcome,
        &[
            ("a", "CircularReference"),
            ("target", "SelfParent"),
            ("ghost", "NotFound"),
            ("b", "CircularReference"),
        ],
    );

    let children = m
        .children(NodeKind::Role, &NodeId::new("target"))
        .await
        .unwrap();
    let mut child_ids = id_strings(&children);
    child_ids.sort();
    assert_eq!(child_ids, vec!["x", "y"]);
    assert_acyclic(&m, NodeKind::Role).await;
}
backend_test!(bulk_change_parent_mixed, bulk_change_parent_mixed, config: small_chunks());

async fn bulk_change_parent_missing_parent<S: TreeStore + ?Sized>(m: HierarchyManager<S>) {
    role(&m, None, "a", None).await;
    role(&m, None, "b", None).await;

    let outcome = m
        .bulk_change_parent(NodeKind::Role, &ids(&["a", "b"]), Some(NodeId::new("nowhere")))
        .await
        .unwrap();

    assert_eq!(outcome.count, 0);
    assert_batch_errors(&outcome, &[("a", "ParentNotFound"), ("b", "ParentNotFound")]);
}
backend_test!(bulk_change_parent_missing_parent, bulk_change_parent_missing_parent);

async fn bulk_change_parent_to_root<S: TreeStore + ?Sized>(m: HierarchyManager<S>) {
    role(&m, None, "p", None).await;
    role(&m, None, "a", Some("p")).await;
    role(&m, None, "b", Some("p")).await;
    role(&m, None, "free", None).await;

    let outcome = m
        .bulk_change_parent(NodeKind::Role, &ids(&["a", "b", "free"]), None)
        .await
        .unwrap();

    // Nodes already at the root count as updated.
    assert_eq!(outcome.count, 3);
    assert!(outcome.is_complete());
    assert!(m
        .children(NodeKind::Role, &NodeId::new("p"))
        .await
        .unwrap()
        .is_empty());
}
backend_test!(bulk_change_parent_to_root, bulk_change_parent_to_root);

async fn bulk_change_parent_keeps_successes<S: TreeStore + ?Sized>(m: HierarchyManager<S>) {
    for id in ["p", "a", "b", "c"] {
        role(&m, None, id, None).await;
    }
    let outcome = m
        .bulk_change_parent(NodeKind::Role, &ids(&["a", "p", "b", "c"]), Some(NodeId::new("p")))
        .await
        .unwrap();

    assert_eq!(outcome.count, 3);
    assert_batch_errors(&outcome, &[("p", "SelfParent")]);

    let moved = m.descendants(NodeKind::Role, &NodeId::new("p")).await.unwrap();
    assert_eq!(id_strings(&moved), vec!["a", "b", "c"]);
}
backend_test!(bulk_change_parent_keeps_successes, bulk_change_parent_keeps_successes, config: small_chunks());
