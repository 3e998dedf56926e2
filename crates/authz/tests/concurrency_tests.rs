//! Concurrent writers must never produce a cycle or a lost update.

#[macro_use]
mod common;

use std::sync::Arc;

use common::*;
use helios_authz::types::NewNode;
use helios_authz::{HierarchyManager, NodeId, NodeKind, NodePatch, TreeStore};
use serde_json::{Map, Value, json};

async fn opposing_reparents<S: TreeStore + ?Sized + 'static>(m: Arc<HierarchyManager<S>>) {
    for round in 0..20 {
        let x = format!("x{}", round);
        let y = format!("y{}", round);
        role(&m, None, &x, None).await;
        role(&m, None, &y, None).await;

        let (m1, m2) = (Arc::clone(&m), Arc::clone(&m));
        let (x1, y1) = (NodeId::new(x.as_str()), NodeId::new(y.as_str()));
        let (x2, y2) = (x1.clone(), y1.clone());

        let first = tokio::spawn(async move { m1.reparent(NodeKind::Role, &x1, Some(y1)).await });
        let second = tokio::spawn(async move { m2.reparent(NodeKind::Role, &y2, Some(x2)).await });

        let results = [first.await.unwrap(), second.await.unwrap()];
        let succeeded = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(succeeded, 1, "Exactly one move must win in round {}", round);
        for result in &results {
            if let Err(e) = result {
                assert_eq!(e.code(), "CircularReference");
            }
        }
    }
    assert_acyclic(&m, NodeKind::Role).await;
}
backend_test!(opposing_reparents, opposing_reparents, multi_thread);

async fn concurrent_ring_moves<S: TreeStore + ?Sized + 'static>(m: Arc<HierarchyManager<S>>) {
    let names: Vec<String> = (0..8).map(|i| format!("ring{}", i)).collect();
    for name in &names {
        role(&m, None, name, None).await;
    }

    // Every node tries to move under its successor; at least one move must fail.
    let mut handles = Vec::new();
    for i in 0..names.len() {
        let m = Arc::clone(&m);
        let node = NodeId::new(names[i].as_str());
        let parent = NodeId::new(names[(i + 1) % names.len()].as_str());
        handles.push(tokio::spawn(async move {
            m.reparent(NodeKind::Role, &node, Some(parent)).await
        }));
    }

    let mut failures = 0;
    for handle in handles {
        if let Err(e) = handle.await.unwrap() {
            assert_eq!(e.code(), "CircularReference");
            failures += 1;
        }
    }
    assert_eq!(failures, 1);
    assert_acyclic(&m, NodeKind::Role).await;
}
backend_test!(concurrent_ring_moves, concurrent_ring_moves, multi_thread);

async fn concurrent_creates_under_one_parent<S: TreeStore + ?Sized + 'static>(
    m: Arc<HierarchyManager<S>>,
) {
    org(&m, "hq", None).await;

    let mut handles = Vec::new();
    for i in 0..40 {
        let m = Arc::clone(&m);
        handles.push(tokio::spawn(async move {
            m.create(
                NewNode::organization()
                    .with_id(format!("branch-{}", i))
                    .with_parent("hq"),
            )
            .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let children = m
        .children(NodeKind::Organization, &NodeId::new("hq"))
        .await
        .unwrap();
    assert_eq!(children.len(), 40);
}
backend_test!(concurrent_creates_under_one_parent, concurrent_creates_under_one_parent, multi_thread);

async fn concurrent_updates_are_not_lost<S: TreeStore + ?Sized + 'static>(
    m: Arc<HierarchyManager<S>>,
) {
    role(&m, None, "counter", None).await;

    let mut handles = Vec::new();
    for i in 0..25 {
        let m = Arc::clone(&m);
        let mut attributes = Map::new();
        attributes.insert(format!("k{}", i), json!(i));
        handles.push(tokio::spawn(async move {
            m.update(
                NodeKind::Role,
                &NodeId::new("counter"),
                NodePatch::attributes(Value::Object(attributes)),
            )
            .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let node = m.get(NodeKind::Role, &NodeId::new("counter")).await.unwrap();
    assert_eq!(node.version, 26);
    assert_eq!(node.attributes.as_object().unwrap().len(), 25);
}
backend_test!(concurrent_updates_are_not_lost, concurrent_updates_are_not_lost, multi_thread);

async fn tenant_delete_races_role_create<S: TreeStore + ?Sized + 'static>(
    m: Arc<HierarchyManager<S>>,
) {
    for round in 0..10 {
        let tenant = format!("tenant{}", round);
        org(&m, &tenant, None).await;

        let (m1, m2) = (Arc::clone(&m), Arc::clone(&m));
        let (t1, t2) = (NodeId::new(tenant.as_str()), NodeId::new(tenant.as_str()));
        let create = tokio::spawn(async move {
            m1.create(NewNode::role(Some(t1)).with_id(format!("role-{}", round)))
                .await
        });
        let delete = tokio::spawn(async move { m2.delete(NodeKind::Organization, &t2).await });

        let created = create.await.unwrap();
        let deleted = delete.await.unwrap();
        match (&created, &deleted) {
            // Role first: the organization is still in use.
            (Ok(_), Err(e)) => assert_eq!(e.code(), "TenantInUse"),
            // Organization first: the role has no tenant to live in.
            (Err(e), Ok(())) => assert_eq!(e.code(), "TenantNotFound"),
            other => panic!("Unexpected outcome in round {}: {:?}", round, other),
        }
    }
}
backend_test!(tenant_delete_races_role_create, tenant_delete_races_role_create, multi_thread);

async fn reads_during_reparents<S: TreeStore + ?Sized + 'static>(m: Arc<HierarchyManager<S>>) {
    assert_reads_follow_one_parent(m, 100).await;
}
backend_test!(reads_during_reparents, reads_during_reparents, multi_thread);
