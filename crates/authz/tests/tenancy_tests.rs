//! Tenant isolation tests for role trees.

#[macro_use]
mod common;

use common::*;
use helios_authz::types::{NewNode, TenantScope};
use helios_authz::{HierarchyManager, NodeId, NodeKind, TreeStore};

async fn seed_tenants<S: TreeStore + ?Sized>(m: &HierarchyManager<S>) {
    org(m, "acme", None).await;
    org(m, "globex", None).await;
    role(m, Some("acme"), "acme-admin", None).await;
    role(m, Some("acme"), "acme-user", Some("acme-admin")).await;
    role(m, Some("globex"), "globex-admin", None).await;
    role(m, None, "global-admin", None).await;
}

async fn tenant_roles_carry_scope<S: TreeStore + ?Sized>(m: HierarchyManager<S>) {
    seed_tenants(&m).await;
    let user = m.get(NodeKind::Role, &NodeId::new("acme-user")).await.unwrap();
    assert_eq!(user.tenant_id, Some(NodeId::new("acme")));
    assert_eq!(user.scope(), TenantScope::Tenant(NodeId::new("acme")));

    let global = m
        .get(NodeKind::Role, &NodeId::new("global-admin"))
        .await
        .unwrap();
    assert_eq!(global.scope(), TenantScope::Global);
}
backend_test!(tenant_roles_carry_scope, tenant_roles_carry_scope);

async fn create_across_tenants_rejected<S: TreeStore + ?Sized>(m: HierarchyManager<S>) {
    seed_tenants(&m).await;

    let cases = [
        (Some("globex"), "acme-admin"),
        (Some("acme"), "global-admin"),
        (None, "acme-admin"),
    ];
    for (tenant, parent) in cases {
        let new = NewNode::role(tenant.map(NodeId::new))
            .with_id("intruder")
            .with_parent(parent);
        assert_error!(m.create(new).await, "TenantMismatch");
    }
    assert_error!(m.get(NodeKind::Role, &NodeId::new("intruder")).await, "NotFound");
}
backend_test!(create_across_tenants_rejected, create_across_tenants_rejected);

async fn reparent_across_tenants_rejected<S: TreeStore + ?Sized>(m: HierarchyManager<S>) {
    seed_tenants(&m).await;

    assert_error!(
        m.reparent(
            NodeKind::Role,
            &NodeId::new("acme-user"),
            Some(NodeId::new("globex-admin"))
        )
        .await,
        "TenantMismatch"
    );
    assert_error!(
        m.reparent(
            NodeKind::Role,
            &NodeId::new("globex-admin"),
            Some(NodeId::new("acme-admin"))
        )
        .await,
        "TenantMismatch"
    );
    assert_error!(
        m.reparent(
            NodeKind::Role,
            &NodeId::new("global-admin"),
            Some(NodeId::new("acme-admin"))
        )
        .await,
        "TenantMismatch"
    );
    assert_error!(
        m.reparent(
            NodeKind::Role,
            &NodeId::new("acme-admin"),
            Some(NodeId::new("global-admin"))
        )
        .await,
        "TenantMismatch"
    );

    let outcome = m
        .bulk_change_parent(
            NodeKind::Role,
            &ids(&["acme-user", "globex-admin"]),
            Some(NodeId::new("globex-admin")),
        )
        .await
        .unwrap();
    assert_eq!(outcome.count, 0);
    assert_batch_errors(
        &outcome,
        &[("acme-user", "TenantMismatch"), ("globex-admin", "SelfParent")],
    );
}
backend_test!(reparent_across_tenants_rejected, reparent_across_tenants_rejected);

async fn permissions_do_not_cross_tenants<S: TreeStore + ?Sized>(m: HierarchyManager<S>) {
    seed_tenants(&m).await;
    grant(&m, "acme-admin", "acme-ledger", "read").await;
    grant(&m, "globex-admin", "globex-ledger", "read").await;

    let acme_user = NodeId::new("acme-user");
    assert!(m.is_authorized(&acme_user, "acme-ledger", "read").await.unwrap());
    assert!(!m.is_authorized(&acme_user, "globex-ledger", "read").await.unwrap());

    let globex = NodeId::new("globex-admin");
    assert!(!m.is_authorized(&globex, "acme-ledger", "read").await.unwrap());
}
backend_test!(permissions_do_not_cross_tenants, permissions_do_not_cross_tenants);

async fn missing_tenant_rejected<S: TreeStore + ?Sized>(m: HierarchyManager<S>) {
    assert_error!(
        m.create(NewNode::role(Some(NodeId::new("nobody"))).with_id("r"))
            .await,
        "TenantNotFound"
    );
}
backend_test!(missing_tenant_rejected, missing_tenant_rejected);

async fn organization_in_use_cannot_be_deleted<S: TreeStore + ?Sized>(m: HierarchyManager<S>) {
    seed_tenants(&m).await;
    let acme = NodeId::new("acme");

    assert_error!(m.delete(NodeKind::Organization, &acme).await, "TenantInUse");

    let outcome = m
        .bulk_delete(NodeKind::Organization, &ids(&["acme", "globex"]))
        .await
        .unwrap();
    assert_eq!(outcome.count, 0);
    assert_batch_errors(
        &outcome,
        &[("acme", "TenantInUse"), ("globex", "TenantInUse")],
    );

    m.bulk_delete(NodeKind::Role, &ids(&["acme-admin", "acme-user"]))
        .await
        .unwrap();
    m.delete(NodeKind::Organization, &acme).await.unwrap();
    assert_error!(m.get(NodeKind::Organization, &acme).await, "NotFound");
}
backend_test!(organization_in_use_cannot_be_deleted, organization_in_use_cannot_be_deleted);

async fn deleting_tenant_role_stays_in_tenant<S: TreeStore + ?Sized>(m: HierarchyManager<S>) {
    seed_tenants(&m).await;
    role(&m, Some("acme"), "acme-intern", Some("acme-user")).await;

    m.delete(NodeKind::Role, &NodeId::new("acme-user")).await.unwrap();

    let intern = m
        .get(NodeKind::Role, &NodeId::new("acme-intern"))
        .await
        .unwrap();
    assert_eq!(intern.parent_id, Some(NodeId::new("acme-admin")));
    assert_eq!(intern.tenant_id, Some(NodeId::new("acme")));
}
backend_test!(deleting_tenant_role_stays_in_tenant, deleting_tenant_role_stays_in_tenant);
