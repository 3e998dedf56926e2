//! Common test utilities for the authorization API.

#![allow(dead_code)]

use std::sync::Arc;

use axum_test::TestServer;
use helios_authz::backends::memory::InMemoryStore;
use helios_authz::{HierarchyConfig, HierarchyManager, TreeStore};
use helios_authz_rest::{ServerConfig, create_app_with_config};
use serde_json::{Value, json};

/// Creates a test server over an in-memory store.
pub fn create_test_server() -> TestServer {
    create_test_server_with(HierarchyConfig::default())
}

/// Creates a test server over an in-memory store with custom batch settings.
pub fn create_test_server_with(config: HierarchyConfig) -> TestServer {
    let store: Arc<dyn TreeStore> = Arc::new(InMemoryStore::new());
    server_for(store, config)
}

/// Creates a test server over a private in-memory SQLite database.
#[cfg(feature = "sqlite")]
pub fn create_sqlite_test_server() -> TestServer {
    use helios_authz::backends::sqlite::SqliteStore;

    let store: Arc<dyn TreeStore> =
        Arc::new(SqliteStore::in_memory().expect("Failed to create SQLite store"));
    server_for(store, HierarchyConfig::default())
}

fn server_for(store: Arc<dyn TreeStore>, config: HierarchyConfig) -> TestServer {
    let manager = Arc::new(HierarchyManager::with_config(store, config));
    let app = create_app_with_config(manager, ServerConfig::for_testing());
    TestServer::new(app).expect("Failed to create test server")
}

/// Creates a node through the API and returns its body.
pub async fn seed(server: &TestServer, collection: &str, body: Value) -> Value {
    let response = server.post(&format!("/{}", collection)).json(&body).await;
    response.assert_status(axum::http::StatusCode::CREATED);
    response.json::<Value>()
}

/// Seeds the Root(A) -> Manager(B) -> Agent(C) role chain with one
/// permission per level, returning the permission ids.
pub async fn seed_role_chain(server: &TestServer) -> [String; 3] {
    seed(server, "roles", json!({"id": "A", "attributes": {"name": "Root"}})).await;
    seed(
        server,
        "roles",
        json!({"id": "B", "parentId": "A", "attributes": {"name": "Manager"}}),
    )
    .await;
    seed(
        server,
        "roles",
        json!({"id": "C", "parentId": "B", "attributes": {"name": "Agent"}}),
    )
    .await;

    let mut ids = Vec::new();
    for (role, action) in [("A", "delete"), ("B", "write"), ("C", "read")] {
        let permission = server
            .post("/permissions")
            .json(&json!({"resourceId": "tickets", "action": action}))
            .await
            .json::<Value>();
        let permission_id = permission["id"].as_str().unwrap_or_default().to_string();
        server
            .post(&format!("/roles/{}/permissions", role))
            .json(&json!({"permissionId": permission_id}))
            .await
            .assert_status_ok();
        ids.push(permission_id);
    }
    [ids[0].clone(), ids[1].clone(), ids[2].clone()]
}

/// Returns the `(resourceId, action)` pairs of a permission array, sorted.
pub fn permission_pairs(body: &Value) -> Vec<(String, String)> {
    let mut pairs: Vec<_> = body
        .as_array()
        .map(|items| {
            items
                .iter()
                .map(|p| {
                    (
                        p["resourceId"].as_str().unwrap_or_default().to_string(),
                        p["action"].as_str().unwrap_or_default().to_string(),
                    )
                })
                .collect()
        })
        .unwrap_or_default();
    pairs.sort();
    pairs
}

/// Returns the `id` fields of a node array, in order.
pub fn node_ids(body: &Value) -> Vec<String> {
    body.as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|n| n["id"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}
