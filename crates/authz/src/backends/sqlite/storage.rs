//! TreeStore implementation for SQLite.
//!
//! Closures are computed with recursive CTEs bounded by the node count of
//! the tree, so a corrupted parent pointer loop cannot make a query run
//! forever. Multi-row writes run in `IMMEDIATE` transactions; snapshot reads
//! run their queries on one connection inside a `DEFERRED` transaction.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, TransactionBehavior, params};
use uuid::Uuid;

use crate::core::{RoleGrants, TreeStore, grant_owners};
use crate::error::{AuthzError, AuthzResult, BackendError, HierarchyError};
use crate::types::{Node, NodeId, NodeKind, NodePatch, Permission};

use super::SqliteStore;

fn table(kind: NodeKind) -> &'static str {
    match kind {
        NodeKind::Organization => "organizations",
        NodeKind::Role => "roles",
    }
}

fn columns(kind: NodeKind) -> &'static str {
    match kind {
        NodeKind::Organization => {
            "id, parent_id, NULL AS tenant_id, attributes, version, created_at, updated_at"
        }
        NodeKind::Role => "id, parent_id, tenant_id, attributes, version, created_at, updated_at",
    }
}

/// Timestamps are stored with fixed nanosecond precision so that text
/// ordering matches chronological ordering.
fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_timestamp(value: &str) -> AuthzResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            AuthzError::Backend(BackendError::SerializationError {
                message: format!("invalid timestamp '{}': {}", value, e),
            })
        })
}

/// Encodes ids as one JSON array parameter, expanded in SQL with
/// `json_each`, so lists of any length bind a single variable.
fn id_list(ids: &[NodeId]) -> AuthzResult<String> {
    let ids: Vec<&str> = ids.iter().map(NodeId::as_str).collect();
    Ok(serde_json::to_string(&ids)?)
}

/// Raw column values of a node row.
struct NodeRow {
    id: String,
    parent_id: Option<String>,
    tenant_id: Option<String>,
    attributes: String,
    version: i64,
    created_at: String,
    updated_at: String,
}

impl NodeRow {
    fn read(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            parent_id: row.get(1)?,
            tenant_id: row.get(2)?,
            attributes: row.get(3)?,
            version: row.get(4)?,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
        })
    }

    fn into_node(self, kind: NodeKind) -> AuthzResult<Node> {
        Ok(Node {
            kind,
            id: NodeId::new(self.id),
            parent_id: self.parent_id.map(NodeId::new),
            tenant_id: self.tenant_id.map(NodeId::new),
            attributes: serde_json::from_str(&self.attributes)?,
            version: self.version as u64,
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
        })
    }
}

fn query_nodes<P: rusqlite::Params>(
    conn: &Connection,
    kind: NodeKind,
    sql: &str,
    params: P,
) -> AuthzResult<Vec<Node>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, NodeRow::read)?
        .collect::<Result<Vec<_>, _>>()?;
    rows.into_iter().map(|row| row.into_node(kind)).collect()
}

fn read_node(conn: &Connection, kind: NodeKind, id: &NodeId) -> AuthzResult<Option<Node>> {
    let sql = format!("SELECT {} FROM {} WHERE id = ?1", columns(kind), table(kind));
    let row = conn
        .query_row(&sql, params![id.as_str()], NodeRow::read)
        .optional()?;
    row.map(|r| r.into_node(kind)).transpose()
}

fn count_rows(conn: &Connection, kind: NodeKind) -> AuthzResult<u64> {
    let sql = format!("SELECT COUNT(*) FROM {}", table(kind));
    let count: i64 = conn.query_row(&sql, [], |row| row.get(0))?;
    Ok(count as u64)
}

fn query_descendants(conn: &Connection, kind: NodeKind, id: &NodeId) -> AuthzResult<Vec<Node>> {
    let bound = count_rows(conn, kind)? as i64;
    let sql = format!(
        "WITH RECURSIVE closure(id, depth) AS (
             SELECT id, 1 FROM {table} WHERE parent_id = ?1
             UNION
             SELECT n.id, c.depth + 1 FROM {table} n
             JOIN closure c ON n.parent_id = c.id
             WHERE c.depth < ?2
         )
         SELECT {columns} FROM {table}
         WHERE id IN (SELECT id FROM closure)
         ORDER BY created_at, rowid",
        table = table(kind),
        columns = columns(kind)
    );
    query_nodes(conn, kind, &sql, params![id.as_str(), bound])
}

fn query_ancestors(conn: &Connection, kind: NodeKind, id: &NodeId) -> AuthzResult<Vec<Node>> {
    let bound = count_rows(conn, kind)? as i64;
    let sql = format!(
        "WITH RECURSIVE chain(id, parent_id, depth) AS (
             SELECT id, parent_id, 0 FROM {table} WHERE id = ?1
             UNION
             SELECT n.id, n.parent_id, c.depth + 1 FROM {table} n
             JOIN chain c ON n.id = c.parent_id
             WHERE c.depth < ?2
         )
         SELECT {columns} FROM {table}
         WHERE id IN (SELECT id FROM chain WHERE depth > 0)",
        table = table(kind),
        columns = columns(kind)
    );
    query_nodes(conn, kind, &sql, params![id.as_str(), bound])
}

fn query_grants(
    conn: &Connection,
    role_ids: &[NodeId],
) -> AuthzResult<Vec<(NodeId, Permission)>> {
    if role_ids.is_empty() {
        return Ok(Vec::new());
    }
    let mut stmt = conn.prepare(
        "SELECT rp.role_id, p.id, p.resource_id, p.action
         FROM role_permissions rp
         JOIN permissions p ON p.id = rp.permission_id
         WHERE rp.role_id IN (SELECT value FROM json_each(?1))
         ORDER BY p.resource_id, p.action",
    )?;
    let rows = stmt
        .query_map(params![id_list(role_ids)?], |row| {
            Ok((
                NodeId::new(row.get::<_, String>(0)?),
                Permission::new(
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ),
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn read_permission(row: &rusqlite::Row<'_>) -> rusqlite::Result<Permission> {
    Ok(Permission::new(
        row.get::<_, String>(0)?,
        row.get::<_, String>(1)?,
        row.get::<_, String>(2)?,
    ))
}

#[async_trait]
impl TreeStore for SqliteStore {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    async fn health_check(&self) -> AuthzResult<()> {
        let conn = self.get_connection().map_err(|_| {
            AuthzError::Backend(BackendError::Unavailable {
                backend_name: "sqlite".to_string(),
                message: "Failed to get connection".to_string(),
            })
        })?;
        conn.query_row("SELECT 1", [], |_| Ok(()))?;
        Ok(())
    }

    async fn insert_node(&self, node: &Node) -> AuthzResult<()> {
        let mut conn = self.get_connection()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        if read_node(&tx, node.kind, &node.id)?.is_some() {
            return Err(HierarchyError::AlreadyExists {
                kind: node.kind,
                id: node.id.clone(),
            }
            .into());
        }

        let attributes = serde_json::to_string(&node.attributes)?;
        let created_at = format_timestamp(&node.created_at);
        let updated_at = format_timestamp(&node.updated_at);
        let parent_id = node.parent_id.as_ref().map(NodeId::as_str);

        match node.kind {
            NodeKind::Organization => {
                tx.execute(
                    "INSERT INTO organizations (id, parent_id, attributes, version, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![
                        node.id.as_str(),
                        parent_id,
                        attributes,
                        node.version as i64,
                        created_at,
                        updated_at
                    ],
                )?;
            }
            NodeKind::Role => {
                tx.execute(
                    "INSERT INTO roles (id, parent_id, tenant_id, attributes, version, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    params![
                        node.id.as_str(),
                        parent_id,
                        node.tenant_id.as_ref().map(NodeId::as_str),
                        attributes,
                        node.version as i64,
                        created_at,
                        updated_at
                    ],
                )?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    async fn get_node(&self, kind: NodeKind, id: &NodeId) -> AuthzResult<Option<Node>> {
        let conn = self.get_connection()?;
        read_node(&conn, kind, id)
    }

    async fn get_nodes(&self, kind: NodeKind, ids: &[NodeId]) -> AuthzResult<Vec<Node>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.get_connection()?;
        let sql = format!(
            "SELECT {} FROM {} WHERE id IN (SELECT value FROM json_each(?1))",
            columns(kind),
            table(kind)
        );
        let mut nodes = query_nodes(&conn, kind, &sql, params![id_list(ids)?])?;

        // Keep the caller's order; the first occurrence of a repeated id wins.
        let positions: HashMap<&NodeId, usize> =
            ids.iter().enumerate().rev().map(|(i, id)| (id, i)).collect();
        nodes.sort_by_key(|n| positions.get(&n.id).copied());
        Ok(nodes)
    }

    async fn list_nodes(&self, kind: NodeKind) -> AuthzResult<Vec<Node>> {
        let conn = self.get_connection()?;
        let sql = format!(
            "SELECT {} FROM {} ORDER BY created_at, rowid",
            columns(kind),
            table(kind)
        );
        query_nodes(&conn, kind, &sql, [])
    }

    async fn list_children(&self, kind: NodeKind, id: &NodeId) -> AuthzResult<Vec<Node>> {
        let conn = self.get_connection()?;
        let sql = format!(
            "SELECT {} FROM {} WHERE parent_id = ?1 ORDER BY created_at, rowid",
            columns(kind),
            table(kind)
        );
        query_nodes(&conn, kind, &sql, params![id.as_str()])
    }

    async fn descendant_rows(&self, kind: NodeKind, id: &NodeId) -> AuthzResult<Vec<Node>> {
        let conn = self.get_connection()?;
        query_descendants(&conn, kind, id)
    }

    async fn ancestor_rows(&self, kind: NodeKind, id: &NodeId) -> AuthzResult<Vec<Node>> {
        let conn = self.get_connection()?;
        query_ancestors(&conn, kind, id)
    }

    async fn subtree_snapshot(
        &self,
        kind: NodeKind,
        id: &NodeId,
    ) -> AuthzResult<Option<(Node, Vec<Node>)>> {
        let mut conn = self.get_connection()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Deferred)?;
        let Some(node) = read_node(&tx, kind, id)? else {
            return Ok(None);
        };
        let rows = query_descendants(&tx, kind, id)?;
        tx.commit()?;
        Ok(Some((node, rows)))
    }

    async fn lineage_snapshot(
        &self,
        kind: NodeKind,
        id: &NodeId,
    ) -> AuthzResult<Option<(Node, Vec<Node>)>> {
        let mut conn = self.get_connection()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Deferred)?;
        let Some(node) = read_node(&tx, kind, id)? else {
            return Ok(None);
        };
        let rows = query_ancestors(&tx, kind, id)?;
        tx.commit()?;
        Ok(Some((node, rows)))
    }

    async fn role_grants_snapshot(&self, role_id: &NodeId) -> AuthzResult<Option<RoleGrants>> {
        let mut conn = self.get_connection()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Deferred)?;
        let Some(role) = read_node(&tx, NodeKind::Role, role_id)? else {
            return Ok(None);
        };
        let ancestor_rows = query_ancestors(&tx, NodeKind::Role, role_id)?;
        let grants = query_grants(&tx, &grant_owners(&role, &ancestor_rows))?;
        tx.commit()?;
        Ok(Some(RoleGrants {
            role,
            ancestor_rows,
            grants,
        }))
    }

    async fn patch_nodes(
        &self,
        kind: NodeKind,
        ids: &[NodeId],
        patch: &NodePatch,
    ) -> AuthzResult<Vec<Node>> {
        let mut conn = self.get_connection()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let sql = format!(
            "UPDATE {} SET parent_id = ?1, attributes = ?2, version = ?3, updated_at = ?4 WHERE id = ?5",
            table(kind)
        );

        let mut updated = Vec::with_capacity(ids.len());
        for id in ids {
            let mut node = read_node(&tx, kind, id)?.ok_or_else(|| HierarchyError::NotFound {
                kind,
                id: id.clone(),
            })?;

            if let Some(attributes) = &patch.attributes {
                json_patch::merge(&mut node.attributes, attributes);
            }
            if let Some(parent_id) = &patch.parent_id {
                node.parent_id = parent_id.clone();
            }
            node.touch();

            tx.execute(
                &sql,
                params![
                    node.parent_id.as_ref().map(NodeId::as_str),
                    serde_json::to_string(&node.attributes)?,
                    node.version as i64,
                    format_timestamp(&node.updated_at),
                    node.id.as_str()
                ],
            )?;
            updated.push(node);
        }

        tx.commit()?;
        Ok(updated)
    }

    async fn remove_node(&self, kind: NodeKind, id: &NodeId) -> AuthzResult<Vec<NodeId>> {
        let mut conn = self.get_connection()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let node = read_node(&tx, kind, id)?.ok_or_else(|| HierarchyError::NotFound {
            kind,
            id: id.clone(),
        })?;

        let children: Vec<NodeId> = {
            let sql = format!(
                "SELECT id FROM {} WHERE parent_id = ?1 ORDER BY created_at, rowid",
                table(kind)
            );
            let mut stmt = tx.prepare(&sql)?;
            stmt.query_map(params![id.as_str()], |row| row.get::<_, String>(0))?
                .map(|r| r.map(NodeId::new))
                .collect::<Result<Vec<_>, _>>()?
        };

        tx.execute(
            &format!(
                "UPDATE {} SET parent_id = ?1, version = version + 1, updated_at = ?2 WHERE parent_id = ?3",
                table(kind)
            ),
            params![
                node.parent_id.as_ref().map(NodeId::as_str),
                format_timestamp(&Utc::now()),
                id.as_str()
            ],
        )?;

        if kind == NodeKind::Role {
            tx.execute(
                "DELETE FROM role_permissions WHERE role_id = ?1",
                params![id.as_str()],
            )?;
            tx.execute(
                "DELETE FROM role_assignments WHERE role_id = ?1",
                params![id.as_str()],
            )?;
        }

        tx.execute(
            &format!("DELETE FROM {} WHERE id = ?1", table(kind)),
            params![id.as_str()],
        )?;

        tx.commit()?;
        Ok(children)
    }

    async fn count_nodes(&self, kind: NodeKind) -> AuthzResult<u64> {
        let conn = self.get_connection()?;
        count_rows(&conn, kind)
    }

    async fn count_tenant_roles(&self, tenant_id: &NodeId) -> AuthzResult<u64> {
        let conn = self.get_connection()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM roles WHERE tenant_id = ?1",
            params![tenant_id.as_str()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    async fn upsert_permission(&self, resource_id: &str, action: &str) -> AuthzResult<Permission> {
        let mut conn = self.get_connection()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        tx.execute(
            "INSERT OR IGNORE INTO permissions (id, resource_id, action) VALUES (?1, ?2, ?3)",
            params![Uuid::new_v4().to_string(), resource_id, action],
        )?;
        let permission = tx.query_row(
            "SELECT id, resource_id, action FROM permissions WHERE resource_id = ?1 AND action = ?2",
            params![resource_id, action],
            read_permission,
        )?;
        tx.commit()?;
        Ok(permission)
    }

    async fn get_permission(&self, permission_id: &str) -> AuthzResult<Option<Permission>> {
        let conn = self.get_connection()?;
        let permission = conn
            .query_row(
                "SELECT id, resource_id, action FROM permissions WHERE id = ?1",
                params![permission_id],
                read_permission,
            )
            .optional()?;
        Ok(permission)
    }

    async fn list_permissions(&self) -> AuthzResult<Vec<Permission>> {
        let conn = self.get_connection()?;
        let mut stmt = conn
            .prepare("SELECT id, resource_id, action FROM permissions ORDER BY resource_id, action")?;
        let permissions = stmt
            .query_map([], read_permission)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(permissions)
    }

    async fn grant_permission(&self, role_id: &NodeId, permission_id: &str) -> AuthzResult<bool> {
        let conn = self.get_connection()?;
        let changed = conn.execute(
            "INSERT OR IGNORE INTO role_permissions (role_id, permission_id) VALUES (?1, ?2)",
            params![role_id.as_str(), permission_id],
        )?;
        Ok(changed == 1)
    }

    async fn revoke_permission(
        &self,
        role_id: &NodeId,
        permission_id: &str,
    ) -> AuthzResult<bool> {
        let conn = self.get_connection()?;
        let changed = conn.execute(
            "DELETE FROM role_permissions WHERE role_id = ?1 AND permission_id = ?2",
            params![role_id.as_str(), permission_id],
        )?;
        Ok(changed == 1)
    }

    async fn direct_permissions(
        &self,
        role_ids: &[NodeId],
    ) -> AuthzResult<Vec<(NodeId, Permission)>> {
        if role_ids.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.get_connection()?;
        query_grants(&conn, role_ids)
    }

    async fn assign_role(&self, subject_id: &str, role_id: &NodeId) -> AuthzResult<bool> {
        let conn = self.get_connection()?;
        let changed = conn.execute(
            "INSERT OR IGNORE INTO role_assignments (subject_id, role_id, assigned_at) VALUES (?1, ?2, ?3)",
            params![subject_id, role_id.as_str(), format_timestamp(&Utc::now())],
        )?;
        Ok(changed == 1)
    }

    async fn unassign_role(&self, subject_id: &str, role_id: &NodeId) -> AuthzResult<bool> {
        let conn = self.get_connection()?;
        let changed = conn.execute(
            "DELETE FROM role_assignments WHERE subject_id = ?1 AND role_id = ?2",
            params![subject_id, role_id.as_str()],
        )?;
        Ok(changed == 1)
    }

    async fn subject_roles(&self, subject_id: &str) -> AuthzResult<Vec<NodeId>> {
        let conn = self.get_connection()?;
        let mut stmt = conn.prepare(
            "SELECT role_id FROM role_assignments WHERE subject_id = ?1 ORDER BY assigned_at, rowid",
        )?;
        let roles = stmt
            .query_map(params![subject_id], |row| row.get::<_, String>(0))?
            .map(|r| r.map(NodeId::new))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(roles)
    }
}
