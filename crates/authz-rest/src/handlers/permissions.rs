//! Permission handlers.
//!
//! The catalogue lives at `/permissions`. Grants hang off roles:
//! `/roles/{id}/permissions` for direct grants and
//! `/roles/{id}/effective-permissions` for the inherited view.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use helios_authz::error::ValidationError;
use helios_authz::{AuthzError, NodeId, NodeKind, TreeStore};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::tree_kind;
use crate::error::RestResult;
use crate::extractors::JsonBody;
use crate::state::AppState;

/// Body of `POST /permissions`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefinePermissionRequest {
    /// The protected resource.
    #[serde(default)]
    pub resource_id: String,
    /// The allowed action.
    #[serde(default)]
    pub action: String,
}

/// Body of `POST /roles/{id}/permissions`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantPermissionRequest {
    /// The permission to attach.
    pub permission_id: String,
}

// Grants only exist on the role tree.
fn require_roles(collection: &str, operation: &str) -> RestResult<()> {
    let kind = tree_kind(collection)?;
    if kind != NodeKind::Role {
        return Err(AuthzError::from(ValidationError::UnsupportedKind {
            kind,
            operation: operation.to_string(),
        })
        .into());
    }
    Ok(())
}

/// Handler for defining a permission.
///
/// Defining an existing `(resourceId, action)` pair returns the existing
/// record.
///
/// `POST [base]/permissions`
pub async fn define_permission_handler<S>(
    State(state): State<AppState<S>>,
    JsonBody(request): JsonBody<DefinePermissionRequest>,
) -> RestResult<Response>
where
    S: TreeStore + ?Sized + 'static,
{
    let permission = state
        .manager()
        .define_permission(&request.resource_id, &request.action)
        .await?;
    Ok((StatusCode::CREATED, Json(permission)).into_response())
}

/// `GET [base]/permissions`
pub async fn list_permissions_handler<S>(State(state): State<AppState<S>>) -> RestResult<Response>
where
    S: TreeStore + ?Sized + 'static,
{
    let permissions = state.manager().list_permissions().await?;
    Ok(Json(permissions).into_response())
}

/// `GET [base]/permissions/{permission_id}`
pub async fn read_permission_handler<S>(
    State(state): State<AppState<S>>,
    Path(permission_id): Path<String>,
) -> RestResult<Response>
where
    S: TreeStore + ?Sized + 'static,
{
    let permission = state.manager().get_permission(&permission_id).await?;
    Ok(Json(permission).into_response())
}

/// Handler for the permissions attached directly to a role.
///
/// `GET [base]/roles/{id}/permissions`
pub async fn role_permissions_handler<S>(
    State(state): State<AppState<S>>,
    Path((collection, id)): Path<(String, String)>,
) -> RestResult<Response>
where
    S: TreeStore + ?Sized + 'static,
{
    require_roles(&collection, "listing permissions")?;
    let permissions = state
        .manager()
        .direct_permissions(&NodeId::new(id))
        .await?;
    Ok(Json(permissions).into_response())
}

/// Handler for attaching a permission to a role.
///
/// `POST [base]/roles/{id}/permissions`
///
/// # Response
///
/// - `200 OK` - `{"roleId", "permissionId", "granted"}`; `granted` is
///   `false` when the grant already existed
/// - `404 Not Found` - Role or permission missing
pub async fn grant_permission_handler<S>(
    State(state): State<AppState<S>>,
    Path((collection, id)): Path<(String, String)>,
    JsonBody(request): JsonBody<GrantPermissionRequest>,
) -> RestResult<Response>
where
    S: TreeStore + ?Sized + 'static,
{
    require_roles(&collection, "granting permissions")?;
    let role_id = NodeId::new(id);
    let granted = state
        .manager()
        .grant_permission(&role_id, &request.permission_id)
        .await?;
    Ok(Json(json!({
        "roleId": role_id,
        "permissionId": request.permission_id,
        "granted": granted,
    }))
    .into_response())
}

/// Handler for detaching a permission from a role.
///
/// `DELETE [base]/roles/{id}/permissions/{permission_id}`
pub async fn revoke_permission_handler<S>(
    State(state): State<AppState<S>>,
    Path((collection, id, permission_id)): Path<(String, String, String)>,
) -> RestResult<Response>
where
    S: TreeStore + ?Sized + 'static,
{
    require_roles(&collection, "revoking permissions")?;
    let role_id = NodeId::new(id);
    let revoked = state
        .manager()
        .revoke_permission(&role_id, &permission_id)
        .await?;
    Ok(Json(json!({
        "roleId": role_id,
        "permissionId": permission_id,
        "revoked": revoked,
    }))
    .into_response())
}

/// Handler for a role's effective permissions.
///
/// Returns the union of the role's own permissions and those of every
/// ancestor, de-duplicated by `(resourceId, action)`.
///
/// `GET [base]/roles/{id}/effective-permissions`
pub async fn effective_permissions_handler<S>(
    State(state): State<AppState<S>>,
    Path((collection, id)): Path<(String, String)>,
) -> RestResult<Response>
where
    S: TreeStore + ?Sized + 'static,
{
    require_roles(&collection, "effective permissions")?;
    let role_id = NodeId::new(id);
    let effective = state.manager().effective_permissions(&role_id).await?;
    debug!(role_id = %role_id, count = effective.len(), "Resolved effective permissions");
    Ok(Json(effective.into_vec()).into_response())
}
