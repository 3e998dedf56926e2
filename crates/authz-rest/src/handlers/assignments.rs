//! Subject assignment and authorization handlers.

use axum::{
    Json,
    extract::{Path, Query, State, rejection::QueryRejection},
    response::{IntoResponse, Response},
};
use helios_authz::error::ValidationError;
use helios_authz::{AuthzError, NodeId, TreeStore};
use serde::Deserialize;
use serde_json::json;

use crate::error::{RestError, RestResult};
use crate::state::AppState;

/// Query of `GET /authorize`.
///
/// Exactly one of `subjectId` and `roleId` selects whose permissions are
/// checked; `subjectId` wins when both are given.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizeQuery {
    /// Check the union of the subject's roles.
    pub subject_id: Option<String>,
    /// Check a single role.
    pub role_id: Option<String>,
    /// The protected resource.
    pub resource_id: String,
    /// The requested action.
    pub action: String,
}

/// `GET [base]/subjects/{subject_id}/roles`
pub async fn subject_roles_handler<S>(
    State(state): State<AppState<S>>,
    Path(subject_id): Path<String>,
) -> RestResult<Response>
where
    S: TreeStore + ?Sized + 'static,
{
    let roles = state.manager().subject_roles(&subject_id).await?;
    Ok(Json(roles).into_response())
}

/// Handler for assigning a role to a subject.
///
/// `PUT [base]/subjects/{subject_id}/roles/{role_id}`
pub async fn assign_role_handler<S>(
    State(state): State<AppState<S>>,
    Path((subject_id, role_id)): Path<(String, String)>,
) -> RestResult<Response>
where
    S: TreeStore + ?Sized + 'static,
{
    let role_id = NodeId::new(role_id);
    let assigned = state.manager().assign_role(&subject_id, &role_id).await?;
    Ok(Json(json!({
        "subjectId": subject_id,
        "roleId": role_id,
        "assigned": assigned,
    }))
    .into_response())
}

/// Handler for removing a role from a subject.
///
/// `DELETE [base]/subjects/{subject_id}/roles/{role_id}`
pub async fn unassign_role_handler<S>(
    State(state): State<AppState<S>>,
    Path((subject_id, role_id)): Path<(String, String)>,
) -> RestResult<Response>
where
    S: TreeStore + ?Sized + 'static,
{
    let role_id = NodeId::new(role_id);
    let unassigned = state.manager().unassign_role(&subject_id, &role_id).await?;
    Ok(Json(json!({
        "subjectId": subject_id,
        "roleId": role_id,
        "unassigned": unassigned,
    }))
    .into_response())
}

/// Handler for the effective permissions of a subject.
///
/// `GET [base]/subjects/{subject_id}/permissions`
pub async fn subject_permissions_handler<S>(
    State(state): State<AppState<S>>,
    Path(subject_id): Path<String>,
) -> RestResult<Response>
where
    S: TreeStore + ?Sized + 'static,
{
    let effective = state.manager().subject_permissions(&subject_id).await?;
    Ok(Json(effective.into_vec()).into_response())
}

/// Handler for authorization checks.
///
/// `GET [base]/authorize?subjectId=..&resourceId=..&action=..`
///
/// # Response
///
/// - `200 OK` - `{"allowed": bool}`
/// - `400 Bad Request` - Missing query parameters
/// - `404 Not Found` - `roleId` names a missing role
pub async fn authorize_handler<S>(
    State(state): State<AppState<S>>,
    query: Result<Query<AuthorizeQuery>, QueryRejection>,
) -> RestResult<Response>
where
    S: TreeStore + ?Sized + 'static,
{
    let Query(query) = query.map_err(|e| RestError::invalid(e.body_text()))?;

    let allowed = match (&query.subject_id, &query.role_id) {
        (Some(subject_id), _) => {
            state
                .manager()
                .authorize_subject(subject_id, &query.resource_id, &query.action)
                .await?
        }
        (None, Some(role_id)) => {
            state
                .manager()
                .is_authorized(
                    &NodeId::new(role_id.as_str()),
                    &query.resource_id,
                    &query.action,
                )
                .await?
        }
        (None, None) => {
            return Err(AuthzError::from(ValidationError::MissingRequiredField {
                field: "subjectId".to_string(),
            })
            .into());
        }
    };

    Ok(Json(json!({ "allowed": allowed })).into_response())
}
