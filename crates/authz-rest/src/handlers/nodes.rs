//! Node CRUD handlers.
//!
//! `POST /{kind}`, `GET /{kind}`, `GET|PUT|PATCH|DELETE /{kind}/{id}`

use axum::{
    Json,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use helios_authz::{NewNode, NodeId, NodePatch, TreeStore};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

use super::tree_kind;
use crate::error::RestResult;
use crate::extractors::JsonBody;
use crate::state::AppState;

/// Body of a create request.
///
/// `id` is generated when omitted. `tenantId` is only valid for roles.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNodeRequest {
    /// Caller-supplied id.
    #[serde(default)]
    pub id: Option<NodeId>,
    /// Parent in the same tree.
    #[serde(default)]
    pub parent_id: Option<NodeId>,
    /// Owning organization of a role.
    #[serde(default)]
    pub tenant_id: Option<NodeId>,
    /// Initial attributes.
    #[serde(default = "empty_object")]
    pub attributes: Value,
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

/// Handler for creating a node.
///
/// # HTTP Request
///
/// `POST [base]/{kind}`
///
/// # Response
///
/// - `201 Created` - Node created, with a `Location` header
/// - `400 Bad Request` - Invalid body or attributes
/// - `404 Not Found` - Parent or tenant missing
/// - `409 Conflict` - Id taken, or parent in another tenant
pub async fn create_handler<S>(
    State(state): State<AppState<S>>,
    Path(collection): Path<String>,
    JsonBody(request): JsonBody<CreateNodeRequest>,
) -> RestResult<Response>
where
    S: TreeStore + ?Sized + 'static,
{
    let kind = tree_kind(&collection)?;
    debug!(
        kind = %kind,
        id = ?request.id,
        parent_id = ?request.parent_id,
        "Processing create request"
    );

    let node = state
        .manager()
        .create(NewNode {
            kind,
            id: request.id,
            parent_id: request.parent_id,
            tenant_id: request.tenant_id,
            attributes: request.attributes,
        })
        .await?;

    let location = format!("/{}/{}", collection, node.id);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(node),
    )
        .into_response())
}

/// Handler for listing every node of a tree.
///
/// `GET [base]/{kind}`
pub async fn list_handler<S>(
    State(state): State<AppState<S>>,
    Path(collection): Path<String>,
) -> RestResult<Response>
where
    S: TreeStore + ?Sized + 'static,
{
    let kind = tree_kind(&collection)?;
    let nodes = state.manager().list(kind).await?;
    Ok(Json(nodes).into_response())
}

/// Handler for reading one node.
///
/// `GET [base]/{kind}/{id}`
pub async fn read_handler<S>(
    State(state): State<AppState<S>>,
    Path((collection, id)): Path<(String, String)>,
) -> RestResult<Response>
where
    S: TreeStore + ?Sized + 'static,
{
    let kind = tree_kind(&collection)?;
    let node = state.manager().get(kind, &NodeId::new(id)).await?;
    Ok(Json(node).into_response())
}

/// Handler for updating and/or moving a node.
///
/// Serves both `PUT` and `PATCH`. The body is a [`NodePatch`]: `attributes`
/// is merged into the stored attributes, and a present `parentId` moves the
/// node (`null` makes it a root).
///
/// # Response
///
/// - `200 OK` - The updated node
/// - `400 Bad Request` - `SelfParent`, `CircularReference` or invalid body
/// - `404 Not Found` - Node or new parent missing
/// - `409 Conflict` - New parent in another tenant
pub async fn update_handler<S>(
    State(state): State<AppState<S>>,
    Path((collection, id)): Path<(String, String)>,
    JsonBody(patch): JsonBody<NodePatch>,
) -> RestResult<Response>
where
    S: TreeStore + ?Sized + 'static,
{
    let kind = tree_kind(&collection)?;
    debug!(
        kind = %kind,
        id = %id,
        reparent = patch.parent_id.is_some(),
        "Processing update request"
    );

    let node = state.manager().update(kind, &NodeId::new(id), patch).await?;
    Ok(Json(node).into_response())
}

/// Handler for deleting a node. Children are promoted to the node's parent.
///
/// # Response
///
/// - `204 No Content` - Node deleted
/// - `404 Not Found` - Node missing
/// - `409 Conflict` - Organization still scopes roles
pub async fn delete_handler<S>(
    State(state): State<AppState<S>>,
    Path((collection, id)): Path<(String, String)>,
) -> RestResult<Response>
where
    S: TreeStore + ?Sized + 'static,
{
    let kind = tree_kind(&collection)?;
    state.manager().delete(kind, &NodeId::new(id)).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}
