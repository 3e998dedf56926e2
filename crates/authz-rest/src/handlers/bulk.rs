//! Bulk operation handlers.
//!
//! Bulk endpoints always answer `200 OK` once the request itself is valid.
//! Items that fail are listed in `errors` and never roll back the items
//! that succeeded.

use axum::{
    Json,
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use helios_authz::types::BatchItemError;
use helios_authz::{NodeId, NodePatch, TreeStore};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::tree_kind;
use crate::error::RestResult;
use crate::extractors::JsonBody;
use crate::state::AppState;

/// Body of `POST /{kind}/bulk/delete`.
#[derive(Debug, Deserialize)]
pub struct BulkDeleteRequest {
    /// Nodes to delete.
    pub ids: Vec<NodeId>,
}

/// Body of `POST /{kind}/bulk/update`: the ids plus a node patch.
#[derive(Debug, Deserialize)]
pub struct BulkUpdateRequest {
    /// Nodes to update.
    pub ids: Vec<NodeId>,
    /// Patch applied to every node.
    #[serde(flatten)]
    pub patch: NodePatch,
}

/// Body of `POST /{kind}/bulk/change-parent`.
///
/// A missing or `null` `parentId` moves the nodes to the root.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkChangeParentRequest {
    /// Nodes to move.
    pub ids: Vec<NodeId>,
    /// The new parent.
    #[serde(default)]
    pub parent_id: Option<NodeId>,
}

/// Result of a bulk delete.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkDeleteResponse {
    /// Nodes deleted.
    pub deleted_count: u64,
    /// Per-item failures.
    pub errors: Vec<BatchItemError>,
}

/// Result of a bulk update or change-parent.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkUpdateResponse {
    /// Nodes updated.
    pub updated_count: u64,
    /// Per-item failures.
    pub errors: Vec<BatchItemError>,
}

/// Handler for `POST [base]/{kind}/bulk/delete`.
pub async fn bulk_delete_handler<S>(
    State(state): State<AppState<S>>,
    Path(collection): Path<String>,
    JsonBody(request): JsonBody<BulkDeleteRequest>,
) -> RestResult<Response>
where
    S: TreeStore + ?Sized + 'static,
{
    let kind = tree_kind(&collection)?;
    debug!(kind = %kind, items = request.ids.len(), "Processing bulk delete");

    let outcome = state.manager().bulk_delete(kind, &request.ids).await?;
    Ok(Json(BulkDeleteResponse {
        deleted_count: outcome.count,
        errors: outcome.errors,
    })
    .into_response())
}

/// Handler for `POST [base]/{kind}/bulk/update`.
pub async fn bulk_update_handler<S>(
    State(state): State<AppState<S>>,
    Path(collection): Path<String>,
    JsonBody(request): JsonBody<BulkUpdateRequest>,
) -> RestResult<Response>
where
    S: TreeStore + ?Sized + 'static,
{
    let kind = tree_kind(&collection)?;
    debug!(kind = %kind, items = request.ids.len(), "Processing bulk update");

    let outcome = state
        .manager()
        .bulk_update_attributes(kind, &request.ids, request.patch)
        .await?;
    Ok(Json(BulkUpdateResponse {
        updated_count: outcome.count,
        errors: outcome.errors,
    })
    .into_response())
}

/// Handler for `POST [base]/{kind}/bulk/change-parent`.
pub async fn bulk_change_parent_handler<S>(
    State(state): State<AppState<S>>,
    Path(collection): Path<String>,
    JsonBody(request): JsonBody<BulkChangeParentRequest>,
) -> RestResult<Response>
where
    S: TreeStore + ?Sized + 'static,
{
    let kind = tree_kind(&collection)?;
    debug!(
        kind = %kind,
        items = request.ids.len(),
        parent_id = ?request.parent_id,
        "Processing bulk change-parent"
    );

    let outcome = state
        .manager()
        .bulk_change_parent(kind, &request.ids, request.parent_id)
        .await?;
    Ok(Json(BulkUpdateResponse {
        updated_count: outcome.count,
        errors: outcome.errors,
    })
    .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bulk_update_request_flattens_patch() {
        let request: BulkUpdateRequest = serde_json::from_value(json!({
            "ids": ["a", "b"],
            "attributes": {"active": false}
        }))
        .unwrap();
        assert_eq!(request.ids, vec![NodeId::new("a"), NodeId::new("b")]);
        assert_eq!(request.patch.attributes, Some(json!({"active": false})));
        assert_eq!(request.patch.parent_id, None);
    }

    #[test]
    fn test_change_parent_defaults_to_root() {
        let request: BulkChangeParentRequest =
            serde_json::from_value(json!({"ids": ["a"]})).unwrap();
        assert_eq!(request.parent_id, None);
    }

    #[test]
    fn test_response_field_names() {
        let body = serde_json::to_value(BulkDeleteResponse {
            deleted_count: 1,
            errors: Vec::new(),
        })
        .unwrap();
        assert_eq!(body, json!({"deletedCount": 1, "errors": []}));
    }
}
