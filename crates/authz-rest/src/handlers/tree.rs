//! Tree navigation handlers.

use axum::{
    Json,
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use helios_authz::{NodeId, TreeStore};

use super::tree_kind;
use crate::error::RestResult;
use crate::state::AppState;

/// `GET [base]/{kind}/{id}/children` - direct children, oldest first.
pub async fn children_handler<S>(
    State(state): State<AppState<S>>,
    Path((collection, id)): Path<(String, String)>,
) -> RestResult<Response>
where
    S: TreeStore + ?Sized + 'static,
{
    let kind = tree_kind(&collection)?;
    let nodes = state.manager().children(kind, &NodeId::new(id)).await?;
    Ok(Json(nodes).into_response())
}

/// `GET [base]/{kind}/{id}/descendants` - the subtree in breadth-first order,
/// excluding the node itself.
pub async fn descendants_handler<S>(
    State(state): State<AppState<S>>,
    Path((collection, id)): Path<(String, String)>,
) -> RestResult<Response>
where
    S: TreeStore + ?Sized + 'static,
{
    let kind = tree_kind(&collection)?;
    let nodes = state.manager().descendants(kind, &NodeId::new(id)).await?;
    Ok(Json(nodes).into_response())
}

/// `GET [base]/{kind}/{id}/ancestors` - parent first, root last.
pub async fn ancestors_handler<S>(
    State(state): State<AppState<S>>,
    Path((collection, id)): Path<(String, String)>,
) -> RestResult<Response>
where
    S: TreeStore + ?Sized + 'static,
{
    let kind = tree_kind(&collection)?;
    let nodes = state.manager().ancestors(kind, &NodeId::new(id)).await?;
    Ok(Json(nodes).into_response())
}
