//! Authorization route configuration.
//!
//! Defines all routes of the authorization API.

use axum::{
    Router,
    routing::{delete, get, patch, post, put},
};
use helios_authz::TreeStore;

use crate::handlers;
use crate::state::AppState;

/// Creates all authorization API routes.
///
/// `{kind}` is `organizations` or `roles`; any other collection answers 404.
///
/// # Routes
///
/// ## System-level
/// - `GET /health` - Health check
/// - `GET /health/live` - Liveness probe
/// - `GET /health/ready` - Readiness probe
/// - `GET /authorize` - Authorization check
///
/// ## Permissions and subjects
/// - `GET|POST /permissions` - List / define permissions
/// - `GET /permissions/{permission_id}` - Read a permission
/// - `GET /subjects/{subject_id}/roles` - Roles of a subject
/// - `PUT|DELETE /subjects/{subject_id}/roles/{role_id}` - Assign / unassign
/// - `GET /subjects/{subject_id}/permissions` - Effective permissions of a subject
///
/// ## Tree-level
/// - `GET /{kind}` - List
/// - `POST /{kind}` - Create
/// - `POST /{kind}/bulk/delete` - Bulk delete
/// - `POST /{kind}/bulk/update` - Bulk update
/// - `POST /{kind}/bulk/change-parent` - Bulk reparent
///
/// ## Node-level
/// - `GET /{kind}/{id}` - Read
/// - `PUT|PATCH /{kind}/{id}` - Update and/or reparent
/// - `DELETE /{kind}/{id}` - Delete
/// - `GET /{kind}/{id}/children|descendants|ancestors` - Navigation
/// - `GET|POST /roles/{id}/permissions` - Direct grants
/// - `DELETE /roles/{id}/permissions/{permission_id}` - Revoke
/// - `GET /roles/{id}/effective-permissions` - Inherited permissions
pub fn create_routes<S>(state: AppState<S>) -> Router
where
    S: TreeStore + ?Sized + 'static,
{
    Router::new()
        // System-level routes
        .route("/health", get(handlers::health_handler::<S>))
        .route("/health/live", get(handlers::liveness_handler))
        .route("/health/ready", get(handlers::readiness_handler::<S>))
        .route("/authorize", get(handlers::authorize_handler::<S>))
        // Permission catalogue
        .route(
            "/permissions",
            get(handlers::list_permissions_handler::<S>)
                .post(handlers::define_permission_handler::<S>),
        )
        .route(
            "/permissions/{permission_id}",
            get(handlers::read_permission_handler::<S>),
        )
        // Subjects
        .route(
            "/subjects/{subject_id}/roles",
            get(handlers::subject_roles_handler::<S>),
        )
        .route(
            "/subjects/{subject_id}/roles/{role_id}",
            put(handlers::assign_role_handler::<S>).delete(handlers::unassign_role_handler::<S>),
        )
        .route(
            "/subjects/{subject_id}/permissions",
            get(handlers::subject_permissions_handler::<S>),
        )
        // Tree-level routes
        .route("/{kind}", get(handlers::list_handler::<S>))
        .route("/{kind}", post(handlers::create_handler::<S>))
        .route(
            "/{kind}/bulk/delete",
            post(handlers::bulk_delete_handler::<S>),
        )
        .route(
            "/{kind}/bulk/update",
            post(handlers::bulk_update_handler::<S>),
        )
        .route(
            "/{kind}/bulk/change-parent",
            post(handlers::bulk_change_parent_handler::<S>),
        )
        // Node-level routes
        .route("/{kind}/{id}", get(handlers::read_handler::<S>))
        .route("/{kind}/{id}", put(handlers::update_handler::<S>))
        .route("/{kind}/{id}", patch(handlers::update_handler::<S>))
        .route("/{kind}/{id}", delete(handlers::delete_handler::<S>))
        .route(
            "/{kind}/{id}/children",
            get(handlers::children_handler::<S>),
        )
        .route(
            "/{kind}/{id}/descendants",
            get(handlers::descendants_handler::<S>),
        )
        .route(
            "/{kind}/{id}/ancestors",
            get(handlers::ancestors_handler::<S>),
        )
        .route(
            "/{kind}/{id}/permissions",
            get(handlers::role_permissions_handler::<S>)
                .post(handlers::grant_permission_handler::<S>),
        )
        .route(
            "/{kind}/{id}/permissions/{permission_id}",
            delete(handlers::revoke_permission_handler::<S>),
        )
        .route(
            "/{kind}/{id}/effective-permissions",
            get(handlers::effective_permissions_handler::<S>),
        )
        // State
        .with_state(state)
}
