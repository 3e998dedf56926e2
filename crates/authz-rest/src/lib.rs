//! # helios-authz-rest - HTTP API for the authorization core
//!
//! This crate exposes [`helios_authz`] over a JSON HTTP API built on axum.
//! Every request is served by a shared [`HierarchyManager`], so the tree
//! invariants (acyclicity, tenant isolation, serialized writers) hold for
//! HTTP clients exactly as they do for in-process callers.
//!
//! ## Features
//!
//! - **Organization and role trees**: CRUD, reparenting and navigation
//! - **Bulk operations**: partial-success delete, update and change-parent
//! - **Permissions**: catalogue, grants and inherited effective permissions
//! - **Subjects**: role assignments and authorization checks
//! - **Operations**: health probes, request tracing, timeouts and CORS
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use helios_authz::HierarchyManager;
//! use helios_authz::backends::sqlite::SqliteStore;
//! use helios_authz_rest::{create_app_with_config, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::default();
//!     let store = SqliteStore::open(&config.database_path)?;
//!     let manager = HierarchyManager::with_config(Arc::new(store), config.hierarchy_config());
//!
//!     let app = create_app_with_config(Arc::new(manager), config.clone());
//!
//!     let listener = tokio::net::TcpListener::bind(config.socket_addr()).await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## API Endpoints
//!
//! `{kind}` is `organizations` or `roles`.
//!
//! | Operation | HTTP Method | URL Pattern |
//! |-----------|-------------|-------------|
//! | create | POST | `/{kind}` |
//! | list | GET | `/{kind}` |
//! | read | GET | `/{kind}/{id}` |
//! | update / reparent | PUT, PATCH | `/{kind}/{id}` |
//! | delete | DELETE | `/{kind}/{id}` |
//! | children | GET | `/{kind}/{id}/children` |
//! | descendants | GET | `/{kind}/{id}/descendants` |
//! | ancestors | GET | `/{kind}/{id}/ancestors` |
//! | bulk delete | POST | `/{kind}/bulk/delete` |
//! | bulk update | POST | `/{kind}/bulk/update` |
//! | bulk change parent | POST | `/{kind}/bulk/change-parent` |
//! | define / list permissions | POST, GET | `/permissions` |
//! | read permission | GET | `/permissions/{permission_id}` |
//! | direct grants | GET, POST | `/roles/{id}/permissions` |
//! | revoke | DELETE | `/roles/{id}/permissions/{permission_id}` |
//! | effective permissions | GET | `/roles/{id}/effective-permissions` |
//! | subject roles | GET | `/subjects/{subject_id}/roles` |
//! | assign / unassign | PUT, DELETE | `/subjects/{subject_id}/roles/{role_id}` |
//! | subject permissions | GET | `/subjects/{subject_id}/permissions` |
//! | authorize | GET | `/authorize?subjectId=&resourceId=&action=` |
//! | health | GET | `/health`, `/health/live`, `/health/ready` |
//!
//! ## Errors
//!
//! Errors are returned as `{"error": <kind>, "message": <text>}`; see
//! [`RestError`] for the status mapping. Bulk endpoints always answer
//! `200 OK` with per-item failures in an `errors` array.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod routing;
pub mod state;

// Re-export commonly used types
pub use config::{ServerConfig, StorageBackend};
pub use error::{RestError, RestResult};
pub use state::AppState;

use std::sync::Arc;

use axum::Router;
use helios_authz::{HierarchyManager, TreeStore};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::info;

/// Creates the Axum application with the default configuration.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use helios_authz::HierarchyManager;
/// use helios_authz::backends::memory::InMemoryStore;
///
/// let manager = HierarchyManager::new(Arc::new(InMemoryStore::new()));
/// let app = helios_authz_rest::create_app(Arc::new(manager));
/// ```
pub fn create_app<S>(manager: Arc<HierarchyManager<S>>) -> Router
where
    S: TreeStore + ?Sized + 'static,
{
    create_app_with_config(manager, ServerConfig::default())
}

/// Creates the Axum application with custom configuration.
///
/// The manager's own [`HierarchyConfig`](helios_authz::HierarchyConfig)
/// governs batching; `config` supplies the HTTP concerns (timeout, CORS).
///
/// # Middleware
///
/// - Request tracing (`TraceLayer`)
/// - Request timeout, answered with `408 Request Timeout`
/// - CORS, when `enable_cors` is set
pub fn create_app_with_config<S>(
    manager: Arc<HierarchyManager<S>>,
    config: ServerConfig,
) -> Router
where
    S: TreeStore + ?Sized + 'static,
{
    info!(
        "Creating authorization API with backend: {}",
        manager.store().backend_name()
    );

    // Create application state
    let state = AppState::new(manager, config.clone());

    // Build the router with all routes
    let router = routing::authz_routes::create_routes(state);

    // Build middleware stack
    let service_builder = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::with_status_code(
            axum::http::StatusCode::REQUEST_TIMEOUT,
            std::time::Duration::from_secs(config.request_timeout),
        ));

    // Add CORS if enabled
    let router = if config.enable_cors {
        let cors = build_cors_layer(&config);
        router.layer(cors)
    } else {
        router
    };

    // Apply remaining middleware
    router.layer(service_builder)
}

/// Builds the CORS layer from configuration.
///
/// Each of origins, methods and headers is either `*` or a comma-separated
/// list; unparseable entries are skipped.
fn build_cors_layer(config: &ServerConfig) -> CorsLayer {
    let mut cors = CorsLayer::new();

    if config.cors_origins == "*" {
        cors = cors.allow_origin(Any);
    } else {
        let origins: Vec<_> = config
            .cors_origins
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();
        cors = cors.allow_origin(origins);
    }

    if config.cors_methods == "*" {
        cors = cors.allow_methods(Any);
    } else {
        let methods: Vec<_> = config
            .cors_methods
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();
        cors = cors.allow_methods(methods);
    }

    if config.cors_headers == "*" {
        cors = cors.allow_headers(Any);
    } else {
        let headers: Vec<_> = config
            .cors_headers
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();
        cors = cors.allow_headers(headers);
    }

    cors
}

/// Initializes the tracing subscriber.
///
/// `RUST_LOG` takes precedence; otherwise the authorization crates log at
/// `level` and `tower_http` at debug.
pub fn init_logging(level: &str) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "helios_authz={level},helios_authz_rest={level},helios_authz_server={level},tower_http=debug"
        ))
    });

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}
