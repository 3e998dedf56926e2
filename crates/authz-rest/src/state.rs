//! Application state for the authorization API.
//!
//! Handlers share one [`HierarchyManager`] (which owns the store and the
//! tree locks) and the server configuration.

use std::sync::Arc;

use helios_authz::{HierarchyManager, TreeStore};

use crate::config::ServerConfig;

/// Shared application state for the REST API.
///
/// # Type Parameters
///
/// * `S` - The store type; `dyn TreeStore` when the backend is chosen at runtime
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use helios_authz::HierarchyManager;
/// use helios_authz::backends::memory::InMemoryStore;
/// use helios_authz_rest::{AppState, ServerConfig};
///
/// let manager = HierarchyManager::new(Arc::new(InMemoryStore::new()));
/// let state = AppState::new(Arc::new(manager), ServerConfig::for_testing());
/// assert_eq!(state.backend_name(), "memory");
/// ```
pub struct AppState<S: ?Sized> {
    manager: Arc<HierarchyManager<S>>,
    config: Arc<ServerConfig>,
}

// Manually implement Clone since S is wrapped in Arc and doesn't need to be Clone
impl<S: ?Sized> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            manager: Arc::clone(&self.manager),
            config: Arc::clone(&self.config),
        }
    }
}

impl<S: TreeStore + ?Sized> AppState<S> {
    /// Creates a new AppState with the given manager and configuration.
    pub fn new(manager: Arc<HierarchyManager<S>>, config: ServerConfig) -> Self {
        Self {
            manager,
            config: Arc::new(config),
        }
    }

    /// Returns the hierarchy manager.
    pub fn manager(&self) -> &HierarchyManager<S> {
        &self.manager
    }

    /// Returns a clone of the manager Arc.
    pub fn manager_arc(&self) -> Arc<HierarchyManager<S>> {
        Arc::clone(&self.manager)
    }

    /// Returns a reference to the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Name of the backing store.
    pub fn backend_name(&self) -> &'static str {
        self.manager.store().backend_name()
    }
}
