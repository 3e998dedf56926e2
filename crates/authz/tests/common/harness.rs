//! Backend harness.
//!
//! Every test body is written once, generic over the store, and expanded by
//! [`backend_test!`] into one `#[tokio::test]` per backend:
//!
//! ```ignore
//! async fn create_then_get<S: TreeStore + ?Sized + 'static>(m: HierarchyManager<S>) {
//!     // ...
//! }
//!
//! backend_test!(create_then_get, create_then_get);
//! // expands to `memory_create_then_get` and `sqlite_create_then_get`
//! ```

use std::sync::Arc;

use helios_authz::backends::memory::InMemoryStore;
#[cfg(feature = "sqlite")]
use helios_authz::backends::sqlite::SqliteStore;
use helios_authz::{HierarchyConfig, HierarchyManager};

/// A manager over a fresh in-memory store.
pub fn memory_manager(config: HierarchyConfig) -> HierarchyManager<InMemoryStore> {
    HierarchyManager::with_config(Arc::new(InMemoryStore::new()), config)
}

/// A manager over a fresh in-memory SQLite database.
#[cfg(feature = "sqlite")]
pub fn sqlite_manager(config: HierarchyConfig) -> HierarchyManager<SqliteStore> {
    let store = SqliteStore::in_memory().expect("Failed to create SQLite store");
    HierarchyManager::with_config(Arc::new(store), config)
}

/// Generates one test per backend from a generic async test function.
///
/// Forms:
///
/// - `backend_test!(name, test_fn)` - default configuration
/// - `backend_test!(name, test_fn, config: expr)` - custom [`HierarchyConfig`]
/// - `backend_test!(name, test_fn, multi_thread)` - multi-threaded runtime
macro_rules! backend_test {
    ($test_name:ident, $test_fn:path) => {
        backend_test!(
            $test_name,
            $test_fn,
            config: helios_authz::HierarchyConfig::default()
        );
    };
    ($test_name:ident, $test_fn:path, config: $config:expr) => {
        paste::paste! {
            #[tokio::test]
            async fn [<memory_ $test_name>]() {
                let manager = $crate::common::harness::memory_manager($config);
                $test_fn(manager).await;
            }

            #[cfg(feature = "sqlite")]
            #[tokio::test]
            async fn [<sqlite_ $test_name>]() {
                let manager = $crate::common::harness::sqlite_manager($config);
                $test_fn(manager).await;
            }
        }
    };
    ($test_name:ident, $test_fn:path, multi_thread) => {
        paste::paste! {
            #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
            async fn [<memory_ $test_name>]() {
                let manager = $crate::common::harness::memory_manager(
                    helios_authz::HierarchyConfig::default(),
                );
                $test_fn(std::sync::Arc::new(manager)).await;
            }

            #[cfg(feature = "sqlite")]
            #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
            async fn [<sqlite_ $test_name>]() {
                let manager = $crate::common::harness::sqlite_manager(
                    helios_authz::HierarchyConfig::default(),
                );
                $test_fn(std::sync::Arc::new(manager)).await;
            }
        }
    };
}
