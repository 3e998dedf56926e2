//! SQLite store construction and connection management.

use std::fmt::Debug;
use std::path::Path;
use std::time::Duration;

use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{AuthzError, AuthzResult, BackendError};

use super::schema;

/// SQLite implementation of [`TreeStore`](crate::core::TreeStore).
pub struct SqliteStore {
    pool: Pool<SqliteConnectionManager>,
    config: SqliteStoreConfig,
    is_memory: bool,
}

impl Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore")
            .field("config", &self.config)
            .field("is_memory", &self.is_memory)
            .finish_non_exhaustive()
    }
}

/// Configuration for the SQLite store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SqliteStoreConfig {
    /// Maximum number of connections in the pool. In-memory databases always
    /// use a single connection.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum number of idle connections.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Connection timeout in milliseconds.
    #[serde(default = "default_connection_timeout_ms")]
    pub connection_timeout_ms: u64,

    /// SQLite busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u32,

    /// Enable WAL mode for file databases.
    #[serde(default = "default_true")]
    pub enable_wal: bool,

    /// Enable foreign key constraints.
    #[serde(default = "default_true")]
    pub enable_foreign_keys: bool,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

fn default_connection_timeout_ms() -> u64 {
    30000
}

fn default_busy_timeout_ms() -> u32 {
    5000
}

fn default_true() -> bool {
    true
}

impl Default for SqliteStoreConfig {
    fn default() -> Self {
        Self {
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connection_timeout_ms: default_connection_timeout_ms(),
            busy_timeout_ms: default_busy_timeout_ms(),
            enable_wal: true,
            enable_foreign_keys: true,
        }
    }
}

impl SqliteStore {
    /// Creates a new in-memory SQLite store with its schema initialized.
    pub fn in_memory() -> AuthzResult<Self> {
        Self::with_config(":memory:", SqliteStoreConfig::default())
    }

    /// Opens or creates a file-based SQLite database with its schema initialized.
    pub fn open<P: AsRef<Path>>(path: P) -> AuthzResult<Self> {
        Self::with_config(path, SqliteStoreConfig::default())
    }

    /// Creates a store with custom configuration.
    ///
    /// Each pooled connection gets the busy timeout and foreign key setting
    /// applied when it is opened. The schema is created or migrated before
    /// the store is returned.
    pub fn with_config<P: AsRef<Path>>(path: P, config: SqliteStoreConfig) -> AuthzResult<Self> {
        let path_str = path.as_ref().to_string_lossy();
        let is_memory = path_str == ":memory:";

        let manager = if is_memory {
            SqliteConnectionManager::memory()
        } else {
            SqliteConnectionManager::file(path.as_ref())
        };

        let busy_timeout = Duration::from_millis(config.busy_timeout_ms as u64);
        let foreign_keys = config.enable_foreign_keys;
        let manager = manager.with_init(move |conn| {
            conn.busy_timeout(busy_timeout)?;
            if foreign_keys {
                conn.execute_batch("PRAGMA foreign_keys = ON;")?;
            }
            Ok(())
        });

        // Every connection to ":memory:" is a separate database, so the pool
        // must hold exactly one connection for its whole lifetime.
        let builder = if is_memory {
            Pool::builder()
                .max_size(1)
                .min_idle(Some(1))
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            Pool::builder()
                .max_size(config.max_connections)
                .min_idle(Some(config.min_connections))
        };

        let pool = builder
            .connection_timeout(Duration::from_millis(config.connection_timeout_ms))
            .build(manager)
            .map_err(|e| {
                AuthzError::Backend(BackendError::ConnectionFailed {
                    backend_name: "sqlite".to_string(),
                    message: e.to_string(),
                })
            })?;

        let store = Self {
            pool,
            config,
            is_memory,
        };

        store.configure_journal()?;
        store.init_schema()?;

        info!(path = %path_str, is_memory, "Opened SQLite tree store");
        Ok(store)
    }

    /// Initialize the database schema.
    pub fn init_schema(&self) -> AuthzResult<()> {
        let conn = self.get_connection()?;
        schema::initialize_schema(&conn)
    }

    /// Get a connection from the pool.
    pub(crate) fn get_connection(&self) -> AuthzResult<PooledConnection<SqliteConnectionManager>> {
        self.pool.get().map_err(|e| {
            AuthzError::Backend(BackendError::ConnectionFailed {
                backend_name: "sqlite".to_string(),
                message: e.to_string(),
            })
        })
    }

    /// Switches file databases to WAL mode.
    fn configure_journal(&self) -> AuthzResult<()> {
        if !self.config.enable_wal || self.is_memory {
            return Ok(());
        }

        let conn = self.get_connection()?;
        let mode: String = conn
            .query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))
            .map_err(|e| {
                AuthzError::Backend(BackendError::Internal {
                    backend_name: "sqlite".to_string(),
                    message: format!("Failed to enable WAL mode: {}", e),
                    source: None,
                })
            })?;
        debug!(journal_mode = %mode, "Configured SQLite journal");
        Ok(())
    }

    /// Returns whether this is an in-memory database.
    pub fn is_memory(&self) -> bool {
        self.is_memory
    }

    /// Returns the store configuration.
    pub fn config(&self) -> &SqliteStoreConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_store() {
        let store = SqliteStore::in_memory().unwrap();
        assert!(store.is_memory());
    }

    #[test]
    fn test_file_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::open(dir.path().join("authz.db")).unwrap();
        assert!(!store.is_memory());
        assert_eq!(store.config().max_connections, 10);
    }

    #[test]
    fn test_config_defaults_from_empty_json() {
        let config: SqliteStoreConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.busy_timeout_ms, 5000);
        assert!(config.enable_wal);
        assert!(config.enable_foreign_keys);
    }
}
