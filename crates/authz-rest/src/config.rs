//! Server configuration for the authorization API.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `AUTHZ_SERVER_PORT` | 8080 | Server port |
//! | `AUTHZ_SERVER_HOST` | 127.0.0.1 | Host to bind |
//! | `AUTHZ_LOG_LEVEL` | info | Log level |
//! | `AUTHZ_STORAGE_BACKEND` | sqlite | `memory` or `sqlite` |
//! | `AUTHZ_DATABASE_PATH` | authz.db | SQLite file (`:memory:` for a private in-memory database) |
//! | `AUTHZ_REQUEST_TIMEOUT` | 30 | Request timeout (seconds) |
//! | `AUTHZ_ENABLE_CORS` | true | Enable CORS |
//! | `AUTHZ_CORS_ORIGINS` | * | Allowed origins |
//! | `AUTHZ_CORS_METHODS` | GET,POST,PUT,PATCH,DELETE,OPTIONS | Allowed methods |
//! | `AUTHZ_CORS_HEADERS` | Content-Type,Authorization,Accept | Allowed headers |
//! | `AUTHZ_BULK_CHUNK_SIZE` | 50 | Items handled per lock acquisition in batch operations |
//! | `AUTHZ_MAX_BATCH_SIZE` | 1000 | Largest accepted batch |
//!
//! # Example
//!
//! ```rust
//! use helios_authz_rest::{ServerConfig, StorageBackend};
//!
//! let config = ServerConfig {
//!     port: 3000,
//!     storage_backend: StorageBackend::Memory,
//!     ..Default::default()
//! };
//! assert!(config.validate().is_ok());
//! ```

use std::fmt;

use clap::{Parser, ValueEnum};
use helios_authz::HierarchyConfig;

/// Where the trees are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StorageBackend {
    /// Process-local store; contents are lost on shutdown.
    Memory,
    /// SQLite database file.
    Sqlite,
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageBackend::Memory => write!(f, "memory"),
            StorageBackend::Sqlite => write!(f, "sqlite"),
        }
    }
}

/// Server configuration for the authorization API.
#[derive(Debug, Clone, Parser)]
#[command(name = "authz-server")]
#[command(about = "Hierarchical authorization server")]
pub struct ServerConfig {
    /// Port to listen on.
    #[arg(short, long, env = "AUTHZ_SERVER_PORT", default_value = "8080")]
    pub port: u16,

    /// Host address to bind to.
    #[arg(long, env = "AUTHZ_SERVER_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long, env = "AUTHZ_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Storage backend.
    #[arg(long, env = "AUTHZ_STORAGE_BACKEND", value_enum, default_value = "sqlite")]
    pub storage_backend: StorageBackend,

    /// SQLite database path.
    #[arg(long, env = "AUTHZ_DATABASE_PATH", default_value = "authz.db")]
    pub database_path: String,

    /// Request timeout in seconds.
    #[arg(long, env = "AUTHZ_REQUEST_TIMEOUT", default_value = "30")]
    pub request_timeout: u64,

    /// Enable CORS.
    #[arg(long, env = "AUTHZ_ENABLE_CORS", default_value = "true")]
    pub enable_cors: bool,

    /// Allowed CORS origins (comma-separated, or * for all).
    #[arg(long, env = "AUTHZ_CORS_ORIGINS", default_value = "*")]
    pub cors_origins: String,

    /// Allowed CORS methods (comma-separated, or * for all).
    #[arg(
        long,
        env = "AUTHZ_CORS_METHODS",
        default_value = "GET,POST,PUT,PATCH,DELETE,OPTIONS"
    )]
    pub cors_methods: String,

    /// Allowed CORS headers (comma-separated, or * for all).
    #[arg(
        long,
        env = "AUTHZ_CORS_HEADERS",
        default_value = "Content-Type,Authorization,Accept"
    )]
    pub cors_headers: String,

    /// Items handled per lock acquisition in batch operations.
    #[arg(long, env = "AUTHZ_BULK_CHUNK_SIZE", default_value = "50")]
    pub bulk_chunk_size: usize,

    /// Largest accepted batch.
    #[arg(long, env = "AUTHZ_MAX_BATCH_SIZE", default_value = "1000")]
    pub max_batch_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            host: "127.0.0.1".to_string(),
            log_level: "info".to_string(),
            storage_backend: StorageBackend::Sqlite,
            database_path: "authz.db".to_string(),
            request_timeout: 30,
            enable_cors: true,
            cors_origins: "*".to_string(),
            cors_methods: "GET,POST,PUT,PATCH,DELETE,OPTIONS".to_string(),
            cors_headers: "Content-Type,Authorization,Accept".to_string(),
            bulk_chunk_size: 50,
            max_batch_size: 1000,
        }
    }
}

impl ServerConfig {
    /// Parses environment variables without requiring command line arguments.
    pub fn from_env() -> Self {
        Self::try_parse_from(["authz-server"]).unwrap_or_default()
    }

    /// Returns the socket address to bind to.
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// The batch tunables for the hierarchy manager.
    pub fn hierarchy_config(&self) -> HierarchyConfig {
        HierarchyConfig::default()
            .with_bulk_chunk_size(self.bulk_chunk_size)
            .with_max_batch_size(self.max_batch_size)
    }

    /// Validates the configuration and returns errors if any.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.port == 0 {
            errors.push("Port cannot be 0".to_string());
        }

        if self.request_timeout == 0 {
            errors.push("Request timeout cannot be 0".to_string());
        }

        if self.storage_backend == StorageBackend::Sqlite && self.database_path.trim().is_empty() {
            errors.push("Database path cannot be empty for the sqlite backend".to_string());
        }

        if let Err(hierarchy_errors) = self.hierarchy_config().validate() {
            errors.extend(hierarchy_errors);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Creates a configuration suitable for testing.
    ///
    /// Uses an ephemeral port and the in-memory store, and disables CORS.
    pub fn for_testing() -> Self {
        Self {
            port: 0,
            log_level: "debug".to_string(),
            storage_backend: StorageBackend::Memory,
            database_path: ":memory:".to_string(),
            request_timeout: 5,
            enable_cors: false,
            cors_methods: "*".to_string(),
            cors_headers: "*".to_string(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 8080);
        assert_eq!(config.storage_backend, StorageBackend::Sqlite);
        assert!(config.enable_cors);
    }

    #[test]
    fn test_socket_addr() {
        let config = ServerConfig {
            port: 3000,
            host: "0.0.0.0".to_string(),
            ..Default::default()
        };
        assert_eq!(config.socket_addr(), "0.0.0.0:3000");
    }

    #[test]
    fn test_parse_arguments() {
        let config = ServerConfig::try_parse_from([
            "authz-server",
            "--storage-backend",
            "memory",
            "--bulk-chunk-size",
            "10",
        ])
        .unwrap();
        assert_eq!(config.storage_backend, StorageBackend::Memory);
        assert_eq!(config.hierarchy_config().bulk_chunk_size, 10);
    }

    #[test]
    fn test_validate_valid() {
        assert!(ServerConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validate_collects_errors() {
        let config = ServerConfig {
            port: 0,
            bulk_chunk_size: 0,
            ..Default::default()
        };
        let errors = config.validate().unwrap_err();
        assert!(errors.iter().any(|e| e.contains("Port")));
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_for_testing() {
        let config = ServerConfig::for_testing();
        assert_eq!(config.port, 0);
        assert_eq!(config.storage_backend, StorageBackend::Memory);
        assert!(!config.enable_cors);
    }
}
