//! Helios Authorization Server
//!
//! Serves the organization and role hierarchies, permissions and subject
//! assignments over HTTP.

use std::sync::Arc;

use clap::Parser;
use helios_authz::backends::memory::InMemoryStore;
use helios_authz::{HierarchyManager, TreeStore};
use helios_authz_rest::{ServerConfig, StorageBackend, create_app_with_config, init_logging};
use tracing::info;

#[cfg(feature = "sqlite")]
use helios_authz::backends::sqlite::{SqliteStore, SqliteStoreConfig};

/// Opens the SQLite store named by the server configuration.
#[cfg(feature = "sqlite")]
fn create_sqlite_store(config: &ServerConfig) -> anyhow::Result<SqliteStore> {
    let db_path = config.database_path.as_str();
    info!(database = %db_path, "Initializing SQLite store");

    let store = SqliteStore::with_config(db_path, SqliteStoreConfig::default())?;
    Ok(store)
}

/// Fallback when the sqlite feature is not enabled.
#[cfg(not(feature = "sqlite"))]
fn create_store(config: &ServerConfig) -> anyhow::Result<Arc<dyn TreeStore>> {
    match config.storage_backend {
        StorageBackend::Memory => Ok(Arc::new(InMemoryStore::new())),
        StorageBackend::Sqlite => anyhow::bail!(
            "The sqlite backend requires the 'sqlite' feature. \
             Build with: cargo build -p helios-authz-server --features sqlite"
        ),
    }
}

/// Creates the store selected by `--storage-backend`.
#[cfg(feature = "sqlite")]
fn create_store(config: &ServerConfig) -> anyhow::Result<Arc<dyn TreeStore>> {
    match config.storage_backend {
        StorageBackend::Memory => Ok(Arc::new(InMemoryStore::new())),
        StorageBackend::Sqlite => Ok(Arc::new(create_sqlite_store(config)?)),
    }
}

/// Starts the Axum HTTP server.
async fn serve(app: axum::Router, config: &ServerConfig) -> anyhow::Result<()> {
    let addr = config.socket_addr();
    info!(address = %addr, "Server listening");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::parse();
    init_logging(&config.log_level);

    if let Err(errors) = config.validate() {
        for error in &errors {
            eprintln!("Configuration error: {}", error);
        }
        std::process::exit(1);
    }

    info!(
        port = config.port,
        host = %config.host,
        storage_backend = %config.storage_backend,
        bulk_chunk_size = config.bulk_chunk_size,
        max_batch_size = config.max_batch_size,
        "Starting Helios Authorization Server"
    );

    let store = create_store(&config)?;
    store.health_check().await?;

    let manager = HierarchyManager::with_config(store, config.hierarchy_config());
    let app = create_app_with_config(Arc::new(manager), config.clone());
    serve(app, &config).await
}
