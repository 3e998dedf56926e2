//! Tree store implementations.
//!
//! - [`memory`] - in-process store guarded by a read/write lock
//! - [`sqlite`] - SQLite store (feature `sqlite`, enabled by default)

pub mod memory;

#[cfg(feature = "sqlite")]
pub mod sqlite;
