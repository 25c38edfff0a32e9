//! redb storage engine wrapper.
//!
//! Provides a thin wrapper around redb with:
//! - Database lifecycle management (open-or-create)
//! - An in-memory backend for tests
//! - Convenient transaction constructors

use std::path::Path;
use std::sync::Arc;

use redb::backends::InMemoryBackend;
use redb::Database;
use snafu::Snafu;

/// Error context for engine operations.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum EngineError {
    #[snafu(display("Failed to open database at {path}: {source}"))]
    Open {
        path: String,
        source: redb::DatabaseError,
    },

    #[snafu(display("Failed to begin transaction: {source}"))]
    Transaction { source: redb::TransactionError },
}

/// Storage engine backed by redb.
///
/// Wraps a redb [`Database`] handle. The handle is shared; cloning the
/// engine clones the `Arc`, not the database. redb serializes writers
/// internally, so a single engine can be used from multiple operations
/// without extra locking.
pub struct StorageEngine {
    db: Arc<Database>,
}

#[allow(clippy::result_large_err)]
impl StorageEngine {
    /// Opens or creates a database file at the given path.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Open` if the database cannot be opened or
    /// created at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let path = path.as_ref();
        let db = if path.exists() {
            Database::open(path)
        } else {
            Database::create(path)
        }
        .map_err(|e| EngineError::Open {
            path: path.display().to_string(),
            source: e,
        })?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Creates an in-memory database, for tests.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Open` if the in-memory database cannot be
    /// created.
    pub fn open_in_memory() -> Result<Self, EngineError> {
        let db = Database::builder()
            .create_with_backend(InMemoryBackend::new())
            .map_err(|e| EngineError::Open {
                path: ":memory:".to_string(),
                source: e,
            })?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Begins a read transaction (a point-in-time snapshot).
    pub fn begin_read(&self) -> Result<redb::ReadTransaction, EngineError> {
        self.db
            .begin_read()
            .map_err(|e| EngineError::Transaction { source: e })
    }

    /// Begins a write transaction. Commits are atomic and durable.
    pub fn begin_write(&self) -> Result<redb::WriteTransaction, EngineError> {
        self.db
            .begin_write()
            .map_err(|e| EngineError::Transaction { source: e })
    }
}

impl Clone for StorageEngine {
    fn clone(&self) -> Self {
        Self {
            db: Arc::clone(&self.db),
        }
    }
}
