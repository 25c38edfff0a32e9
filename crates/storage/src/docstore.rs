//! Primary document storage.
//!
//! The primary store maps document id → canonical JSON bytes and is the
//! source of truth; the index can always be rebuilt from it. This module
//! stays byte-oriented — parsing and validation belong to the layer above.

use redb::ReadableTable;
use snafu::{ResultExt, Snafu};

use crate::engine::{EngineError, StorageEngine};
use crate::tables::Tables;

/// Errors returned by [`DocumentStore`] operations.
#[derive(Debug, Snafu)]
pub enum DocStoreError {
    #[snafu(display("Engine error: {source}"))]
    Engine { source: EngineError },

    #[snafu(display("Failed to open documents table: {source}"))]
    Table { source: redb::TableError },

    #[snafu(display("Storage error: {source}"))]
    Storage { source: redb::StorageError },

    #[snafu(display("Failed to commit document write: {source}"))]
    Commit { source: redb::CommitError },
}

/// Result type for document store operations.
pub type Result<T> = std::result::Result<T, DocStoreError>;

/// Document storage over the primary store.
pub struct DocumentStore {
    engine: StorageEngine,
}

#[allow(clippy::result_large_err)]
impl DocumentStore {
    /// Creates a document store over the given primary engine.
    pub fn new(engine: StorageEngine) -> Self {
        Self { engine }
    }

    /// Writes a document body, replacing any previous body for `id`.
    pub fn put(&self, id: &str, body: &[u8]) -> Result<()> {
        let txn = self.engine.begin_write().context(EngineSnafu)?;
        {
            let mut table = txn.open_table(Tables::DOCUMENTS).context(TableSnafu)?;
            table.insert(id.as_bytes(), body).context(StorageSnafu)?;
        }
        txn.commit().context(CommitSnafu)?;
        Ok(())
    }

    /// Returns a document body, or `None` if `id` is not stored.
    pub fn get(&self, id: &str) -> Result<Option<Vec<u8>>> {
        let txn = self.engine.begin_read().context(EngineSnafu)?;
        let table = match txn.open_table(Tables::DOCUMENTS) {
            Ok(table) => table,
            Err(redb::TableError::TableDoesNotExist(_)) => return Ok(None),
            Err(e) => return Err(e).context(TableSnafu),
        };
        let body = table
            .get(id.as_bytes())
            .context(StorageSnafu)?
            .map(|guard| guard.value().to_vec());
        Ok(body)
    }

    /// Deletes a document body. Returns whether it existed.
    pub fn delete(&self, id: &str) -> Result<bool> {
        let txn = self.engine.begin_write().context(EngineSnafu)?;
        let existed = {
            let mut table = txn.open_table(Tables::DOCUMENTS).context(TableSnafu)?;
            let removed = table.remove(id.as_bytes()).context(StorageSnafu)?.is_some();
            removed
        };
        txn.commit().context(CommitSnafu)?;
        Ok(existed)
    }

    /// Calls `f` with every `(id, body)` pair, in one read snapshot.
    pub fn for_each(&self, mut f: impl FnMut(&[u8], &[u8])) -> Result<()> {
        let txn = self.engine.begin_read().context(EngineSnafu)?;
        let table = match txn.open_table(Tables::DOCUMENTS) {
            Ok(table) => table,
            Err(redb::TableError::TableDoesNotExist(_)) => return Ok(()),
            Err(e) => return Err(e).context(TableSnafu),
        };
        for entry in table.iter().context(StorageSnafu)? {
            let (key, value) = entry.context(StorageSnafu)?;
            f(key.value(), value.value());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_store() -> DocumentStore {
        DocumentStore::new(StorageEngine::open_in_memory().expect("should open"))
    }

    #[test]
    fn test_put_get_delete() {
        let store = test_store();

        assert_eq!(store.get("mike").expect("get"), None);

        store.put("mike", br#"{"name":"mike"}"#).expect("put");
        assert_eq!(
            store.get("mike").expect("get"),
            Some(br#"{"name":"mike"}"#.to_vec())
        );

        assert!(store.delete("mike").expect("delete"));
        assert!(!store.delete("mike").expect("second delete"));
        assert_eq!(store.get("mike").expect("get"), None);
    }

    #[test]
    fn test_put_replaces() {
        let store = test_store();
        store.put("mike", b"v1").expect("put v1");
        store.put("mike", b"v2").expect("put v2");
        assert_eq!(store.get("mike").expect("get"), Some(b"v2".to_vec()));
    }

    #[test]
    fn test_for_each_visits_everything() {
        let store = test_store();
        store.put("a", b"1").expect("put");
        store.put("b", b"2").expect("put");

        let mut seen = Vec::new();
        store
            .for_each(|id, body| seen.push((id.to_vec(), body.to_vec())))
            .expect("for_each");
        seen.sort();
        assert_eq!(
            seen,
            vec![(b"a".to_vec(), b"1".to_vec()), (b"b".to_vec(), b"2".to_vec())]
        );
    }

    #[test]
    fn test_for_each_on_fresh_store() {
        let store = test_store();
        let mut count = 0;
        store.for_each(|_, _| count += 1).expect("for_each");
        assert_eq!(count, 0);
    }
}
