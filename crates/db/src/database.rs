//! Database facade: primary store plus secondary indexes.
//!
//! Ties the document store and the index subsystem together behind one
//! handle. Writes keep the two stores in step (index first, then persist);
//! reads go through the index when the query has comparisons and fall back
//! to a full scan otherwise. The primary store is the source of truth:
//! [`Database::reindex`] rebuilds the index from it.

use std::path::Path;

use serde_json::{Map, Value};
use snafu::{ResultExt, Snafu};
use tracing::{debug, warn};

use jotdb_storage::{
    DocStoreError, DocumentStore, EngineError, IndexError, Indexer, Query, QueryError,
    StorageEngine,
};
use jotdb_types::{validate_doc_id, ValidationError};

/// Errors returned by [`Database`] operations.
#[derive(Debug, Snafu)]
pub enum DatabaseError {
    /// Caller supplied input the store cannot represent.
    #[snafu(display("Invalid input: {source}"))]
    Input { source: ValidationError },

    #[snafu(display("Engine error: {source}"))]
    Engine { source: EngineError },

    #[snafu(display("Index error: {source}"))]
    Index { source: IndexError },

    #[snafu(display("Query error: {source}"))]
    Query { source: QueryError },

    #[snafu(display("Document store error: {source}"))]
    Documents { source: DocStoreError },

    #[snafu(display("Document {id:?} is not valid JSON: {source}"))]
    Serialization {
        id: String,
        source: serde_json::Error,
    },
}

/// Result type for database operations.
pub type Result<T> = std::result::Result<T, DatabaseError>;

/// One search result: the document and its id.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    /// Document id.
    pub id: String,
    /// Document body.
    pub doc: Map<String, Value>,
}

/// An open JotDB database: a primary document store and its index store.
///
/// Handles are cheap to clone and share. Writes touching the same id must
/// be serialized by the caller; readers never block.
pub struct Database {
    documents: DocumentStore,
    indexer: Indexer,
    index_engine: StorageEngine,
}

#[allow(clippy::result_large_err)]
impl Database {
    /// Opens (or creates) the database at `path`.
    ///
    /// The primary store lives at `path` and the index store beside it at
    /// `<path>.index`.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::Engine` if either store cannot be opened.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let primary = StorageEngine::open(path).context(EngineSnafu)?;

        let mut index_path = path.as_os_str().to_os_string();
        index_path.push(".index");
        let index = StorageEngine::open(Path::new(&index_path)).context(EngineSnafu)?;

        Ok(Self::from_engines(primary, index))
    }

    /// Opens both stores in memory, for tests.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::Engine` if either store cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let primary = StorageEngine::open_in_memory().context(EngineSnafu)?;
        let index = StorageEngine::open_in_memory().context(EngineSnafu)?;
        Ok(Self::from_engines(primary, index))
    }

    fn from_engines(primary: StorageEngine, index: StorageEngine) -> Self {
        Self {
            documents: DocumentStore::new(primary),
            indexer: Indexer::new(index.clone()),
            index_engine: index,
        }
    }

    /// Stores `doc` under `id`, replacing any previous document.
    ///
    /// The document is indexed first and then persisted as canonical JSON
    /// bytes; if indexing fails nothing is persisted, so the index never
    /// lags a stored document.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::Input` for ids or documents the key grammar
    /// cannot represent, and storage variants for engine faults.
    pub fn put(&self, id: &str, doc: &Map<String, Value>) -> Result<()> {
        validate_doc_id(id).context(InputSnafu)?;
        self.indexer.index(id, doc).context(IndexSnafu)?;

        let body = serde_json::to_vec(doc).context(SerializationSnafu { id })?;
        self.documents.put(id, &body).context(DocumentsSnafu)?;
        debug!(id, "stored document");
        Ok(())
    }

    /// Returns the document stored under `id`, if any.
    pub fn get(&self, id: &str) -> Result<Option<Map<String, Value>>> {
        let Some(body) = self.documents.get(id).context(DocumentsSnafu)? else {
            return Ok(None);
        };
        let doc = serde_json::from_slice(&body).context(SerializationSnafu { id })?;
        Ok(Some(doc))
    }

    /// Deletes the document stored under `id`, unindexing it first.
    /// Returns whether a document existed.
    pub fn delete(&self, id: &str) -> Result<bool> {
        validate_doc_id(id).context(InputSnafu)?;
        self.indexer.unindex(id).context(IndexSnafu)?;
        self.documents.delete(id).context(DocumentsSnafu)
    }

    /// Runs a query and returns the matching documents, unordered.
    ///
    /// A query with comparisons is answered from the index; an empty query
    /// matches every document and is answered by a scan of the primary
    /// store (the index reports the empty conjunction as no ids).
    ///
    /// # Errors
    ///
    /// Surfaces engine and iterator faults; individual corrupt index
    /// entries or document bodies are logged and skipped.
    pub fn search(&self, query: &Query) -> Result<Vec<SearchHit>> {
        if query.ands.is_empty() {
            return self.scan(query);
        }

        let ids = jotdb_storage::search(&self.index_engine, query).context(QuerySnafu)?;
        let mut hits = Vec::with_capacity(ids.len());
        for id in ids {
            match self.documents.get(&id).context(DocumentsSnafu)? {
                Some(body) => match serde_json::from_slice(&body) {
                    Ok(doc) => hits.push(SearchHit { id, doc }),
                    Err(e) => warn!(id = %id, error = %e, "skipping unparseable document body"),
                },
                None => warn!(id = %id, "index entry points at a missing document"),
            }
        }
        Ok(hits)
    }

    /// Evaluates a query by scanning the primary store, without the index.
    ///
    /// Uses the same collation as the index, so for any query `scan` and
    /// [`Database::search`] agree on a quiesced store.
    pub fn scan(&self, query: &Query) -> Result<Vec<SearchHit>> {
        let mut hits = Vec::new();
        self.documents
            .for_each(|id, body| {
                let id = match std::str::from_utf8(id) {
                    Ok(id) => id,
                    Err(e) => {
                        warn!(error = %e, "skipping document with non-UTF-8 id");
                        return;
                    }
                };
                let doc: Map<String, Value> = match serde_json::from_slice(body) {
                    Ok(doc) => doc,
                    Err(e) => {
                        warn!(id, error = %e, "skipping unparseable document body");
                        return;
                    }
                };
                if query.matches(&doc) {
                    hits.push(SearchHit {
                        id: id.to_string(),
                        doc,
                    });
                }
            })
            .context(DocumentsSnafu)?;
        Ok(hits)
    }

    /// Rebuilds the index from the primary store.
    ///
    /// Best-effort: documents that fail to parse or index are logged and
    /// skipped. Returns the number of documents indexed.
    pub fn reindex(&self) -> Result<usize> {
        let mut indexed = 0usize;
        self.documents
            .for_each(|id, body| {
                let id = match std::str::from_utf8(id) {
                    Ok(id) => id,
                    Err(e) => {
                        warn!(error = %e, "skipping document with non-UTF-8 id during reindex");
                        return;
                    }
                };
                let doc: Map<String, Value> = match serde_json::from_slice(body) {
                    Ok(doc) => doc,
                    Err(e) => {
                        warn!(id, error = %e, "skipping unparseable document during reindex");
                        return;
                    }
                };
                match self.indexer.index(id, &doc) {
                    Ok(()) => indexed += 1,
                    Err(e) => warn!(id, error = %e, "could not reindex document"),
                }
            })
            .context(DocumentsSnafu)?;
        Ok(indexed)
    }

    /// Counts the documents in the primary store.
    pub fn document_count(&self) -> Result<usize> {
        let mut count = 0;
        self.documents
            .for_each(|_, _| count += 1)
            .context(DocumentsSnafu)?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jotdb_storage::{Comparison, Op};
    use serde_json::json;

    fn doc(value: serde_json::Value) -> Map<String, Value> {
        value.as_object().expect("object").clone()
    }

    fn hit_ids(hits: &[SearchHit]) -> Vec<&str> {
        let mut ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
        ids.sort();
        ids
    }

    #[test]
    fn test_put_get_roundtrip() {
        let db = Database::open_in_memory().expect("open");
        let body = doc(json!({"name": "mike", "age": 40}));

        db.put("mike", &body).expect("put");
        assert_eq!(db.get("mike").expect("get"), Some(body));
        assert_eq!(db.get("ghost").expect("get"), None);
    }

    #[test]
    fn test_update_moves_index_entries() {
        let db = Database::open_in_memory().expect("open");
        db.put("mike", &doc(json!({"name": "mike"}))).expect("put v1");
        db.put("mike", &doc(json!({"name": "michael"})))
            .expect("put v2");

        let old = Query::new(vec![Comparison::new(["name"], Op::Eq, "mike")]);
        let new = Query::new(vec![Comparison::new(["name"], Op::Eq, "michael")]);
        assert!(db.search(&old).expect("search").is_empty());
        assert_eq!(hit_ids(&db.search(&new).expect("search")), vec!["mike"]);
    }

    #[test]
    fn test_delete_removes_document_and_entries() {
        let db = Database::open_in_memory().expect("open");
        db.put("mike", &doc(json!({"name": "mike"}))).expect("put");

        assert!(db.delete("mike").expect("delete"));
        assert!(!db.delete("mike").expect("second delete"));

        assert_eq!(db.get("mike").expect("get"), None);
        let query = Query::new(vec![Comparison::new(["name"], Op::Eq, "mike")]);
        assert!(db.search(&query).expect("search").is_empty());
    }

    #[test]
    fn test_empty_query_scans_everything() {
        let db = Database::open_in_memory().expect("open");
        db.put("a", &doc(json!({"x": 1}))).expect("put");
        db.put("b", &doc(json!({"y": 2}))).expect("put");

        let hits = db.search(&Query::default()).expect("search");
        assert_eq!(hit_ids(&hits), vec!["a", "b"]);
    }

    #[test]
    fn test_invalid_id_rejected() {
        let db = Database::open_in_memory().expect("open");
        let err = db.put("", &doc(json!({"x": 1}))).expect_err("empty id");
        assert!(matches!(err, DatabaseError::Input { .. }));
    }

    #[test]
    fn test_document_count() {
        let db = Database::open_in_memory().expect("open");
        assert_eq!(db.document_count().expect("count"), 0);
        db.put("a", &doc(json!({"x": 1}))).expect("put");
        db.put("b", &doc(json!({"x": 2}))).expect("put");
        assert_eq!(db.document_count().expect("count"), 2);
    }
}
