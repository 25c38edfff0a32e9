//! Index maintenance.
//!
//! Every indexed leaf of a document is written under two keys: an inverted
//! key ordered by `(path, value, id)` that range queries scan, and a
//! forward key ordered by `(id, path, value)` that lets unindexing find a
//! document's inverted entries without touching the primary store.
//!
//! `index` always unindexes first, so re-indexing a changed document
//! replaces its entries wholesale, and re-indexing an unchanged document
//! leaves the store byte-identical.

use redb::ReadableTable;
use serde_json::{Map, Value};
use snafu::{ResultExt, Snafu};
use tracing::warn;

use jotdb_types::{validate_doc_id, ValidationError};

use crate::engine::{EngineError, StorageEngine};
use crate::extract::flatten;
use crate::keys::{
    decode_forward_index_key, encode_forward_index_key, encode_inverted_index_key,
    forward_range_bounds,
};
use crate::tables::Tables;

/// Index entries carry no value; everything lives in the key.
const EMPTY: &[u8] = b"";

/// Errors returned by [`Indexer`] operations.
#[derive(Debug, Snafu)]
pub enum IndexError {
    /// Caller supplied input the key grammar cannot represent.
    #[snafu(display("Invalid input: {source}"))]
    Input { source: ValidationError },

    #[snafu(display("Engine error: {source}"))]
    Engine { source: EngineError },

    #[snafu(display("Failed to open index table: {source}"))]
    Table { source: redb::TableError },

    #[snafu(display("Storage error: {source}"))]
    Storage { source: redb::StorageError },

    #[snafu(display("Failed to commit index batch: {source}"))]
    Commit { source: redb::CommitError },
}

/// Result type for index operations.
pub type Result<T> = std::result::Result<T, IndexError>;

/// Maintains the forward and inverted indexes for one index store.
///
/// Stateless beyond the engine handle; writes touching the same id must be
/// serialized by the caller.
pub struct Indexer {
    engine: StorageEngine,
}

#[allow(clippy::result_large_err)]
impl Indexer {
    /// Creates an indexer over the given index store.
    pub fn new(engine: StorageEngine) -> Self {
        Self { engine }
    }

    /// Indexes `doc` under `id`, replacing any previous entries for `id`.
    ///
    /// The document's prior entries are removed first; if that fails the
    /// call aborts with the index for `id` empty, which a retry repairs.
    /// The new entries are then written in a single atomic batch.
    /// Per-entry write failures are logged and the batch is still
    /// committed.
    ///
    /// # Errors
    ///
    /// Returns `IndexError::Input` for ids, paths, or string values that
    /// violate the key grammar; storage variants for engine faults.
    pub fn index(&self, id: &str, doc: &Map<String, Value>) -> Result<()> {
        validate_doc_id(id).context(InputSnafu)?;

        if let Err(e) = self.unindex(id) {
            warn!(id, error = %e, "could not unindex before indexing; aborting");
            return Err(e);
        }

        let pairs = flatten(doc).context(InputSnafu)?;

        let txn = self.engine.begin_write().context(EngineSnafu)?;
        {
            let mut table = txn.open_table(Tables::INDEX).context(TableSnafu)?;
            for pv in &pairs {
                let inverted = encode_inverted_index_key(
                    pv.path.as_bytes(),
                    Some(&pv.tagged_value),
                    Some(id.as_bytes()),
                );
                if let Err(e) = table.insert(&inverted[..], EMPTY) {
                    warn!(id, path = %pv.path, error = %e, "could not write inverted index entry");
                }

                let forward =
                    encode_forward_index_key(id.as_bytes(), pv.path.as_bytes(), &pv.tagged_value);
                if let Err(e) = table.insert(&forward[..], EMPTY) {
                    warn!(id, path = %pv.path, error = %e, "could not write forward index entry");
                }
            }
        }
        if let Err(e) = txn.commit() {
            warn!(id, error = %e, "index batch commit failed");
            return Err(e).context(CommitSnafu);
        }
        Ok(())
    }

    /// Removes every index entry for `id`, in one atomic batch.
    ///
    /// The forward slice `[f 00 id, f 00 id 01)` names all of the
    /// document's inverted entries, so deletion never scans the primary
    /// data. A forward entry whose inverted twin is already missing
    /// indicates prior corruption; it is logged and skipped so deletion
    /// stays robust against partial state.
    ///
    /// # Errors
    ///
    /// Returns `IndexError::Input` for invalid ids; storage variants for
    /// engine faults.
    pub fn unindex(&self, id: &str) -> Result<()> {
        validate_doc_id(id).context(InputSnafu)?;
        let (fwd_start, fwd_end) = forward_range_bounds(id.as_bytes());

        let txn = self.engine.begin_write().context(EngineSnafu)?;
        {
            let mut table = txn.open_table(Tables::INDEX).context(TableSnafu)?;

            // Collect the forward slice first; the table cannot be mutated
            // while a range borrow is live.
            let forward_keys: Vec<Vec<u8>> = {
                let mut keys = Vec::new();
                for entry in table
                    .range(&fwd_start[..]..&fwd_end[..])
                    .context(StorageSnafu)?
                {
                    let (key, _) = entry.context(StorageSnafu)?;
                    keys.push(key.value().to_vec());
                }
                keys
            };

            for key in &forward_keys {
                let forward = match decode_forward_index_key(key) {
                    Ok(forward) => forward,
                    Err(e) => {
                        warn!(id, key = ?key, error = %e, "skipping undecodable forward index key");
                        continue;
                    }
                };
                let inverted = encode_inverted_index_key(
                    &forward.path,
                    Some(&forward.tagged_value),
                    Some(&forward.doc_id),
                );
                match table.remove(&inverted[..]) {
                    Ok(Some(_)) => {}
                    Ok(None) => {
                        warn!(id, key = ?inverted, "inverted index entry missing during unindex");
                    }
                    Err(e) => {
                        warn!(id, error = %e, "could not remove inverted index entry");
                    }
                }
            }

            // Drop the whole forward slice for this id.
            table
                .retain_in(&fwd_start[..]..&fwd_end[..], |_, _| false)
                .context(StorageSnafu)?;
        }
        txn.commit().context(CommitSnafu)?;
        Ok(())
    }
}
