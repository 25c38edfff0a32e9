//! Storage layer for JotDB.
//!
//! This crate provides:
//! - redb-based storage engine wrapper with file and in-memory backends
//! - Order-preserving tagged encoding of scalar values
//! - Key packing for the forward and inverted index namespaces
//! - Path extraction (document flattening)
//! - Index maintenance (index / unindex)
//! - Range-scan query evaluation over the inverted index
//! - The primary document store

mod docstore;
mod encoding;
mod engine;
mod extract;
mod indexer;
mod keys;
mod query;
mod tables;

pub use docstore::{DocStoreError, DocumentStore};
pub use encoding::{decode_number, encode_number, encode_tagged};
pub use engine::{EngineError, StorageEngine};
pub use extract::{flatten, PathValue};
pub use indexer::{IndexError, Indexer};
pub use keys::{
    decode_forward_index_key, decode_inverted_index_key, encode_forward_index_key,
    encode_inverted_index_key, forward_range_bounds, path_end_key, path_start_key,
    path_value_end_key, path_value_start_key, ForwardKey, InvertedKey, KeyError,
};
pub use query::{search, Comparison, Op, Query, QueryError};
pub use tables::Tables;
