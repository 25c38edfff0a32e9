//! JotDB: a small embedded JSON document database.
//!
//! Documents are schemaless JSON objects stored by id in a primary store,
//! with a pair of cooperating secondary indexes (inverted and forward) that
//! answer equality, range, and conjunctive queries without scanning the
//! primary data.
//!
//! ```no_run
//! use jotdb::{Comparison, Database, Op, Query};
//! use serde_json::json;
//!
//! let db = Database::open("jotdb.data")?;
//!
//! let doc = json!({"name": "mike", "age": 40, "pet": "cat"});
//! db.put("mike", doc.as_object().unwrap())?;
//!
//! let query = Query::new(vec![Comparison::new(["name"], Op::Eq, "mike")]);
//! for hit in db.search(&query)? {
//!     println!("{}: {:?}", hit.id, hit.doc);
//! }
//! # Ok::<(), jotdb::DatabaseError>(())
//! ```

mod database;

pub use database::{Database, DatabaseError, SearchHit};

// Re-export the query AST and scalar type so callers need only this crate.
pub use jotdb_storage::{Comparison, Op, Query, QueryError};
pub use jotdb_types::Scalar;
