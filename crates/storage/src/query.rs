//! Query evaluation over the inverted index.
//!
//! A query is a conjunction of comparisons. Each comparison is answered by
//! one or two range scans of the inverted index, bounded by the prefix keys
//! from the keys module; the conjunction keeps the ids every comparison
//! matched. Results are unordered sets of document ids.
//!
//! The scans are read-only and each opens its own snapshot, so a query
//! racing a write may see an id for some comparisons and not others; that
//! yields a false negative, never a false positive against the state either
//! snapshot saw.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use redb::ReadableTable;
use serde_json::{Map, Value};
use snafu::{ResultExt, Snafu};
use tracing::warn;

use jotdb_types::Scalar;

use crate::encoding::encode_tagged;
use crate::engine::{EngineError, StorageEngine};
use crate::keys::{
    decode_inverted_index_key, path_end_key, path_start_key, path_value_end_key,
    path_value_start_key,
};
use crate::tables::Tables;

/// Errors returned by query evaluation.
#[derive(Debug, Snafu)]
pub enum QueryError {
    /// Operator text that names no supported comparison.
    #[snafu(display("Unrecognised op {op:?} in query"))]
    UnrecognizedOp { op: String },

    #[snafu(display("Engine error: {source}"))]
    Engine { source: EngineError },

    #[snafu(display("Failed to open index table: {source}"))]
    Table { source: redb::TableError },

    #[snafu(display("Storage error: {source}"))]
    Storage { source: redb::StorageError },
}

/// Result type for query operations.
pub type Result<T> = std::result::Result<T, QueryError>;

/// Comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    /// Equality.
    Eq,
    /// Strictly greater than.
    Gt,
    /// Greater than or equal.
    Gte,
    /// Strictly less than.
    Lt,
    /// Less than or equal.
    Lte,
}

impl Op {
    /// The operator's query-text spelling.
    pub fn symbol(self) -> &'static str {
        match self {
            Op::Eq => "=",
            Op::Gt => ">",
            Op::Gte => ">=",
            Op::Lt => "<",
            Op::Lte => "<=",
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Op {
    type Err = QueryError;

    /// Parses an operator from query text. Anything but the five supported
    /// spellings fails the whole query with `UnrecognizedOp`.
    fn from_str(s: &str) -> Result<Op> {
        match s {
            "=" => Ok(Op::Eq),
            ">" => Ok(Op::Gt),
            ">=" => Ok(Op::Gte),
            "<" => Ok(Op::Lt),
            "<=" => Ok(Op::Lte),
            other => UnrecognizedOpSnafu { op: other }.fail(),
        }
    }
}

/// One comparison: `path op value`.
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    /// Path segments, joined with `.` for index lookup.
    pub path: Vec<String>,
    /// Comparison operator.
    pub op: Op,
    /// Typed comparand; never coerced across kinds.
    pub value: Scalar,
}

impl Comparison {
    /// Builds a comparison.
    pub fn new<P, S>(path: P, op: Op, value: impl Into<Scalar>) -> Self
    where
        P: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            path: path.into_iter().map(Into::into).collect(),
            op,
            value: value.into(),
        }
    }

    /// The dotted path this comparison addresses.
    pub fn dotted_path(&self) -> String {
        self.path.join(".")
    }

    /// Evaluates the comparison directly against a document, without the
    /// index.
    ///
    /// Uses the same collation as the index (tagged encodings compared as
    /// bytes), so a full scan filtered by this predicate agrees with an
    /// index search. Documents lacking the path, or holding an array or
    /// object there, never match.
    pub fn matches(&self, doc: &Map<String, Value>) -> bool {
        let Some(value) = lookup_path(doc, &self.path) else {
            return false;
        };
        let Some(actual) = Scalar::from_json(value) else {
            return false;
        };
        let ordering = encode_tagged(&actual).cmp(&encode_tagged(&self.value));
        match self.op {
            Op::Eq => ordering.is_eq(),
            Op::Gt => ordering.is_gt(),
            Op::Gte => ordering.is_ge(),
            Op::Lt => ordering.is_lt(),
            Op::Lte => ordering.is_le(),
        }
    }
}

/// A conjunction of comparisons.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    /// The comparisons; all must hold.
    pub ands: Vec<Comparison>,
}

impl Query {
    /// Builds a query from its comparisons.
    pub fn new(ands: Vec<Comparison>) -> Self {
        Self { ands }
    }

    /// Evaluates the whole conjunction against a document. An empty
    /// conjunction matches every document.
    pub fn matches(&self, doc: &Map<String, Value>) -> bool {
        self.ands.iter().all(|comparison| comparison.matches(doc))
    }
}

/// Walks `doc` along `segments`, returning the leaf value if every step
/// traverses an object.
fn lookup_path<'a>(doc: &'a Map<String, Value>, segments: &[String]) -> Option<&'a Value> {
    let (first, rest) = segments.split_first()?;
    let mut current = doc.get(first)?;
    for segment in rest {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Runs a conjunction against the inverted index, returning matching doc
/// ids in no particular order.
///
/// Each comparison votes for the ids it matched; the result is exactly the
/// ids seen by every comparison. An empty conjunction returns the empty
/// set — it is the caller's decision whether that means "scan everything"
/// instead.
///
/// # Errors
///
/// Surfaces engine and iterator faults. Individual undecodable index
/// entries are logged and skipped, not surfaced.
#[allow(clippy::result_large_err)]
pub fn search(engine: &StorageEngine, query: &Query) -> Result<Vec<String>> {
    let mut votes: HashMap<String, usize> = HashMap::new();

    for comparison in &query.ands {
        for id in lookup(engine, comparison)? {
            *votes.entry(id).or_insert(0) += 1;
        }
    }

    let required = query.ands.len();
    Ok(votes
        .into_iter()
        .filter(|(_, count)| *count == required)
        .map(|(id, _)| id)
        .collect())
}

/// Answers a single comparison with the range scans from the bound table:
///
/// | op   | lower                  | upper                | post-filter        |
/// |------|------------------------|----------------------|--------------------|
/// | `=`  | pv_start               | pv_end               | none               |
/// | `>=` | pv_start               | path_end             | none               |
/// | `>`  | pv_start               | path_end             | skip pv_start hits |
/// | `<`  | path_start             | pv_start             | none               |
/// | `<=` | path_start             | pv_start             | plus the `=` scan  |
fn lookup(engine: &StorageEngine, comparison: &Comparison) -> Result<HashSet<String>> {
    let dotted = comparison.dotted_path();
    let path = dotted.as_bytes();
    let value = &comparison.value;

    match comparison.op {
        Op::Eq => scan_ids(
            engine,
            &path_value_start_key(path, value),
            &path_value_end_key(path, value),
            None,
        ),
        Op::Gte => scan_ids(
            engine,
            &path_value_start_key(path, value),
            &path_end_key(path),
            None,
        ),
        Op::Gt => {
            // The lower bound is inclusive; entries sitting exactly at the
            // (path, value) prefix are equality hits and get skipped.
            let start = path_value_start_key(path, value);
            scan_ids(engine, &start, &path_end_key(path), Some(&start))
        }
        Op::Lt => scan_ids(
            engine,
            &path_start_key(path),
            &path_value_start_key(path, value),
            None,
        ),
        Op::Lte => {
            // The upper bound is exclusive, so equality needs its own scan.
            let mut ids = scan_ids(
                engine,
                &path_start_key(path),
                &path_value_start_key(path, value),
                None,
            )?;
            ids.extend(scan_ids(
                engine,
                &path_value_start_key(path, value),
                &path_value_end_key(path, value),
                None,
            )?);
            Ok(ids)
        }
    }
}

/// Scans `[lower, upper)` of the inverted index and collects doc ids,
/// optionally skipping keys that begin with `skip_prefix`.
fn scan_ids(
    engine: &StorageEngine,
    lower: &[u8],
    upper: &[u8],
    skip_prefix: Option<&[u8]>,
) -> Result<HashSet<String>> {
    let mut ids = HashSet::new();

    let txn = engine.begin_read().context(EngineSnafu)?;
    let table = match txn.open_table(Tables::INDEX) {
        Ok(table) => table,
        // Nothing has been indexed yet: an absent table is an empty range.
        Err(redb::TableError::TableDoesNotExist(_)) => return Ok(ids),
        Err(e) => return Err(e).context(TableSnafu),
    };

    for entry in table.range(lower..upper).context(StorageSnafu)? {
        let (key, _) = entry.context(StorageSnafu)?;
        let key = key.value();
        if skip_prefix.is_some_and(|prefix| key.starts_with(prefix)) {
            continue;
        }
        match decode_inverted_index_key(key) {
            Ok(decoded) => match String::from_utf8(decoded.doc_id) {
                Ok(id) => {
                    ids.insert(id);
                }
                Err(e) => {
                    warn!(error = %e, "skipping inverted index entry with non-UTF-8 doc id");
                }
            },
            Err(e) => {
                warn!(key = ?key, error = %e, "skipping undecodable inverted index key");
            }
        }
    }

    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexer::Indexer;
    use serde_json::json;

    fn seeded_engine() -> StorageEngine {
        let engine = StorageEngine::open_in_memory().expect("should open");
        let indexer = Indexer::new(engine.clone());
        for (id, body) in [
            ("mike", json!({"name": "mike", "age": 40, "pet": "cat"})),
            ("phil", json!({"name": "phil", "age": 30, "pet": "cat"})),
            ("funny", json!({"name": 12, "age": null, "pet": false})),
        ] {
            indexer
                .index(id, body.as_object().expect("object"))
                .expect("index");
        }
        engine
    }

    fn ids(engine: &StorageEngine, comparison: Comparison) -> Vec<String> {
        let mut found =
            search(engine, &Query::new(vec![comparison])).expect("search");
        found.sort();
        found
    }

    #[test]
    fn test_equality() {
        let engine = seeded_engine();
        assert_eq!(
            ids(&engine, Comparison::new(["name"], Op::Eq, "mike")),
            vec!["mike"]
        );
        assert_eq!(
            ids(&engine, Comparison::new(["pet"], Op::Eq, "cat")),
            vec!["mike", "phil"]
        );
        assert!(ids(&engine, Comparison::new(["name"], Op::Eq, "fred")).is_empty());
    }

    #[test]
    fn test_no_cross_type_coercion() {
        let engine = seeded_engine();
        assert_eq!(
            ids(&engine, Comparison::new(["age"], Op::Eq, 40)),
            vec!["mike"]
        );
        // The string "40" occupies a disjoint range from the number 40.
        assert!(ids(&engine, Comparison::new(["age"], Op::Eq, "40")).is_empty());
    }

    #[test]
    fn test_range_ops() {
        let engine = seeded_engine();

        // funny's age is null, below every number.
        assert_eq!(
            ids(&engine, Comparison::new(["age"], Op::Gt, 20)),
            vec!["mike", "phil"]
        );
        assert!(ids(&engine, Comparison::new(["age"], Op::Gt, 40)).is_empty());
        assert_eq!(
            ids(&engine, Comparison::new(["age"], Op::Gte, 40)),
            vec!["mike"]
        );
        assert_eq!(
            ids(&engine, Comparison::new(["age"], Op::Lt, 40)),
            vec!["funny", "phil"]
        );
        assert_eq!(
            ids(&engine, Comparison::new(["age"], Op::Lte, 40)),
            vec!["funny", "mike", "phil"]
        );
    }

    #[test]
    fn test_cross_type_ranges_follow_collation() {
        let engine = seeded_engine();

        // Strings sort above every number.
        assert_eq!(
            ids(&engine, Comparison::new(["name"], Op::Gte, 1234)),
            vec!["mike", "phil"]
        );
        // Numbers sort above booleans.
        assert_eq!(
            ids(&engine, Comparison::new(["name"], Op::Gte, true)),
            vec!["funny", "mike", "phil"]
        );
        // The path prefix confines the scan to one field.
        assert!(ids(&engine, Comparison::new(["name"], Op::Lt, 11)).is_empty());
    }

    #[test]
    fn test_conjunction_requires_every_comparison() {
        let engine = StorageEngine::open_in_memory().expect("should open");
        let indexer = Indexer::new(engine.clone());
        for (id, body) in [
            ("doc1", json!({"age": 40, "name": "mike"})),
            ("doc2", json!({"age": 24, "name": "john"})),
            ("doc3", json!({"age": 110, "name": "john"})),
        ] {
            indexer
                .index(id, body.as_object().expect("object"))
                .expect("index");
        }

        let query = Query::new(vec![
            Comparison::new(["age"], Op::Gt, 25),
            Comparison::new(["name"], Op::Eq, "john"),
        ]);
        assert_eq!(search(&engine, &query).expect("search"), vec!["doc3"]);
    }

    #[test]
    fn test_empty_conjunction_is_empty_not_match_all() {
        let engine = seeded_engine();
        assert!(search(&engine, &Query::default()).expect("search").is_empty());
    }

    #[test]
    fn test_search_on_fresh_store() {
        let engine = StorageEngine::open_in_memory().expect("should open");
        let query = Query::new(vec![Comparison::new(["name"], Op::Eq, "mike")]);
        assert!(search(&engine, &query).expect("search").is_empty());
    }

    #[test]
    fn test_unrecognised_op_fails_parse() {
        let err = "blah=".parse::<Op>().expect_err("should fail");
        assert!(matches!(err, QueryError::UnrecognizedOp { op } if op == "blah="));

        for (text, op) in [
            ("=", Op::Eq),
            (">", Op::Gt),
            (">=", Op::Gte),
            ("<", Op::Lt),
            ("<=", Op::Lte),
        ] {
            assert_eq!(text.parse::<Op>().expect("parse"), op);
        }
    }

    #[test]
    fn test_matches_agrees_with_index() {
        let engine = seeded_engine();
        let docs = [
            ("mike", json!({"name": "mike", "age": 40, "pet": "cat"})),
            ("phil", json!({"name": "phil", "age": 30, "pet": "cat"})),
            ("funny", json!({"name": 12, "age": null, "pet": false})),
        ];

        let comparisons = [
            Comparison::new(["name"], Op::Eq, "mike"),
            Comparison::new(["name"], Op::Gte, "mike"),
            Comparison::new(["name"], Op::Gte, 1234),
            Comparison::new(["name"], Op::Lt, true),
            Comparison::new(["age"], Op::Gt, 20),
            Comparison::new(["age"], Op::Lte, 40),
            Comparison::new(["pet"], Op::Eq, "cat"),
        ];

        for comparison in comparisons {
            let mut scanned: Vec<String> = docs
                .iter()
                .filter(|(_, body)| comparison.matches(body.as_object().expect("object")))
                .map(|(id, _)| id.to_string())
                .collect();
            scanned.sort();
            assert_eq!(
                ids(&engine, comparison.clone()),
                scanned,
                "index and scan disagree on {comparison:?}"
            );
        }
    }

    #[test]
    fn test_matches_missing_path_and_containers() {
        let body = json!({"a": {"b": [1, 2]}, "c": 5});
        let doc = body.as_object().expect("object");

        assert!(!Comparison::new(["missing"], Op::Eq, 1).matches(doc));
        // Arrays never match, even for range ops.
        assert!(!Comparison::new(["a", "b"], Op::Gt, 0).matches(doc));
        // Objects are traversed, not compared.
        assert!(!Comparison::new(["a"], Op::Eq, 1).matches(doc));
        assert!(Comparison::new(["c"], Op::Eq, 5).matches(doc));
    }
}
