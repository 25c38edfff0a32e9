//! Indexable scalar values.
//!
//! JSON documents are trees of string-keyed objects whose leaves are scalars.
//! Only scalars reach the index; arrays and nested objects are handled by the
//! path extractor (objects are flattened into dotted paths, arrays skipped).

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A scalar leaf value of a document.
///
/// This is a closed sum: arrays and objects are rejected at the type
/// boundary by [`Scalar::from_json`] returning `None`. Numbers are carried
/// as `f64`, matching JSON ingest precision.
///
/// The collation across kinds is `null < false < true < number < string`,
/// realized by the tagged byte encoding in the storage layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    /// JSON `null`.
    Null,
    /// JSON `true` / `false`.
    Bool(bool),
    /// JSON number, as a double.
    Number(f64),
    /// JSON string.
    Str(String),
}

impl Scalar {
    /// Converts a JSON value to a scalar.
    ///
    /// Returns `None` for arrays and objects, which are not scalars and are
    /// never indexed directly.
    pub fn from_json(value: &Value) -> Option<Scalar> {
        match value {
            Value::Null => Some(Scalar::Null),
            Value::Bool(b) => Some(Scalar::Bool(*b)),
            Value::Number(n) => n.as_f64().map(Scalar::Number),
            Value::String(s) => Some(Scalar::Str(s.clone())),
            Value::Array(_) | Value::Object(_) => None,
        }
    }

    /// Human-readable kind name, for error messages and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Scalar::Null => "null",
            Scalar::Bool(_) => "boolean",
            Scalar::Number(_) => "number",
            Scalar::Str(_) => "string",
        }
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar::Bool(value)
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Number(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Number(value as f64)
    }
}

impl From<i32> for Scalar {
    fn from(value: i32) -> Self {
        Scalar::Number(f64::from(value))
    }
}

impl From<u64> for Scalar {
    fn from(value: u64) -> Self {
        Scalar::Number(value as f64)
    }
}

impl From<u32> for Scalar {
    fn from(value: u32) -> Self {
        Scalar::Number(f64::from(value))
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Str(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::Str(value)
    }
}
