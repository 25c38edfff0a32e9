//! Path extraction: flattening a document into indexable pairs.
//!
//! A document is a tree of string-keyed objects. Each scalar leaf becomes a
//! `(dotted path, tagged value)` pair; nested objects contribute their keys
//! to the path, and arrays are skipped entirely (array-valued fields are
//! not indexed).

use serde_json::{Map, Value};

use jotdb_types::{validate_path_segment, validate_string_value, Scalar, ValidationError};

use crate::encoding::encode_tagged;

/// One indexable leaf of a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathValue {
    /// Dotted path to the leaf.
    pub path: String,
    /// Tagged value bytes, tag included.
    pub tagged_value: Vec<u8>,
}

/// Flattens a document into its `(path, tagged value)` pairs.
///
/// Traversal order is unspecified; callers must not rely on it. Paths are
/// only ever joined with `.`, never split, so `{"a.b": 1}` and
/// `{"a": {"b": 1}}` flatten identically — queries cannot distinguish them
/// (a documented non-goal; there is no escaping scheme).
///
/// # Errors
///
/// Returns [`ValidationError`] for inputs the key grammar cannot represent:
/// empty object keys, keys containing `0x00` or `0x01`, and string values
/// containing `0x00`. These are fatal to the whole call; nothing is
/// partially emitted.
pub fn flatten(doc: &Map<String, Value>) -> Result<Vec<PathValue>, ValidationError> {
    let mut pairs = Vec::new();
    flatten_into(doc, "", &mut pairs)?;
    Ok(pairs)
}

fn flatten_into(
    obj: &Map<String, Value>,
    prefix: &str,
    pairs: &mut Vec<PathValue>,
) -> Result<(), ValidationError> {
    for (key, value) in obj {
        validate_path_segment(key)?;
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };

        match value {
            Value::Object(nested) => flatten_into(nested, &path, pairs)?,
            Value::Array(_) => {} // array fields are not indexed
            _ => {
                if let Value::String(s) = value {
                    validate_string_value(&path, s)?;
                }
                // from_json cannot fail here: containers are handled above
                let Some(scalar) = Scalar::from_json(value) else {
                    continue;
                };
                pairs.push(PathValue {
                    path,
                    tagged_value: encode_tagged(&scalar),
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn flatten_value(doc: serde_json::Value) -> Vec<PathValue> {
        let obj = doc.as_object().expect("object");
        let mut pairs = flatten(obj).expect("flatten");
        pairs.sort_by(|a, b| a.path.cmp(&b.path));
        pairs
    }

    #[test]
    fn test_flat_document() {
        let pairs = flatten_value(json!({"name": "mike", "age": 40, "ok": true}));
        let paths: Vec<&str> = pairs.iter().map(|p| p.path.as_str()).collect();
        assert_eq!(paths, vec!["age", "name", "ok"]);
    }

    #[test]
    fn test_nested_paths_join_with_dots() {
        let pairs = flatten_value(json!({"a": {"b": {"c": 1}}, "d": null}));
        let paths: Vec<&str> = pairs.iter().map(|p| p.path.as_str()).collect();
        assert_eq!(paths, vec!["a.b.c", "d"]);
    }

    #[test]
    fn test_arrays_are_skipped() {
        let pairs = flatten_value(json!({
            "tags": ["a", "b"],
            "nested": {"list": [1, 2], "kept": "yes"},
        }));
        let paths: Vec<&str> = pairs.iter().map(|p| p.path.as_str()).collect();
        assert_eq!(paths, vec!["nested.kept"]);
    }

    #[test]
    fn test_dotted_key_aliases_nested_path() {
        // No escaping: both shapes produce the same pair.
        let a = flatten_value(json!({"a.b": 1}));
        let b = flatten_value(json!({"a": {"b": 1}}));
        assert_eq!(a, b);
    }

    #[test]
    fn test_tagged_values_match_encoding() {
        let pairs = flatten_value(json!({"age": 40}));
        assert_eq!(pairs[0].tagged_value, encode_tagged(&Scalar::Number(40.0)));
    }

    #[test]
    fn test_rejects_reserved_bytes() {
        let doc = json!({"bad\u{00}key": 1});
        assert!(flatten(doc.as_object().expect("object")).is_err());

        let doc = json!({"ok": "nul\u{00}value"});
        assert!(flatten(doc.as_object().expect("object")).is_err());

        let doc = json!({"": 1});
        assert!(flatten(doc.as_object().expect("object")).is_err());
    }

    #[test]
    fn test_empty_document() {
        let pairs = flatten_value(json!({}));
        assert!(pairs.is_empty());
    }
}
