//! Key packing for the index namespaces.
//!
//! Both index namespaces live in one ordered table and are distinguished by
//! their leading byte. Components are joined by the reserved `0x00`
//! separator; `0x01` is the sentinel appended in place of a separator to
//! form exclusive upper bounds for range scans (it sorts immediately above
//! the separator, and never occurs inside a path).
//!
//! - Inverted: `i 00 {path} 00 {tagged_value} 00 {doc_id}` — ordered by
//!   `(path, value, id)`, which is what range queries scan.
//! - Forward: `f 00 {doc_id} 00 {path} 00 {tagged_value}` — ordered by id,
//!   which is what unindexing scans.

use snafu::{OptionExt, Snafu};

use jotdb_types::Scalar;

use crate::encoding::{
    encode_tagged, NUMBER_PAYLOAD_LEN, TAG_FALSE, TAG_NULL, TAG_NUMBER, TAG_STRING, TAG_TRUE,
};

/// Namespace byte for the inverted index.
pub const NS_INVERTED: u8 = b'i';
/// Namespace byte for the forward index.
pub const NS_FORWARD: u8 = b'f';
/// Separator byte between key components.
pub const SEP: u8 = 0x00;
/// Sentinel one above the separator, used to build exclusive upper bounds.
pub const UPPER_SENTINEL: u8 = 0x01;

/// Errors from decoding index keys read back from the store.
///
/// Decode errors are never fatal to a scan; callers log the offending
/// entry and continue.
#[derive(Debug, Snafu)]
pub enum KeyError {
    #[snafu(display("Invalid namespace prefix {prefix:02x?} for index key"))]
    Namespace { prefix: Vec<u8> },

    #[snafu(display("No path component in inverted index key"))]
    MissingPath,

    #[snafu(display("No value component in inverted index key"))]
    MissingValue,

    #[snafu(display("Unrecognised value tag {tag:#04x} in inverted index key"))]
    UnknownTag { tag: u8 },

    #[snafu(display("Truncated number payload ({len} of {NUMBER_PAYLOAD_LEN} bytes)"))]
    TruncatedNumber { len: usize },

    #[snafu(display("String value missing its terminating separator"))]
    UnterminatedString,

    #[snafu(display("Missing separator between value and doc id"))]
    MissingValueSeparator,

    #[snafu(display("Forward index key has only {count} components"))]
    ForwardComponents { count: usize },
}

/// Decoded inverted index key components.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvertedKey {
    /// Dotted path of the indexed leaf.
    pub path: Vec<u8>,
    /// Tagged value bytes, tag included.
    pub tagged_value: Vec<u8>,
    /// Owning document id.
    pub doc_id: Vec<u8>,
}

/// Decoded forward index key components.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardKey {
    /// Owning document id.
    pub doc_id: Vec<u8>,
    /// Dotted path of the indexed leaf.
    pub path: Vec<u8>,
    /// Tagged value bytes, tag included.
    pub tagged_value: Vec<u8>,
}

/// Packs an inverted index key.
///
/// Supplying `tagged_value: None` truncates the key immediately after the
/// path; supplying `doc_id: None` truncates after the value. The truncated
/// forms are the prefixes that the range-boundary builders extend, so the
/// one function produces both full keys and scan bounds.
///
/// Supplying a `doc_id` without a `tagged_value` is a programmer error.
pub fn encode_inverted_index_key(
    path: &[u8],
    tagged_value: Option<&[u8]>,
    doc_id: Option<&[u8]>,
) -> Vec<u8> {
    debug_assert!(
        tagged_value.is_some() || doc_id.is_none(),
        "doc_id requires tagged_value"
    );

    let mut key = Vec::with_capacity(
        4 + path.len()
            + tagged_value.map_or(0, <[u8]>::len)
            + doc_id.map_or(0, <[u8]>::len),
    );
    key.push(NS_INVERTED);
    key.push(SEP);
    key.extend_from_slice(path);
    if let Some(value) = tagged_value {
        key.push(SEP);
        key.extend_from_slice(value);
        if let Some(id) = doc_id {
            key.push(SEP);
            key.extend_from_slice(id);
        }
    }
    key
}

/// Packs a forward index key: `f 00 {doc_id} 00 {path} 00 {tagged_value}`.
pub fn encode_forward_index_key(doc_id: &[u8], path: &[u8], tagged_value: &[u8]) -> Vec<u8> {
    let mut key = Vec::with_capacity(4 + doc_id.len() + path.len() + tagged_value.len());
    key.push(NS_FORWARD);
    key.push(SEP);
    key.extend_from_slice(doc_id);
    key.push(SEP);
    key.extend_from_slice(path);
    key.push(SEP);
    key.extend_from_slice(tagged_value);
    key
}

/// Unpacks an inverted index key into its components.
///
/// The shared separator is ambiguous on its own because number payloads may
/// contain `0x00`: the value tag directs the split. Null and booleans are a
/// lone tag byte, numbers are tag plus a fixed 8-byte payload, and strings
/// extend to the next separator.
pub fn decode_inverted_index_key(key: &[u8]) -> Result<InvertedKey, KeyError> {
    if key.len() < 2 || key[0] != NS_INVERTED || key[1] != SEP {
        return NamespaceSnafu {
            prefix: key.iter().take(2).copied().collect::<Vec<u8>>(),
        }
        .fail();
    }
    let rest = &key[2..];

    // path
    let sep_at = rest
        .iter()
        .position(|&b| b == SEP)
        .context(MissingPathSnafu)?;
    let path = rest[..sep_at].to_vec();
    let rest = &rest[sep_at + 1..];

    // value, split according to the tag
    let tag = *rest.first().context(MissingValueSnafu)?;
    let (tagged_value, rest) = match tag {
        TAG_NULL | TAG_FALSE | TAG_TRUE => (rest[..1].to_vec(), &rest[1..]),
        TAG_NUMBER => {
            if rest.len() < 1 + NUMBER_PAYLOAD_LEN {
                return TruncatedNumberSnafu { len: rest.len() - 1 }.fail();
            }
            (
                rest[..1 + NUMBER_PAYLOAD_LEN].to_vec(),
                &rest[1 + NUMBER_PAYLOAD_LEN..],
            )
        }
        TAG_STRING => {
            let end = rest[1..]
                .iter()
                .position(|&b| b == SEP)
                .context(UnterminatedStringSnafu)?;
            (rest[..1 + end].to_vec(), &rest[1 + end..])
        }
        other => return UnknownTagSnafu { tag: other }.fail(),
    };

    // doc id, after one more separator
    if rest.first() != Some(&SEP) {
        return MissingValueSeparatorSnafu.fail();
    }
    let doc_id = rest[1..].to_vec();

    Ok(InvertedKey {
        path,
        tagged_value,
        doc_id,
    })
}

/// Unpacks a forward index key by splitting on the first three separators.
///
/// The tagged value is the unsplit remainder: a number payload may itself
/// contain `0x00`, so only the first three separators are structural.
pub fn decode_forward_index_key(key: &[u8]) -> Result<ForwardKey, KeyError> {
    let mut parts = key.splitn(4, |&b| b == SEP);
    let namespace = parts.next().unwrap_or_default();
    if namespace != [NS_FORWARD] {
        return NamespaceSnafu {
            prefix: key.iter().take(2).copied().collect::<Vec<u8>>(),
        }
        .fail();
    }

    let components: Vec<&[u8]> = parts.collect();
    if components.len() != 3 {
        return ForwardComponentsSnafu {
            count: 1 + components.len(),
        }
        .fail();
    }

    Ok(ForwardKey {
        doc_id: components[0].to_vec(),
        path: components[1].to_vec(),
        tagged_value: components[2].to_vec(),
    })
}

/// Bounds of the forward slice for one document: `[f 00 id, f 00 id 01)`.
///
/// The sentinel end key sorts above every `f 00 id 00 ...` entry and below
/// the slice of any id that merely extends this one.
pub fn forward_range_bounds(doc_id: &[u8]) -> (Vec<u8>, Vec<u8>) {
    let mut start = Vec::with_capacity(3 + doc_id.len());
    start.push(NS_FORWARD);
    start.push(SEP);
    start.extend_from_slice(doc_id);

    let mut end = start.clone();
    end.push(UPPER_SENTINEL);
    (start, end)
}

/// Inclusive lower bound covering every value under `path`.
pub fn path_start_key(path: &[u8]) -> Vec<u8> {
    let mut key = encode_inverted_index_key(path, None, None);
    key.push(SEP);
    key
}

/// Exclusive upper bound just beyond every value under `path`.
///
/// Places the sentinel where the separator would be; relies on paths never
/// containing `0x01`.
pub fn path_end_key(path: &[u8]) -> Vec<u8> {
    let mut key = encode_inverted_index_key(path, None, None);
    key.push(UPPER_SENTINEL);
    key
}

/// Inclusive lower bound for the entries of exactly `(path, value)`.
pub fn path_value_start_key(path: &[u8], value: &Scalar) -> Vec<u8> {
    encode_inverted_index_key(path, Some(&encode_tagged(value)), None)
}

/// Exclusive upper bound covering the entries of exactly `(path, value)`
/// across all doc ids.
pub fn path_value_end_key(path: &[u8], value: &Scalar) -> Vec<u8> {
    let mut key = path_value_start_key(path, value);
    key.push(UPPER_SENTINEL);
    key
}
