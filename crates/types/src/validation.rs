//! Ingest validation for keys that enter the index.
//!
//! The index key grammar reserves two bytes: `0x00` separates key
//! components, and `0x01` is the sentinel appended to form exclusive upper
//! bounds for range scans. Inputs that would collide with either byte are
//! rejected here, at the ingest boundary, before any key is built.
//!
//! ## Rules
//!
//! - Document ids: non-empty, no `0x00` byte.
//! - Path segments (object keys): non-empty, no `0x00`, no `0x01`.
//! - String values destined for the index: no `0x00` byte (the tagged
//!   encoding keeps raw string bytes so that keys collate naturally, which
//!   makes an embedded separator unrepresentable).

use std::fmt;

/// Validation error with structured context.
///
/// Contains the specific constraint that was violated and the field name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// The field that failed validation.
    pub field: String,
    /// Description of the violated constraint.
    pub constraint: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.constraint)
    }
}

impl std::error::Error for ValidationError {}

/// Validates a document id.
///
/// Ids must be non-empty and must not contain the `0x00` separator byte.
///
/// # Errors
///
/// Returns [`ValidationError`] if the id is empty or contains `0x00`.
pub fn validate_doc_id(id: &str) -> Result<(), ValidationError> {
    if id.is_empty() {
        return Err(ValidationError {
            field: "id".to_string(),
            constraint: "must not be empty".to_string(),
        });
    }
    if let Some(pos) = id.bytes().position(|b| b == 0x00) {
        return Err(ValidationError {
            field: "id".to_string(),
            constraint: format!("contains reserved byte 0x00 at offset {pos}"),
        });
    }
    Ok(())
}

/// Validates a single path segment (an object key on the route to a leaf).
///
/// Segments must be non-empty and must not contain the reserved bytes
/// `0x00` (component separator) or `0x01` (upper-bound sentinel).
///
/// # Errors
///
/// Returns [`ValidationError`] if the segment is empty or contains a
/// reserved byte.
pub fn validate_path_segment(segment: &str) -> Result<(), ValidationError> {
    if segment.is_empty() {
        return Err(ValidationError {
            field: "path".to_string(),
            constraint: "segment must not be empty".to_string(),
        });
    }
    if let Some(pos) = segment.bytes().position(|b| b == 0x00 || b == 0x01) {
        let byte = segment.as_bytes()[pos];
        return Err(ValidationError {
            field: "path".to_string(),
            constraint: format!(
                "segment {segment:?} contains reserved byte {byte:#04x} at offset {pos}"
            ),
        });
    }
    Ok(())
}

/// Validates a string value that will be written to the index under `path`.
///
/// # Errors
///
/// Returns [`ValidationError`] if the string contains `0x00`.
pub fn validate_string_value(path: &str, value: &str) -> Result<(), ValidationError> {
    if let Some(pos) = value.bytes().position(|b| b == 0x00) {
        return Err(ValidationError {
            field: "value".to_string(),
            constraint: format!("string at path {path:?} contains byte 0x00 at offset {pos}"),
        });
    }
    Ok(())
}
