//! Core types and ingest validation for JotDB.
//!
//! This crate provides the foundational types used throughout the database:
//! - The [`Scalar`] sum type for indexable JSON leaf values
//! - Ingest validation for document ids, path segments, and string payloads

pub mod scalar;
pub mod validation;

// Re-export commonly used types at crate root
pub use scalar::Scalar;
pub use validation::{
    validate_doc_id, validate_path_segment, validate_string_value, ValidationError,
};
