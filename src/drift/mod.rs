//! # Drift & Late-Init Engine
//!
//! Structural comparison between a declared spec and an observed remote
//! object. Both sides are serialized to JSON trees and walked by a small
//! interpreter, so any `Serialize` type can take part without per-type code.
//!
//! - [`late_initialize`] copies server-defaulted fields from observed into
//!   empty declared fields, never overwriting a value the user set.
//! - [`is_up_to_date`] projects the observed object onto the declared shape
//!   and reports up-to-date iff the merge patch towards declared is empty.
//! - [`policy`] compares IAM-style JSON policy documents semantically.
//!
//! Arrays are matched and ordered by natural keys (`id`, `arn`,
//! `pathPattern`, `errorCode`, `headerName`, `lambdaFunctionArn` unless a
//! path overrides them).

mod compare;
mod late_init;
mod names;
pub mod policy;

pub use compare::{canonical_string, is_up_to_date, merge_patch, project, DiffOptions};
pub use late_init::{late_initialize, late_initialize_typed};
pub use names::{LateInitOptions, NameFilter, NameMapper, DEFAULT_NATURAL_KEYS};

use thiserror::Error;

/// Failures of the structural walker
#[derive(Debug, Error)]
pub enum DriftError {
    /// Declared and observed disagree on the JSON kind of a field
    #[error("type mismatch at {path}: declared {declared}, observed {observed}")]
    TypeMismatch {
        path: String,
        declared: &'static str,
        observed: &'static str,
    },

    /// The root of either side is not an object
    #[error("unsupported shape: {0}")]
    UnsupportedShape(String),

    /// A policy document could not be decoded or parsed
    #[error("invalid policy document: {0}")]
    InvalidDocument(String),

    #[error("cannot convert between declared and observed shapes: {0}")]
    Serde(#[from] serde_json::Error),
}

/// JSON kind of a value, used in mismatch reports
pub(crate) fn kind_of(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

/// Null, and zero-length collections, count as empty
pub(crate) fn is_empty(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => true,
        serde_json::Value::Array(items) => items.is_empty(),
        serde_json::Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

pub(crate) fn join_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}.{name}")
    }
}
