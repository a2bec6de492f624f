//! Error types for the feature pipeline
//!
//! Per-document data problems never surface here: bad text tokenizes to
//! nothing and unknown terms are skipped. What remains are caller misuse
//! (mixing matrices and vocabularies) and I/O around persistence.

use std::io;
use thiserror::Error;

/// Result type alias for wordbag operations
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Matrix column count differs from the vocabulary size
    #[error("dimension mismatch: vocabulary has {expected} terms, matrix has {actual} columns")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Matrix was encoded against a different vocabulary of the same size
    #[error("vocabulary mismatch: expected fingerprint {expected:#018x}, matrix carries {actual:#018x}")]
    VocabularyMismatch { expected: u64, actual: u64 },

    /// Labels and matrix rows are not aligned
    #[error("label count mismatch: {rows} matrix rows, {labels} labels")]
    LabelCountMismatch { rows: usize, labels: usize },

    #[error("invalid parameters: {0}")]
    InvalidParams(String),

    /// Corpus record that could not be parsed
    #[error("malformed record on line {line}: {source}")]
    MalformedRecord {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Binary matrix payload is truncated or inconsistent
    #[error("codec error: {0}")]
    Codec(String),
}
