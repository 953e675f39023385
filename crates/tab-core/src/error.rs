//! Error types for tab-core

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in tab-core
#[derive(Debug, Error)]
pub enum Error {
    /// A column key appears twice in a header or key list
    #[error("duplicate column key '{0}'")]
    DuplicateColumn(String),

    /// A row key appears twice in a source or key list
    #[error("duplicate row key '{0}'")]
    DuplicateRow(String),

    /// A data line has the wrong number of fields
    #[error("row size inconsistent in line {line}: expected {expected} fields, found {found}")]
    RowSize {
        line: u64,
        expected: usize,
        found: usize,
    },

    /// The input holds nothing but comments and blank lines
    #[error("no header line found")]
    MissingHeader,

    /// A positional row/column assignment does not cover every key
    #[error("expected {expected} values, found {found}")]
    LengthMismatch { expected: usize, found: usize },

    /// Field separators and comment markers must be single-byte ASCII
    #[error("invalid separator {0:?}: must be a single ASCII character")]
    InvalidSeparator(char),

    /// A required column is absent from a layer's edge file
    #[error("cannot find {role} column '{column}' in {path}")]
    MissingColumn {
        role: &'static str,
        column: String,
        path: PathBuf,
    },

    /// A merge plan lists no input tables
    #[error("merge plan has no inputs")]
    EmptyPlan,

    /// Failed to read a file
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write a file
    #[error("failed to write file '{path}': {source}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error from the csv reader
    #[error("malformed input: {0}")]
    Csv(#[from] csv::Error),

    /// Directory traversal error
    #[error("failed to traverse directory: {0}")]
    WalkDir(#[from] walkdir::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
