//! Error types for the lineage engine.

use crate::facts::ColumnKey;

/// Result type for lineage operations.
pub type LineageResult<T> = Result<T, LineageError>;

/// Errors raised while normalizing facts or rebuilding flattened rows.
///
/// Missing facts, cycles and unmatched reporting-side columns are not errors;
/// they shape the tree instead.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LineageError {
    /// Two raw facts normalize to the same `(model, column)` key.
    #[error("Duplicate lineage fact for '{key}': '{first}' and '{second}' normalize to the same key")]
    DuplicateFact {
        key: ColumnKey,
        first: String,
        second: String,
    },

    /// Upstream table and column lists differ in length (strict mode only).
    #[error("Upstream lists for '{key}' differ in length: {tables} table(s) vs {columns} column(s)")]
    UpstreamListMismatch {
        key: ColumnKey,
        tables: usize,
        columns: usize,
    },

    /// Flattened rows do not describe a single well-formed tree.
    #[error("Malformed lineage rows at row {row}: {reason}")]
    MalformedRows { row: usize, reason: String },
}
