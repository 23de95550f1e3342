//! Error types for the statistics engine.
//!
//! The group store and the aggregation pipeline report typed errors.
//! The CLI layer wraps them in `anyhow` with context.

use thiserror::Error as ThisError;

/// Errors raised by [`crate::store::GroupStore`] path operations.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum StoreError {
    /// The path was empty.
    #[error("path must contain at least one key")]
    InvalidPath,

    /// A segment of the path does not exist.
    #[error("no value stored at path {path}")]
    KeyNotFound { path: String },

    /// An intermediate node holds a value and restructuring was not allowed.
    #[error("path {path} is blocked by a stored value")]
    PathBlocked { path: String },
}

/// Errors raised while turning records into ranked statistics.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum StatsError {
    /// An input row is missing a required field or cannot be decoded.
    #[error("malformed input at line {line}: {reason}")]
    MalformedInput { line: u64, reason: String },

    /// A (border, measure) series has no periods.
    #[error("series {border} / {measure} has no periods")]
    EmptySeries { border: String, measure: String },

    /// A group sum no longer fits in a `u64`.
    #[error("sum for {border} / {measure} at {period} overflows")]
    Overflow {
        border: String,
        measure: String,
        period: String,
    },

    /// Merging shard results hit locked subtrees.
    #[error("{rejected} group sums were rejected by locked shard subtrees")]
    ShardConflict { rejected: usize },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl StatsError {
    pub fn malformed(line: u64, reason: impl Into<String>) -> Self {
        StatsError::MalformedInput {
            line,
            reason: reason.into(),
        }
    }
}

/// Render a key path for error messages.
pub(crate) fn describe_path<K: std::fmt::Display>(path: &[K]) -> String {
    let parts: Vec<String> = path.iter().map(|k| k.to_string()).collect();
    format!("[{}]", parts.join(" / "))
}
