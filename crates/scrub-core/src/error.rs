//! Error types for Scrub Core
//!
//! Provides error handling for:
//! - Decoding a record's target field (recovered locally, never fatal)
//! - Storage reads and keyed writes
//! - Configuration loading
//! - Batch write aborts
//! - Refused reversals

use crate::runner::RunSummary;
use crate::types::RecordId;
use std::path::PathBuf;

/// Main Scrub error type
#[derive(Debug, thiserror::Error)]
pub enum ScrubError {
    /// Candidate scan failed before any write was issued
    #[error("scan failed: {0}")]
    Scan(#[source] StoreError),

    /// A batch failed; earlier batches remain committed
    #[error("{failure}")]
    BatchWrite {
        /// Failure details
        #[source]
        failure: BatchWriteFailure,
        /// Summary of the aborted run
        summary: Box<RunSummary>,
    },

    /// Reverse operation requested for a destructive transformation
    #[error("reversal not supported: {reason}")]
    UnsupportedReversal {
        /// Operator-facing explanation
        reason: String,
    },

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Serializing a projected field failed
    #[error("encode failed for record {id}: {source}")]
    Encode {
        /// Record being encoded
        id: RecordId,
        /// Underlying serializer error
        #[source]
        source: serde_json::Error,
    },
}

impl ScrubError {
    /// Check if re-running `apply()` is a sensible recovery
    ///
    /// Runs are convergent, so anything caused by storage is retryable.
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Scan(_) | Self::BatchWrite { .. })
    }

    /// Summary attached to an aborted run, if any
    #[must_use]
    pub fn summary(&self) -> Option<&RunSummary> {
        match self {
            Self::BatchWrite { summary, .. } => Some(&**summary),
            _ => None,
        }
    }
}

/// Reasons a target field cannot be decoded
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// Text is not valid JSON
    #[error("malformed syntax at line {line}, column {column}: {message}")]
    MalformedSyntax {
        /// 1-based line of the failure
        line: usize,
        /// 1-based column of the failure
        column: usize,
        /// Parser message
        message: String,
    },

    /// Valid JSON whose top level is not an object
    #[error("expected a JSON object, found {found}")]
    NotAnObject {
        /// JSON type that was found
        found: &'static str,
    },
}

impl From<serde_json::Error> for DecodeError {
    fn from(err: serde_json::Error) -> Self {
        Self::MalformedSyntax {
            line: err.line(),
            column: err.column(),
            message: err.to_string(),
        }
    }
}

/// Storage boundary errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Keyed update targeted a missing record
    #[error("record not found: {0}")]
    NotFound(RecordId),

    /// Backend temporarily unreachable
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Backend rejected the operation
    #[error("store backend error: {0}")]
    Backend(String),

    /// IO error on a file-backed store
    #[error("io error on {path}: {source}")]
    Io {
        /// File being read or written
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// File-backed store content is not a valid record list
    #[error("invalid record file {path}: {source}")]
    Format {
        /// File being read
        path: PathBuf,
        /// Underlying parse error
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Allow-list must name at least one key
    #[error("allow-list is empty")]
    EmptyAllowList,

    /// Batch and page sizes must be positive
    #[error("{field} must be a positive integer")]
    ZeroSize {
        /// Offending setting
        field: &'static str,
    },

    /// TOML could not be parsed
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// IO error while reading the config file
    #[error("io error reading {path}: {source}")]
    Io {
        /// Config path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}

/// A batch whose updates did not all commit
///
/// Every update in the failing batch was awaited; `failures` lists each
/// one that failed. Batches before `batch_index` are committed, batches
/// after it were never issued.
#[derive(Debug, thiserror::Error)]
#[error(
    "batch {} of {total_batches} failed ({} of its updates); aborted after committing {committed_batches} of {total_batches} batches",
    .batch_index + 1,
    .failures.len()
)]
pub struct BatchWriteFailure {
    /// Zero-based index of the failing batch
    pub batch_index: usize,
    /// Batches fully committed before the failure
    pub committed_batches: usize,
    /// Batches the run was partitioned into
    pub total_batches: usize,
    /// Records written by the committed batches
    pub committed_records: usize,
    /// Records written successfully inside the failing batch
    pub partial_records: usize,
    /// Every failed update of the failing batch
    pub failures: Vec<(RecordId, StoreError)>,
}

impl BatchWriteFailure {
    /// First failure of the batch, in batch order
    #[must_use]
    pub fn first(&self) -> Option<&(RecordId, StoreError)> {
        self.failures.first()
    }
}
