//! Scrub Core - batched allow-list minimization
//!
//! Rewrites a semi-structured (JSON) field across a large set of records so
//! that only allow-listed keys survive:
//! - Scans candidate records page by page
//! - Decodes and classifies each field (clean, malformed, needs rewrite)
//! - Projects fields onto the allow-list with an explicit coercion rule
//! - Commits updates in bounded, internally concurrent batches
//! - Reports progress through an injected reporter
//!
//! The transformation is lossy by design; `revert()` always refuses.
//!
//! # Example
//!
//! ```rust,ignore
//! use scrub_core::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(MemoryStore::with_records([
//!     Record::new("1", r#"{"country":"US","ip":"1.2.3.4"}"#),
//! ]));
//! let migration = ScrubMigration::with_tracing(store, ScrubConfig::new());
//!
//! let summary = migration.apply().await?;
//! println!("{}", summary.describe());
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]

// Core modules
pub mod batch;
pub mod config;
pub mod decode;
pub mod error;
pub mod policy;
pub mod report;
pub mod runner;
pub mod scanner;
pub mod store;
pub mod types;

// Re-exports for convenience
pub use batch::{partition, BatchProgress, BatchWriter, CommitReport};
pub use config::ScrubConfig;
pub use decode::{classify, decode, Classification, DecodedField, FieldValue};
pub use error::{BatchWriteFailure, ConfigError, DecodeError, ScrubError, StoreError};
pub use policy::{AllowedKeySet, FalsyCoercion, ProjectedField, TransformPolicy};
pub use report::{NullReporter, Reporter, ScrubEvent, Severity, TracingReporter};
pub use runner::{Plan, RunStatus, RunSummary, ScrubMigration};
pub use scanner::{Candidate, RecordScanner};
pub use store::{FileStore, MemoryStore, RecordStore};
pub use types::{PendingUpdate, Record, RecordId, RunId};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with Scrub Core
    pub use crate::{
        AllowedKeySet, FalsyCoercion, MemoryStore, Record, RecordId, RecordStore, Reporter,
        RunStatus, RunSummary, ScrubConfig, ScrubError, ScrubEvent, ScrubMigration,
        TracingReporter,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
