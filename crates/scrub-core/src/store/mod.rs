//! Storage boundary
//!
//! The engine needs exactly two operations from a backend: a filtered,
//! keyset-paginated read of rows whose target field is non-null, and a
//! keyed update by record id. SQL tables, document stores and key-value
//! stores can all provide them.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::error::StoreError;
use crate::types::{Record, RecordId};

/// Record store trait
///
/// Implement this trait to run a scrub against a backend.
#[async_trait::async_trait]
pub trait RecordStore: Send + Sync {
    /// Fetch up to `limit` records with a non-null target field
    ///
    /// Records are ordered by id ascending and start strictly after
    /// `after`. An empty page means the scan is complete.
    async fn fetch_page(
        &self,
        after: Option<&RecordId>,
        limit: usize,
    ) -> Result<Vec<Record>, StoreError>;

    /// Replace the target field of one record
    ///
    /// # Errors
    /// `StoreError::NotFound` if no record has `id`
    async fn update_field(&self, id: &RecordId, new_raw: &str) -> Result<(), StoreError>;
}
