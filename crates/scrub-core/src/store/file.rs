//! JSON file record store
//!
//! Holds a JSON array of `{"id": "...", "field": "..." | null}` rows. The
//! file is read once into a [`MemoryStore`]; updates stay in memory until
//! [`FileStore::persist`] replaces the file atomically.

use super::{MemoryStore, RecordStore};
use crate::error::StoreError;
use crate::types::{Record, RecordId};
use std::path::{Path, PathBuf};

/// Record store backed by a JSON file
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    inner: MemoryStore,
}

impl FileStore {
    /// Load records from `path`
    ///
    /// # Errors
    /// - `StoreError::Io` if the file cannot be read
    /// - `StoreError::Format` if it is not a JSON array of records
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let text = std::fs::read_to_string(&path).map_err(|e| StoreError::io_error(&path, e))?;
        let records: Vec<Record> =
            serde_json::from_str(&text).map_err(|source| StoreError::Format {
                path: path.clone(),
                source,
            })?;
        tracing::debug!(path = %path.display(), records = records.len(), "loaded record file");
        Ok(Self {
            path,
            inner: MemoryStore::with_records(records),
        })
    }

    /// Path of the backing file
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// In-memory view of the records
    #[inline]
    #[must_use]
    pub fn records(&self) -> &MemoryStore {
        &self.inner
    }

    /// Write the current records back to the file
    ///
    /// Writes a sibling temp file and renames it over the original, so a
    /// crash leaves either the old or the new content.
    ///
    /// # Errors
    /// `StoreError::Io` if writing or renaming fails
    pub fn persist(&self) -> Result<(), StoreError> {
        let records = self.inner.snapshot();
        let mut json = serde_json::to_string_pretty(&records).map_err(|source| {
            StoreError::Format {
                path: self.path.clone(),
                source,
            }
        })?;
        json.push('\n');

        let mut tmp_name = self
            .path
            .file_name()
            .map(std::ffi::OsStr::to_os_string)
            .unwrap_or_default();
        tmp_name.push(".tmp");
        let tmp = self.path.with_file_name(tmp_name);

        std::fs::write(&tmp, json).map_err(|e| StoreError::io_error(&tmp, e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| StoreError::io_error(&self.path, e))?;
        tracing::debug!(path = %self.path.display(), records = records.len(), "persisted record file");
        Ok(())
    }
}

#[async_trait::async_trait]
impl RecordStore for FileStore {
    async fn fetch_page(
        &self,
        after: Option<&RecordId>,
        limit: usize,
    ) -> Result<Vec<Record>, StoreError> {
        self.inner.fetch_page(after, limit).await
    }

    async fn update_field(&self, id: &RecordId, new_raw: &str) -> Result<(), StoreError> {
        self.inner.update_field(id, new_raw).await
    }
}
