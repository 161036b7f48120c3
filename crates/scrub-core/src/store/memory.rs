//! In-memory record store
//!
//! Ordered map behind a mutex. Null fields are kept so the scan
//! precondition is observable in tests and dry runs.

use super::RecordStore;
use crate::error::StoreError;
use crate::types::{Record, RecordId};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::ops::Bound;

/// Record store held entirely in memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    rows: Mutex<BTreeMap<RecordId, Option<String>>>,
    writes: Mutex<u64>,
}

impl MemoryStore {
    /// Create an empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding `records`; later duplicates replace earlier ones
    #[must_use]
    pub fn with_records(records: impl IntoIterator<Item = Record>) -> Self {
        let store = Self::new();
        store.insert_all(records);
        store
    }

    /// Insert or replace records
    pub fn insert_all(&self, records: impl IntoIterator<Item = Record>) {
        let mut rows = self.rows.lock();
        for record in records {
            rows.insert(record.id, record.raw_field);
        }
    }

    /// Current target field of `id`; `None` if the record does not exist
    #[must_use]
    pub fn get(&self, id: &RecordId) -> Option<Option<String>> {
        self.rows.lock().get(id).cloned()
    }

    /// All records, ordered by id
    #[must_use]
    pub fn snapshot(&self) -> Vec<Record> {
        self.rows
            .lock()
            .iter()
            .map(|(id, raw_field)| Record {
                id: id.clone(),
                raw_field: raw_field.clone(),
            })
            .collect()
    }

    /// Number of records, including those with a null field
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.lock().len()
    }

    /// Whether the store holds no records
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.lock().is_empty()
    }

    /// Successful `update_field` calls since creation
    #[must_use]
    pub fn write_count(&self) -> u64 {
        *self.writes.lock()
    }
}

#[async_trait::async_trait]
impl RecordStore for MemoryStore {
    async fn fetch_page(
        &self,
        after: Option<&RecordId>,
        limit: usize,
    ) -> Result<Vec<Record>, StoreError> {
        let rows = self.rows.lock();
        let lower = after.map_or(Bound::Unbounded, Bound::Excluded);
        Ok(rows
            .range::<RecordId, _>((lower, Bound::Unbounded))
            .filter_map(|(id, raw_field)| {
                raw_field.as_ref().map(|raw| Record::new(id.clone(), raw.clone()))
            })
            .take(limit)
            .collect())
    }

    async fn update_field(&self, id: &RecordId, new_raw: &str) -> Result<(), StoreError> {
        let mut rows = self.rows.lock();
        let slot = rows
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        *slot = Some(new_raw.to_string());
        *self.writes.lock() += 1;
        Ok(())
    }
}
