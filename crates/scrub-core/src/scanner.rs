//! Record scanner
//!
//! Lazily pages candidate records out of a [`RecordStore`] using keyset
//! pagination, so memory is bounded by the page size rather than the table.
//! A scanner is single-pass: once a page comes back empty it stays done.
//!
//! Id ordering belongs to the store. The scanner only passes the last id of
//! each page back as the cursor and never compares ids beyond equality.

use crate::error::StoreError;
use crate::store::RecordStore;
use crate::types::{Record, RecordId};
use std::num::NonZeroUsize;

/// A candidate whose target field is known to be present
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Record id
    pub id: RecordId,
    /// Raw target field
    pub raw: String,
}

/// Paged, single-pass scan over candidate records
pub struct RecordScanner<'a> {
    store: &'a dyn RecordStore,
    page_size: NonZeroUsize,
    cursor: Option<RecordId>,
    exhausted: bool,
    pages: usize,
}

impl<'a> RecordScanner<'a> {
    /// Create a scanner over `store`
    #[must_use]
    pub fn new(store: &'a dyn RecordStore, page_size: NonZeroUsize) -> Self {
        Self {
            store,
            page_size,
            cursor: None,
            exhausted: false,
            pages: 0,
        }
    }

    /// Fetch the next page of candidates
    ///
    /// Returns `Ok(None)` once the scan is complete. Rows with a null field
    /// are dropped even if the backend returns them.
    ///
    /// # Errors
    /// Propagates the store's read error, or `StoreError::Backend` when a
    /// page ends on the cursor it was fetched after. The scanner is then
    /// exhausted.
    pub async fn next_page(&mut self) -> Result<Option<Vec<Candidate>>, StoreError> {
        if self.exhausted {
            return Ok(None);
        }

        let page = match self
            .store
            .fetch_page(self.cursor.as_ref(), self.page_size.get())
            .await
        {
            Ok(page) => page,
            Err(err) => {
                self.exhausted = true;
                return Err(err);
            }
        };

        let Some(last) = page.last() else {
            self.exhausted = true;
            return Ok(None);
        };
        if self.cursor.as_ref() == Some(&last.id) {
            tracing::warn!(cursor = %last.id, "record store returned a non-advancing page");
            self.exhausted = true;
            return Err(StoreError::Backend(format!(
                "page after {} did not advance the cursor",
                last.id
            )));
        }
        self.cursor = Some(last.id.clone());
        self.pages += 1;

        let candidates = page
            .into_iter()
            .filter_map(|Record { id, raw_field }| raw_field.map(|raw| Candidate { id, raw }))
            .collect();
        Ok(Some(candidates))
    }

    /// Pages fetched so far
    #[inline]
    #[must_use]
    pub fn pages(&self) -> usize {
        self.pages
    }
}
