//! Batch writer
//!
//! Commits pending updates in contiguous batches of at most `batch_size`.
//! Batches run strictly one after another. Inside a batch every update is
//! issued concurrently, and all outcomes are collected before the batch is
//! declared complete, so a failure never leaves in-flight writes behind.
//!
//! A failed batch aborts the remaining ones. Batches that already
//! committed stay committed; re-running the scrub is convergent.

use crate::error::BatchWriteFailure;
use crate::store::RecordStore;
use crate::types::PendingUpdate;
use futures::future::join_all;
use std::num::NonZeroUsize;

/// Split `updates` into contiguous batches of at most `batch_size`
///
/// Produces `ceil(len / batch_size)` batches; only the last may be short.
#[must_use]
pub fn partition(updates: &[PendingUpdate], batch_size: NonZeroUsize) -> Vec<&[PendingUpdate]> {
    updates.chunks(batch_size.get()).collect()
}

/// Number of batches `len` updates produce
#[inline]
#[must_use]
pub fn batch_count(len: usize, batch_size: NonZeroUsize) -> usize {
    len.div_ceil(batch_size.get())
}

/// Progress notification for one committed batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchProgress {
    /// Zero-based batch index
    pub index: usize,
    /// Total batches
    pub total: usize,
    /// Updates in this batch
    pub size: usize,
}

/// Result of a fully committed set of updates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CommitReport {
    /// Batches committed
    pub batches: usize,
    /// Records written
    pub records: usize,
}

/// Writes pending updates in bounded batches
pub struct BatchWriter<'a> {
    store: &'a dyn RecordStore,
    batch_size: NonZeroUsize,
}

impl<'a> BatchWriter<'a> {
    /// Create a writer
    #[must_use]
    pub fn new(store: &'a dyn RecordStore, batch_size: NonZeroUsize) -> Self {
        Self { store, batch_size }
    }

    /// Commit `updates`, calling `on_batch` after each committed batch
    ///
    /// # Errors
    /// `BatchWriteFailure` describing the first batch with at least one
    /// failed update; later batches are not issued.
    pub async fn commit<F>(
        &self,
        updates: &[PendingUpdate],
        mut on_batch: F,
    ) -> Result<CommitReport, BatchWriteFailure>
    where
        F: FnMut(BatchProgress),
    {
        let batches = partition(updates, self.batch_size);
        let total = batches.len();
        let mut committed_records = 0;

        for (index, batch) in batches.into_iter().enumerate() {
            let outcomes = join_all(
                batch
                    .iter()
                    .map(|update| self.store.update_field(&update.id, &update.new_raw_field)),
            )
            .await;

            let mut written = 0;
            let mut failures = Vec::new();
            for (update, outcome) in batch.iter().zip(outcomes) {
                match outcome {
                    Ok(()) => written += 1,
                    Err(err) => failures.push((update.id.clone(), err)),
                }
            }

            if !failures.is_empty() {
                tracing::debug!(
                    batch = index + 1,
                    total,
                    failed = failures.len(),
                    "batch failed, aborting remaining batches"
                );
                return Err(BatchWriteFailure {
                    batch_index: index,
                    committed_batches: index,
                    total_batches: total,
                    committed_records,
                    partial_records: written,
                    failures,
                });
            }

            committed_records += written;
            on_batch(BatchProgress {
                index,
                total,
                size: batch.len(),
            });
        }

        Ok(CommitReport {
            batches: total,
            records: committed_records,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::store::MemoryStore;
    use crate::types::{Record, RecordId};

    fn updates(n: usize) -> Vec<PendingUpdate> {
        (0..n)
            .map(|i| PendingUpdate {
                id: RecordId::new(format!("{i:04}")),
                new_raw_field: format!("{{\"n\":{i}}}"),
            })
            .collect()
    }

    fn size(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    #[test]
    fn partition_sizes() {
        let all = updates(2501);
        let batches = partition(&all, size(1000));
        let sizes: Vec<_> = batches.iter().map(|b| b.len()).collect();
        assert_eq!(sizes, vec![1000, 1000, 501]);
        assert_eq!(batch_count(all.len(), size(1000)), 3);
        assert!(partition(&[], size(10)).is_empty());
        assert_eq!(batch_count(0, size(10)), 0);
    }

    #[tokio::test]
    async fn commits_every_batch() {
        let all = updates(5);
        let store = MemoryStore::with_records(all.iter().map(|u| Record::new(u.id.clone(), "{}")));
        let writer = BatchWriter::new(&store, size(2));

        let mut progress = Vec::new();
        let report = writer.commit(&all, |p| progress.push(p)).await.unwrap();

        assert_eq!(report, CommitReport { batches: 3, records: 5 });
        assert_eq!(progress.iter().map(|p| p.size).collect::<Vec<_>>(), vec![2, 2, 1]);
        assert!(progress.iter().all(|p| p.total == 3));
        assert_eq!(store.write_count(), 5);
        assert_eq!(store.get(&RecordId::from("0004")), Some(Some("{\"n\":4}".to_string())));
    }

    #[tokio::test]
    async fn failure_aborts_remaining_batches() {
        let all = updates(6);
        // Record 0003 is missing, so the second batch fails.
        let store = MemoryStore::with_records(
            all.iter()
                .filter(|u| u.id.as_str() != "0003")
                .map(|u| Record::new(u.id.clone(), "{}")),
        );
        let writer = BatchWriter::new(&store, size(2));

        let mut committed = 0;
        let failure = writer.commit(&all, |_| committed += 1).await.unwrap_err();

        assert_eq!(committed, 1);
        assert_eq!(failure.batch_index, 1);
        assert_eq!(failure.committed_batches, 1);
        assert_eq!(failure.total_batches, 3);
        assert_eq!(failure.committed_records, 2);
        assert_eq!(failure.partial_records, 1);
        assert_eq!(failure.failures.len(), 1);
        assert!(matches!(failure.failures[0].1, StoreError::NotFound(_)));
        // Batch 3 was never issued.
        assert_eq!(store.get(&RecordId::from("0004")), Some(Some("{}".to_string())));
        assert_eq!(store.write_count(), 3);
    }
}
