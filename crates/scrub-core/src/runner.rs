//! Migration runner
//!
//! The host-facing contract is `apply()`, which performs the forward
//! scrub, and `revert()`, which always refuses. `plan()` is an operator
//! tool on top of that contract: it previews `apply()` without writing and
//! is what the `scrub plan` command calls. Hosts driving the migration
//! should not rely on it.
//!
//! # Unit of work
//!
//! Hosts are expected to call `apply()` inside their own outer unit of
//! work. That boundary is advisory: the batch writer commits each batch
//! independently, so on large tables a failure can leave earlier batches
//! committed. Re-running `apply()` is safe and converges, because rewritten
//! records are classified clean on the next pass.
//!
//! # Reversal
//!
//! The forward operation discards every key outside the allow-list. Nothing
//! is archived, so there is nothing to restore.

use crate::batch::{batch_count, BatchWriter};
use crate::config::ScrubConfig;
use crate::decode::{classify, Classification};
use crate::error::ScrubError;
use crate::policy::TransformPolicy;
use crate::report::{Reporter, ScrubEvent, TracingReporter};
use crate::scanner::RecordScanner;
use crate::store::RecordStore;
use crate::types::{PendingUpdate, RunId};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

/// Explanation returned by every `revert()` call
pub const REVERSAL_REFUSED: &str =
    "stripped fields were discarded, not archived, and cannot be restored";

/// Overall outcome of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// No candidates, or every candidate was clean or malformed
    NothingToDo,
    /// Every pending update was written
    Completed,
    /// A batch failed; earlier batches stay committed
    Aborted,
    /// Dry run; nothing was written
    Planned,
}

/// Counts and outcome of one run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    /// Run identifier
    pub run_id: RunId,
    /// Candidates with a non-null field
    pub scanned: u64,
    /// Candidates skipped because the field did not decode
    pub malformed: u64,
    /// Candidates already satisfying the allow-list
    pub clean: u64,
    /// Records needing a rewrite
    pub pending: u64,
    /// Records actually written
    pub rewritten: u64,
    /// Batches fully committed
    pub batches_committed: usize,
    /// Batches the pending updates were partitioned into
    pub batches_total: usize,
    /// Outcome
    pub status: RunStatus,
    /// Start of the run
    pub started_at: DateTime<Utc>,
    /// End of the run
    pub finished_at: DateTime<Utc>,
}

impl RunSummary {
    /// Summary of a run that has not counted anything yet
    #[must_use]
    pub fn empty(run_id: RunId) -> Self {
        let now = Utc::now();
        Self {
            run_id,
            scanned: 0,
            malformed: 0,
            clean: 0,
            pending: 0,
            rewritten: 0,
            batches_committed: 0,
            batches_total: 0,
            status: RunStatus::NothingToDo,
            started_at: now,
            finished_at: now,
        }
    }

    /// One-line operator description
    #[must_use]
    pub fn describe(&self) -> String {
        match self.status {
            RunStatus::NothingToDo if self.scanned == 0 => "nothing to do: no candidates".to_string(),
            RunStatus::NothingToDo => format!(
                "nothing to do: {} clean, {} malformed",
                self.clean, self.malformed
            ),
            RunStatus::Completed if self.malformed > 0 => format!(
                "partial success: {} rewritten, {} malformed records skipped",
                self.rewritten, self.malformed
            ),
            RunStatus::Completed => format!("{} rewritten", self.rewritten),
            RunStatus::Planned => format!(
                "planned: {} to rewrite in {} batches, {} clean, {} malformed",
                self.pending, self.batches_total, self.clean, self.malformed
            ),
            RunStatus::Aborted => format!(
                "aborted after committing {} of {} batches ({} rewritten); safe to re-run",
                self.batches_committed, self.batches_total, self.rewritten
            ),
        }
    }
}

/// Dry-run result of `plan()`
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    /// Counts as `apply()` would report them before writing
    pub summary: RunSummary,
    /// Updates `apply()` would issue, in scan order
    pub updates: Vec<PendingUpdate>,
}

/// Forward-only scrub of one target field across a record store
pub struct ScrubMigration {
    store: Arc<dyn RecordStore>,
    reporter: Arc<dyn Reporter>,
    config: ScrubConfig,
    policy: TransformPolicy,
}

impl ScrubMigration {
    /// Create a runner with an explicit reporter
    #[must_use]
    pub fn new(store: Arc<dyn RecordStore>, reporter: Arc<dyn Reporter>, config: ScrubConfig) -> Self {
        let policy = config.policy();
        Self {
            store,
            reporter,
            config,
            policy,
        }
    }

    /// Create a runner reporting through `tracing`
    #[must_use]
    pub fn with_tracing(store: Arc<dyn RecordStore>, config: ScrubConfig) -> Self {
        Self::new(store, Arc::new(TracingReporter), config)
    }

    /// Active configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &ScrubConfig {
        &self.config
    }

    /// Scan and classify without writing
    ///
    /// # Errors
    /// - `ScrubError::Scan` if the store read fails
    /// - `ScrubError::Encode` if a projection cannot be serialized
    pub async fn plan(&self) -> Result<Plan, ScrubError> {
        let run_id = RunId::new();
        self.reporter.report(&ScrubEvent::RunStarted {
            run_id,
            dry_run: true,
        });
        let (mut summary, updates) = self.collect(run_id).await?;
        summary.status = RunStatus::Planned;
        Ok(Plan {
            summary: self.finish(summary),
            updates,
        })
    }

    /// Run the forward scrub
    ///
    /// Idempotent: a second run over the result finds every record clean.
    ///
    /// # Errors
    /// - `ScrubError::Scan` if the store read fails (nothing was written)
    /// - `ScrubError::Encode` if a projection cannot be serialized
    /// - `ScrubError::BatchWrite` if a batch fails; carries the aborted summary
    pub async fn apply(&self) -> Result<RunSummary, ScrubError> {
        let run_id = RunId::new();
        self.reporter.report(&ScrubEvent::RunStarted {
            run_id,
            dry_run: false,
        });

        let (mut summary, updates) = self.collect(run_id).await?;

        if summary.scanned == 0 {
            self.reporter.report(&ScrubEvent::NoCandidates { run_id });
            return Ok(self.finish(summary));
        }
        if updates.is_empty() {
            self.reporter.report(&ScrubEvent::AllClean {
                run_id,
                scanned: summary.scanned,
            });
            return Ok(self.finish(summary));
        }

        self.reporter.report(&ScrubEvent::RewriteStarted {
            run_id,
            pending: updates.len(),
            batches: summary.batches_total,
        });

        let writer = BatchWriter::new(self.store.as_ref(), self.config.batch_size);
        let reporter = &self.reporter;
        let result = writer
            .commit(&updates, |progress| {
                reporter.report(&ScrubEvent::BatchCommitted {
                    run_id,
                    index: progress.index,
                    total: progress.total,
                    size: progress.size,
                });
            })
            .await;

        match result {
            Ok(report) => {
                summary.rewritten = report.records as u64;
                summary.batches_committed = report.batches;
                summary.status = RunStatus::Completed;
                Ok(self.finish(summary))
            }
            Err(failure) => {
                summary.rewritten = (failure.committed_records + failure.partial_records) as u64;
                summary.batches_committed = failure.committed_batches;
                summary.status = RunStatus::Aborted;
                let summary = self.finish(summary);
                Err(ScrubError::BatchWrite {
                    failure,
                    summary: Box::new(summary),
                })
            }
        }
    }

    /// Refuse to undo the scrub
    ///
    /// # Errors
    /// Always `ScrubError::UnsupportedReversal`; nothing is touched.
    pub async fn revert(&self) -> Result<(), ScrubError> {
        self.reporter.report(&ScrubEvent::ReversalRefused {
            reason: REVERSAL_REFUSED.to_string(),
        });
        Err(ScrubError::UnsupportedReversal {
            reason: REVERSAL_REFUSED.to_string(),
        })
    }

    async fn collect(&self, run_id: RunId) -> Result<(RunSummary, Vec<PendingUpdate>), ScrubError> {
        let mut summary = RunSummary::empty(run_id);
        let mut updates = Vec::new();
        let mut scanner = RecordScanner::new(self.store.as_ref(), self.config.page_size);

        while let Some(page) = scanner.next_page().await.map_err(ScrubError::Scan)? {
            for candidate in page {
                summary.scanned += 1;
                match classify(&candidate.raw, self.policy.allowed()) {
                    Classification::Clean => summary.clean += 1,
                    Classification::Malformed(error) => {
                        summary.malformed += 1;
                        self.reporter.report(&ScrubEvent::RecordMalformed {
                            run_id,
                            id: candidate.id,
                            error,
                        });
                    }
                    Classification::NeedsRewrite(decoded) => {
                        let new_raw_field = self
                            .policy
                            .project(&decoded)
                            .to_raw()
                            .map_err(|source| ScrubError::Encode {
                                id: candidate.id.clone(),
                                source,
                            })?;
                        updates.push(PendingUpdate {
                            id: candidate.id,
                            new_raw_field,
                        });
                    }
                }
            }
        }

        tracing::debug!(
            %run_id,
            pages = scanner.pages(),
            scanned = summary.scanned,
            pending = updates.len(),
            "scan complete"
        );
        summary.pending = updates.len() as u64;
        summary.batches_total = batch_count(updates.len(), self.config.batch_size);
        Ok((summary, updates))
    }

    fn finish(&self, mut summary: RunSummary) -> RunSummary {
        summary.finished_at = Utc::now();
        self.reporter.report(&ScrubEvent::RunFinished(summary.clone()));
        summary
    }
}
