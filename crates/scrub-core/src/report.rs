//! Progress and outcome reporting
//!
//! The engine never logs through global state directly. Every observable
//! step is a [`ScrubEvent`] handed to an injected [`Reporter`], which lets
//! hosts route events anywhere and lets tests assert on them.

use crate::error::DecodeError;
use crate::runner::{RunStatus, RunSummary};
use crate::types::{RecordId, RunId};

/// Event severity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Normal progress
    Info,
    /// Something was skipped or refused
    Warn,
}

/// Observable step of a scrub run
#[derive(Debug, Clone, PartialEq)]
pub enum ScrubEvent {
    /// A forward run or dry run began
    RunStarted {
        /// Run identifier
        run_id: RunId,
        /// True for `plan()`
        dry_run: bool,
    },
    /// No record has a non-null target field
    NoCandidates {
        /// Run identifier
        run_id: RunId,
    },
    /// A record's field could not be decoded and was skipped
    RecordMalformed {
        /// Run identifier
        run_id: RunId,
        /// Skipped record
        id: RecordId,
        /// Why decoding failed
        error: DecodeError,
    },
    /// Every candidate already satisfies the allow-list
    AllClean {
        /// Run identifier
        run_id: RunId,
        /// Candidates inspected
        scanned: u64,
    },
    /// Writes are about to start
    RewriteStarted {
        /// Run identifier
        run_id: RunId,
        /// Records to rewrite
        pending: usize,
        /// Batches they were partitioned into
        batches: usize,
    },
    /// One batch fully committed
    BatchCommitted {
        /// Run identifier
        run_id: RunId,
        /// Zero-based batch index
        index: usize,
        /// Total batches
        total: usize,
        /// Updates in this batch
        size: usize,
    },
    /// Final outcome, including aborted runs
    RunFinished(RunSummary),
    /// `revert()` was invoked and refused
    ReversalRefused {
        /// Operator-facing explanation
        reason: String,
    },
}

impl ScrubEvent {
    /// Severity of the event
    #[must_use]
    pub fn severity(&self) -> Severity {
        match self {
            Self::RecordMalformed { .. } | Self::ReversalRefused { .. } => Severity::Warn,
            Self::RunFinished(summary) if summary.status == RunStatus::Aborted => Severity::Warn,
            _ => Severity::Info,
        }
    }
}

/// Sink for scrub events
pub trait Reporter: Send + Sync {
    /// Receive one event
    fn report(&self, event: &ScrubEvent);
}

/// Reporter that forwards events to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn report(&self, event: &ScrubEvent) {
        match event {
            ScrubEvent::RunStarted { run_id, dry_run } => {
                tracing::debug!(%run_id, dry_run, "scrub run started");
            }
            ScrubEvent::NoCandidates { run_id } => {
                tracing::info!(%run_id, "no records with a target field found - skipping");
            }
            ScrubEvent::RecordMalformed { run_id, id, error } => {
                tracing::warn!(%run_id, record_id = %id, %error, "skipping record: invalid field");
            }
            ScrubEvent::AllClean { run_id, scanned } => {
                tracing::info!(
                    %run_id,
                    scanned,
                    "all {} records already have clean fields - skipping",
                    scanned
                );
            }
            ScrubEvent::RewriteStarted {
                run_id,
                pending,
                batches,
            } => {
                tracing::info!(%run_id, pending, batches, "stripping disallowed keys from {} records", pending);
            }
            ScrubEvent::BatchCommitted {
                run_id,
                index,
                total,
                size,
            } => {
                tracing::debug!(%run_id, batch = index + 1, total, size, "batch committed");
            }
            ScrubEvent::RunFinished(summary) => {
                if summary.status == RunStatus::Aborted {
                    tracing::warn!(
                        run_id = %summary.run_id,
                        scanned = summary.scanned,
                        malformed = summary.malformed,
                        clean = summary.clean,
                        rewritten = summary.rewritten,
                        batches_committed = summary.batches_committed,
                        batches_total = summary.batches_total,
                        "scrub aborted: {}",
                        summary.describe()
                    );
                } else {
                    tracing::info!(
                        run_id = %summary.run_id,
                        scanned = summary.scanned,
                        malformed = summary.malformed,
                        clean = summary.clean,
                        rewritten = summary.rewritten,
                        "scrub finished: {}",
                        summary.describe()
                    );
                }
            }
            ScrubEvent::ReversalRefused { reason } => {
                tracing::warn!("rollback not possible: {}", reason);
            }
        }
    }
}

/// Reporter that discards every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn report(&self, _event: &ScrubEvent) {}
}
