//! Testing utilities for Scrub workspace
//!
//! Shared test helpers, fixtures, and fault-injecting stores.

#![allow(missing_docs)]

use parking_lot::Mutex;
use scrub_core::{
    MemoryStore, Record, RecordId, RecordStore, Reporter, ScrubEvent, Severity, StoreError,
};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Reporter that keeps every event for later assertions
#[derive(Debug, Default)]
pub struct RecordingReporter {
    events: Mutex<Vec<ScrubEvent>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ScrubEvent> {
        self.events.lock().clone()
    }

    pub fn warnings(&self) -> Vec<ScrubEvent> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.severity() == Severity::Warn)
            .cloned()
            .collect()
    }

    /// Ids named by `RecordMalformed` events, in report order
    pub fn malformed_ids(&self) -> Vec<RecordId> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                ScrubEvent::RecordMalformed { id, .. } => Some(id.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, matches: impl Fn(&ScrubEvent) -> bool) -> usize {
        self.events.lock().iter().filter(|e| matches(e)).count()
    }
}

impl Reporter for RecordingReporter {
    fn report(&self, event: &ScrubEvent) {
        self.events.lock().push(event.clone());
    }
}

/// Memory store that can fail scans or specific updates, and tracks
/// how many updates were in flight at once
#[derive(Debug, Default)]
pub struct FaultyStore {
    inner: MemoryStore,
    fail_ids: Mutex<HashSet<RecordId>>,
    fail_scan: AtomicBool,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    attempted: Mutex<Vec<RecordId>>,
    log: Mutex<Vec<WriteEvent>>,
}

/// Start or end of one `update_field` call on a [`FaultyStore`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteEvent {
    Started(RecordId),
    Finished(RecordId),
}

impl FaultyStore {
    pub fn new(records: impl IntoIterator<Item = Record>) -> Self {
        Self {
            inner: MemoryStore::with_records(records),
            ..Self::default()
        }
    }

    /// Make every update of `id` fail with `StoreError::Unavailable`
    pub fn fail_update(&self, id: impl Into<RecordId>) {
        self.fail_ids.lock().insert(id.into());
    }

    pub fn fail_scans(&self) {
        self.fail_scan.store(true, Ordering::SeqCst);
    }

    pub fn heal(&self) {
        self.fail_ids.lock().clear();
        self.fail_scan.store(false, Ordering::SeqCst);
    }

    pub fn records(&self) -> &MemoryStore {
        &self.inner
    }

    /// Highest number of concurrently running updates observed
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Every update attempted, in issue order
    pub fn attempted(&self) -> Vec<RecordId> {
        self.attempted.lock().clone()
    }

    /// Update starts and finishes, in the order they happened
    pub fn write_log(&self) -> Vec<WriteEvent> {
        self.log.lock().clone()
    }
}

#[async_trait::async_trait]
impl RecordStore for FaultyStore {
    async fn fetch_page(
        &self,
        after: Option<&RecordId>,
        limit: usize,
    ) -> Result<Vec<Record>, StoreError> {
        if self.fail_scan.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("scan refused".to_string()));
        }
        self.inner.fetch_page(after, limit).await
    }

    async fn update_field(&self, id: &RecordId, new_raw: &str) -> Result<(), StoreError> {
        self.attempted.lock().push(id.clone());
        self.log.lock().push(WriteEvent::Started(id.clone()));
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        // Let sibling updates of the same batch start before this one ends.
        tokio::task::yield_now().await;

        let refused = self.fail_ids.lock().contains(id);
        let result = if refused {
            Err(StoreError::Unavailable(format!("write to {id} refused")))
        } else {
            self.inner.update_field(id, new_raw).await
        };
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.log.lock().push(WriteEvent::Finished(id.clone()));
        result
    }
}

/// Store ordering ids by their numeric value, the way an integer primary
/// key sorts, so `"10"` follows `"9"`
#[derive(Debug, Default)]
pub struct NumericOrderStore {
    rows: Mutex<Vec<Record>>,
}

impl NumericOrderStore {
    pub fn new(records: impl IntoIterator<Item = Record>) -> Self {
        let mut rows: Vec<Record> = records.into_iter().collect();
        rows.sort_by_key(|r| Self::key(&r.id));
        Self {
            rows: Mutex::new(rows),
        }
    }

    fn key(id: &RecordId) -> u64 {
        id.as_str().parse().unwrap_or(u64::MAX)
    }

    pub fn get(&self, id: &RecordId) -> Option<Option<String>> {
        self.rows
            .lock()
            .iter()
            .find(|r| &r.id == id)
            .map(|r| r.raw_field.clone())
    }
}

#[async_trait::async_trait]
impl RecordStore for NumericOrderStore {
    async fn fetch_page(
        &self,
        after: Option<&RecordId>,
        limit: usize,
    ) -> Result<Vec<Record>, StoreError> {
        let floor = after.map(Self::key);
        Ok(self
            .rows
            .lock()
            .iter()
            .filter(|r| r.raw_field.is_some())
            .filter(|r| floor.map_or(true, |f| Self::key(&r.id) > f))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn update_field(&self, id: &RecordId, new_raw: &str) -> Result<(), StoreError> {
        let mut rows = self.rows.lock();
        let row = rows
            .iter_mut()
            .find(|r| &r.id == id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        row.raw_field = Some(new_raw.to_string());
        Ok(())
    }
}

/// The four reference rows: dirty, clean, malformed, null
pub fn scenario_records() -> Vec<Record> {
    vec![
        Record::new("1", r#"{"country":"US","ip":"1.2.3.4"}"#),
        Record::new("2", r#"{"country":"FR","country_code":"FR","region":"EU"}"#),
        Record::new("3", "not-json"),
        Record::null("4"),
    ]
}

/// `n` geolocation rows; every `dirty_every`-th one carries PII keys
pub fn geolocation_records(n: usize, dirty_every: usize) -> Vec<Record> {
    (0..n)
        .map(|i| {
            let id = format!("{i:06}");
            if dirty_every != 0 && i % dirty_every == 0 {
                Record::new(
                    id,
                    format!(
                        r#"{{"country":"Country {i}","country_code":"C{i}","region":"R","ip":"10.0.0.{}","latitude":1.5,"asn":"AS{i}"}}"#,
                        i % 255
                    ),
                )
            } else {
                Record::new(id, r#"{"country":"Ireland","country_code":"IE","region":"Leinster"}"#)
            }
        })
        .collect()
}
