//! Bounded, most-recent-first log of scan results.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, warn};
use qrdesk_states::{KeyValueStore, SCAN_HISTORY_KEY, ScanRecord, load_collection, save_collection};

pub struct HistoryRecorder {
    store: Arc<dyn KeyValueStore>,
    limit: usize,
    entries: Vec<ScanRecord>,
}

impl HistoryRecorder {
    /// Loads the persisted history, keeping at most `limit` entries.
    ///
    /// The log always holds at least one entry, so a `limit` of 0 acts as 1.
    pub fn load(store: Arc<dyn KeyValueStore>, limit: usize) -> Self {
        let limit = limit.max(1);
        let mut entries: Vec<ScanRecord> = load_collection(store.as_ref(), SCAN_HISTORY_KEY);
        entries.truncate(limit);
        debug!("Loaded {} history entries", entries.len());
        Self {
            store,
            limit,
            entries,
        }
    }

    /// Records `text` as scanned now.
    pub fn record(&mut self, text: &str) -> &ScanRecord {
        self.record_at(text, Utc::now())
    }

    /// Prepends a record, evicts past the limit and persists the whole log.
    ///
    /// A failed write is logged; the in-memory log still holds the record.
    pub fn record_at(&mut self, text: &str, timestamp: DateTime<Utc>) -> &ScanRecord {
        self.entries.insert(0, ScanRecord::new(text, timestamp));
        self.entries.truncate(self.limit);

        if let Err(e) = save_collection(self.store.as_ref(), SCAN_HISTORY_KEY, &self.entries) {
            warn!("Failed to persist scan history: {e}");
        }
        &self.entries[0]
    }

    pub fn entries(&self) -> &[ScanRecord] {
        &self.entries
    }

    pub fn latest(&self) -> Option<&ScanRecord> {
        self.entries.first()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }
}
