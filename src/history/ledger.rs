use std::sync::Arc;

use anyhow::{Context, Result};

use crate::{
    models::HistoryEntry,
    store::{KeyValueStore, HISTORY_KEY},
};

const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info, log_warn};

/// Oldest entries beyond this are dropped on append.
pub const MAX_HISTORY_ENTRIES: usize = 50;

/// Append-only log of finished sessions, newest first.
///
/// Every mutation writes the whole sequence back under `timerHistory`. Write
/// failures are logged and the in-memory ledger stays authoritative for the
/// rest of the process.
pub struct HistoryLedger {
    entries: Vec<HistoryEntry>,
    store: Arc<dyn KeyValueStore>,
}

impl HistoryLedger {
    /// Loads the persisted ledger. Absent, unreadable or corrupt data yields an
    /// empty ledger; this never fails.
    pub async fn load(store: Arc<dyn KeyValueStore>) -> Self {
        let entries = match store.get(HISTORY_KEY).await {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<HistoryEntry>>(&raw) {
                Ok(mut entries) => {
                    entries.truncate(MAX_HISTORY_ENTRIES);
                    entries
                }
                Err(err) => {
                    log_warn!("Discarding corrupt history ledger: {err}");
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(err) => {
                log_error!("Failed to load history ledger: {err:?}");
                Vec::new()
            }
        };

        Self { entries, store }
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn latest(&self) -> Option<&HistoryEntry> {
        self.entries.first()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub async fn append(&mut self, entry: HistoryEntry) {
        log_info!(
            "Recording {} session {} ({}s of {}s)",
            entry.status.as_str(),
            entry.id,
            entry.actual_duration,
            entry.planned_duration
        );
        self.push_front(entry);
        if let Err(err) = self.persist().await {
            log_error!("Failed to save history: {err:?}");
        }
    }

    /// Empties the ledger. Confirmation is the caller's job.
    pub async fn clear(&mut self) {
        self.entries.clear();
        if let Err(err) = self.persist().await {
            log_error!("Failed to save cleared history: {err:?}");
        }
    }

    fn push_front(&mut self, entry: HistoryEntry) {
        self.entries.insert(0, entry);
        self.entries.truncate(MAX_HISTORY_ENTRIES);
    }

    async fn persist(&self) -> Result<()> {
        let serialized =
            serde_json::to_string(&self.entries).context("failed to serialize history")?;
        self.store.set(HISTORY_KEY, &serialized).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{models::SessionStatus, store::MemoryStore};
    use chrono::{Duration, TimeZone, Utc};

    fn entry(n: u64, status: SessionStatus) -> HistoryEntry {
        HistoryEntry {
            id: format!("session-{n}"),
            start_time: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
                + Duration::minutes(n as i64),
            session_name: format!("Block {n}"),
            planned_duration: 60,
            actual_duration: 60,
            status,
        }
    }

    #[tokio::test]
    async fn newest_entry_is_first() {
        let store = Arc::new(MemoryStore::new());
        let mut ledger = HistoryLedger::load(store.clone()).await;
        assert!(ledger.is_empty());

        ledger.append(entry(1, SessionStatus::Completed)).await;
        ledger.append(entry(2, SessionStatus::Cancelled)).await;

        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.latest().unwrap().id, "session-2");
        assert_eq!(ledger.entries()[1].id, "session-1");
    }

    #[tokio::test]
    async fn never_exceeds_cap_and_drops_oldest() {
        let store = Arc::new(MemoryStore::new());
        let mut ledger = HistoryLedger::load(store.clone()).await;

        for n in 0..(MAX_HISTORY_ENTRIES as u64 + 7) {
            ledger.append(entry(n, SessionStatus::Completed)).await;
            assert!(ledger.len() <= MAX_HISTORY_ENTRIES);
        }

        assert_eq!(ledger.len(), MAX_HISTORY_ENTRIES);
        assert_eq!(ledger.latest().unwrap().id, "session-56");
        assert_eq!(ledger.entries().last().unwrap().id, "session-7");

        let reloaded = HistoryLedger::load(store).await;
        assert_eq!(reloaded.entries(), ledger.entries());
    }

    #[tokio::test]
    async fn corrupt_or_unreadable_ledger_loads_empty() {
        let store = Arc::new(MemoryStore::new());
        store.set(HISTORY_KEY, "[{\"id\":").await.unwrap();
        assert!(HistoryLedger::load(store.clone()).await.is_empty());

        store.set_failing(true);
        assert!(HistoryLedger::load(store).await.is_empty());
    }

    #[tokio::test]
    async fn clear_persists_empty_sequence() {
        let store = Arc::new(MemoryStore::new());
        let mut ledger = HistoryLedger::load(store.clone()).await;
        ledger.append(entry(1, SessionStatus::Interrupted)).await;

        ledger.clear().await;
        assert!(ledger.is_empty());
        assert_eq!(store.get(HISTORY_KEY).await.unwrap().as_deref(), Some("[]"));
    }

    #[tokio::test]
    async fn write_failures_keep_the_in_memory_ledger() {
        let store = Arc::new(MemoryStore::new());
        let mut ledger = HistoryLedger::load(store.clone()).await;

        store.set_failing(true);
        ledger.append(entry(1, SessionStatus::Completed)).await;
        assert_eq!(ledger.len(), 1);
    }
}
