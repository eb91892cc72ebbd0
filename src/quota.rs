use std::sync::Arc;

use crate::db::{QuotaRecord, StateStore};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

/// Owns today's [`QuotaRecord`]. Every mutation is written through to the
/// store; a failed write is logged and skipped so counting continues in memory.
pub struct QuotaLedger {
    store: Arc<dyn StateStore>,
    record: QuotaRecord,
}

impl QuotaLedger {
    pub async fn open(store: Arc<dyn StateStore>, today: &str) -> Self {
        let record = load_or_reset(store.as_ref(), today).await;
        Self { store, record }
    }

    pub fn record(&self) -> &QuotaRecord {
        &self.record
    }

    pub fn used_seconds(&self) -> u64 {
        self.record.used_seconds
    }

    /// Re-reads the persisted record, resetting it when it belongs to another day.
    pub async fn load_or_reset(&mut self, today: &str) -> &QuotaRecord {
        self.record = load_or_reset(self.store.as_ref(), today).await;
        &self.record
    }

    /// Resets the in-memory record when the calendar day changed mid-session.
    pub async fn roll_over(&mut self, today: &str) -> bool {
        if self.record.date_key == today {
            return false;
        }
        log_info!(
            "Quota day changed {} -> {}, resetting usage ({}s used)",
            self.record.date_key,
            today,
            self.record.used_seconds
        );
        self.record = QuotaRecord::fresh(today);
        persist(self.store.as_ref(), &self.record).await;
        true
    }

    pub async fn tick(&mut self) -> &QuotaRecord {
        self.record.used_seconds = self.record.used_seconds.saturating_add(1);
        persist(self.store.as_ref(), &self.record).await;
        &self.record
    }

    pub fn remaining_seconds(&self, limit: u64) -> u64 {
        remaining_seconds(&self.record, limit)
    }
}

pub fn remaining_seconds(record: &QuotaRecord, limit: u64) -> u64 {
    limit.saturating_sub(record.used_seconds)
}

/// An unreadable stored record counts as zero in memory but is left in place;
/// it is only replaced by the next tick.
async fn load_or_reset(store: &dyn StateStore, today: &str) -> QuotaRecord {
    match store.load_quota().await {
        Ok(Some(record)) if record.date_key == today => record,
        Ok(_) => {
            let record = QuotaRecord::fresh(today);
            persist(store, &record).await;
            record
        }
        Err(err) => {
            log_warn!("Failed to load quota record, counting from zero: {err:#}");
            QuotaRecord::fresh(today)
        }
    }
}

async fn persist(store: &dyn StateStore, record: &QuotaRecord) {
    if let Err(err) = store.save_quota(record).await {
        log_warn!(
            "Failed to persist quota ({}s on {}): {err:#}",
            record.used_seconds,
            record.date_key
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Database, MemoryStore};
    use tempfile::tempdir;

    const DAY: &str = "2026-10-16";
    const NEXT_DAY: &str = "2026-10-17";

    #[tokio::test]
    async fn used_seconds_counts_ticks() {
        let store = Arc::new(MemoryStore::new());
        let mut ledger = QuotaLedger::open(store.clone(), DAY).await;

        for _ in 0..37 {
            ledger.tick().await;
        }

        assert_eq!(ledger.used_seconds(), 37);
        assert_eq!(store.load_quota().await.unwrap().unwrap().used_seconds, 37);
    }

    #[tokio::test]
    async fn load_or_reset_is_idempotent_within_a_day() {
        let store = Arc::new(MemoryStore::new());
        let mut ledger = QuotaLedger::open(store.clone(), DAY).await;
        ledger.tick().await;
        ledger.tick().await;

        assert_eq!(ledger.load_or_reset(DAY).await.used_seconds, 2);
        assert_eq!(ledger.load_or_reset(DAY).await.used_seconds, 2);
    }

    #[tokio::test]
    async fn new_day_resets_usage() {
        let store = Arc::new(MemoryStore::with_quota(QuotaRecord {
            date_key: DAY.into(),
            used_seconds: 5000,
        }));
        let mut ledger = QuotaLedger::open(store.clone(), NEXT_DAY).await;

        assert_eq!(ledger.used_seconds(), 0);
        assert_eq!(ledger.record().date_key, NEXT_DAY);
        assert_eq!(
            store.load_quota().await.unwrap().unwrap(),
            QuotaRecord::fresh(NEXT_DAY)
        );
        assert_eq!(ledger.load_or_reset(NEXT_DAY).await.used_seconds, 0);
    }

    #[tokio::test]
    async fn roll_over_only_on_day_change() {
        let store = Arc::new(MemoryStore::new());
        let mut ledger = QuotaLedger::open(store, DAY).await;
        ledger.tick().await;

        assert!(!ledger.roll_over(DAY).await);
        assert_eq!(ledger.used_seconds(), 1);

        assert!(ledger.roll_over(NEXT_DAY).await);
        assert_eq!(ledger.used_seconds(), 0);
        ledger.tick().await;
        assert_eq!(ledger.used_seconds(), 1);
    }

    #[tokio::test]
    async fn failed_writes_do_not_stop_counting() {
        let store = Arc::new(MemoryStore::new());
        let mut ledger = QuotaLedger::open(store.clone(), DAY).await;
        store.set_fail_writes(true);

        ledger.tick().await;
        ledger.tick().await;

        assert_eq!(ledger.used_seconds(), 2);
        assert_eq!(store.load_quota().await.unwrap().unwrap().used_seconds, 0);
    }

    #[tokio::test]
    async fn unreadable_record_is_not_overwritten_on_open() {
        let dir = tempdir().unwrap();
        let db = Database::new(dir.path().join("state.sqlite3")).unwrap();
        db.put_value("quota", "not json".into()).await.unwrap();

        let mut ledger = QuotaLedger::open(Arc::new(db.clone()), DAY).await;
        assert_eq!(ledger.used_seconds(), 0);
        assert_eq!(db.get_value("quota").await.unwrap().as_deref(), Some("not json"));

        ledger.tick().await;
        assert_eq!(db.load_quota().await.unwrap().unwrap().used_seconds, 1);
    }

    #[tokio::test]
    async fn ticks_survive_reopening_the_database() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.sqlite3");
        {
            let mut ledger =
                QuotaLedger::open(Arc::new(Database::new(path.clone()).unwrap()), DAY).await;
            for _ in 0..3 {
                ledger.tick().await;
            }
        }

        let reopened = QuotaLedger::open(Arc::new(Database::new(path).unwrap()), DAY).await;
        assert_eq!(reopened.used_seconds(), 3);
    }

    #[test]
    fn remaining_never_underflows() {
        let record = QuotaRecord {
            date_key: DAY.into(),
            used_seconds: 1500,
        };
        assert_eq!(remaining_seconds(&record, 1200), 0);
        assert_eq!(remaining_seconds(&QuotaRecord::fresh(DAY), 1200), 1200);
    }
}
