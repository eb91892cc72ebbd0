use std::sync::Mutex;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;

use super::{Entitlement, QuotaRecord, StateStore};

/// Process-local store, used with `--ephemeral` and in tests. Writes can be
/// made to fail to exercise the degraded paths.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    quota: Option<QuotaRecord>,
    entitlement: Option<Entitlement>,
    fail_writes: bool,
    quota_writes: u64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(record: QuotaRecord) -> Self {
        let store = Self::default();
        if let Ok(mut state) = store.state.lock() {
            state.quota = Some(record);
        }
        store
    }

    pub fn set_fail_writes(&self, fail: bool) {
        if let Ok(mut state) = self.state.lock() {
            state.fail_writes = fail;
        }
    }

    /// Number of successful quota writes.
    pub fn quota_writes(&self) -> u64 {
        self.state.lock().map(|state| state.quota_writes).unwrap_or(0)
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut MemoryState) -> Result<T>) -> Result<T> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| anyhow!("memory store lock poisoned"))?;
        f(&mut state)
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn load_quota(&self) -> Result<Option<QuotaRecord>> {
        self.with_state(|state| Ok(state.quota.clone()))
    }

    async fn save_quota(&self, record: &QuotaRecord) -> Result<()> {
        self.with_state(|state| {
            if state.fail_writes {
                bail!("memory store is read-only");
            }
            state.quota = Some(record.clone());
            state.quota_writes += 1;
            Ok(())
        })
    }

    async fn load_entitlement(&self) -> Result<Option<Entitlement>> {
        self.with_state(|state| Ok(state.entitlement))
    }

    async fn save_entitlement(&self, entitlement: &Entitlement) -> Result<()> {
        self.with_state(|state| {
            if state.fail_writes {
                bail!("memory store is read-only");
            }
            state.entitlement = Some(*entitlement);
            Ok(())
        })
    }
}
