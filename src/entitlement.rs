use std::sync::Arc;

use anyhow::{Context, Result};

use crate::db::{Entitlement, StateStore};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

/// Shared activation secret. Matching is trimmed and case-insensitive; this is
/// a soft paywall, not an access control mechanism.
const ACTIVATION_CODE: &str = "VIP888";

pub struct EntitlementStore {
    store: Arc<dyn StateStore>,
    unlocked: bool,
}

impl EntitlementStore {
    pub async fn open(store: Arc<dyn StateStore>) -> Self {
        let unlocked = match store.load_entitlement().await {
            Ok(entitlement) => entitlement.unwrap_or_default().unlocked,
            Err(err) => {
                log_warn!("Failed to load entitlement, treating as locked: {err:#}");
                false
            }
        };
        Self { store, unlocked }
    }

    pub fn is_unlocked(&self) -> bool {
        self.unlocked
    }

    /// Returns `Ok(false)` for a wrong code. Errors only when a correct code
    /// could not be persisted, in which case nothing changes.
    pub async fn activate(&mut self, code: &str) -> Result<bool> {
        if !code_matches(code) {
            log_info!("Activation rejected");
            return Ok(false);
        }

        self.store
            .save_entitlement(&Entitlement { unlocked: true })
            .await
            .context("failed to persist activation")?;
        self.unlocked = true;
        log_info!("Activation accepted, daily limit lifted");
        Ok(true)
    }
}

fn code_matches(code: &str) -> bool {
    code.trim().eq_ignore_ascii_case(ACTIVATION_CODE)
}
