use anyhow::{Context, Result};
use async_trait::async_trait;

use super::{Database, Entitlement, QuotaRecord};

const QUOTA_KEY: &str = "quota";
const ENTITLEMENT_KEY: &str = "entitlement";

/// The two persisted entries: today's quota record and the entitlement flag.
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn load_quota(&self) -> Result<Option<QuotaRecord>>;

    async fn save_quota(&self, record: &QuotaRecord) -> Result<()>;

    async fn load_entitlement(&self) -> Result<Option<Entitlement>>;

    async fn save_entitlement(&self, entitlement: &Entitlement) -> Result<()>;
}

#[async_trait]
impl StateStore for Database {
    async fn load_quota(&self) -> Result<Option<QuotaRecord>> {
        self.get_value(QUOTA_KEY)
            .await?
            .map(|raw| serde_json::from_str(&raw).context("corrupt quota record"))
            .transpose()
    }

    async fn save_quota(&self, record: &QuotaRecord) -> Result<()> {
        self.put_value(QUOTA_KEY, serde_json::to_string(record)?)
            .await
    }

    async fn load_entitlement(&self) -> Result<Option<Entitlement>> {
        self.get_value(ENTITLEMENT_KEY)
            .await?
            .map(|raw| serde_json::from_str(&raw).context("corrupt entitlement record"))
            .transpose()
    }

    async fn save_entitlement(&self, entitlement: &Entitlement) -> Result<()> {
        self.put_value(ENTITLEMENT_KEY, serde_json::to_string(entitlement)?)
            .await
    }
}
