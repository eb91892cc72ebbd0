use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};

/// Seconds of monitoring used on one calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaRecord {
    pub date_key: String,
    pub used_seconds: u64,
}

impl QuotaRecord {
    pub fn fresh(date_key: impl Into<String>) -> Self {
        Self {
            date_key: date_key.into(),
            used_seconds: 0,
        }
    }

    pub fn day_key(date: NaiveDate) -> String {
        date.format("%Y-%m-%d").to_string()
    }

    pub fn today_key() -> String {
        Self::day_key(Local::now().date_naive())
    }
}
