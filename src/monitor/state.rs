use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::time::Instant;
use uuid::Uuid;

use crate::classifier::{ClassificationResult, FocusStatus};
use crate::db::QuotaRecord;
use crate::entitlement::EntitlementStore;
use crate::gate::LimitNotice;
use crate::quota::QuotaLedger;
use crate::sensing::PollingController;
use crate::streak::{SessionStats, StreakTracker};

/// Exists only while monitoring runs.
#[derive(Debug, Clone, Copy)]
pub struct PollingSession {
    /// Sequence number of this run; results started under another epoch are stale.
    pub epoch: u64,
    /// Reference point for the elapsed time credited to the next result.
    pub last_result_at: Instant,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub status: FocusStatus,
    pub message: String,
}

/// Newest-first, bounded history of classification results.
#[derive(Debug)]
pub struct ActivityLog {
    entries: VecDeque<LogEntry>,
    capacity: usize,
}

impl ActivityLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, result: &ClassificationResult) -> LogEntry {
        let entry = LogEntry {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            status: result.status,
            message: result.message.clone(),
        };
        self.entries.push_front(entry.clone());
        self.entries.truncate(self.capacity);
        entry
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub(crate) struct MonitorState {
    pub(crate) polling: PollingController,
    pub(crate) session: Option<PollingSession>,
    pub(crate) last_epoch: u64,
    pub(crate) status: Option<FocusStatus>,
    pub(crate) message: String,
    pub(crate) log: ActivityLog,
    pub(crate) tracker: StreakTracker,
    pub(crate) ledger: QuotaLedger,
    pub(crate) entitlement: EntitlementStore,
    pub(crate) limit_notice: Option<LimitNotice>,
}

impl MonitorState {
    pub(crate) fn is_running(&self) -> bool {
        self.session.is_some()
    }

    pub(crate) fn current_session(&mut self, epoch: u64) -> Option<&mut PollingSession> {
        self.session.as_mut().filter(|session| session.epoch == epoch)
    }

    pub(crate) fn clear_display(&mut self) {
        self.status = None;
        self.message.clear();
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorSnapshot {
    pub running: bool,
    /// `None` while idle.
    pub status: Option<FocusStatus>,
    pub message: String,
    pub stats: SessionStats,
    pub log: Vec<LogEntry>,
    pub quota: QuotaRecord,
    /// `None` when unlocked.
    pub remaining_seconds: Option<u64>,
    pub unlocked: bool,
    pub limit_notice: Option<LimitNotice>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_is_newest_first_and_bounded() {
        let mut log = ActivityLog::new(3);
        for i in 0..5 {
            log.push(&ClassificationResult::new(
                FocusStatus::Focused,
                format!("result {i}"),
                0.9,
            ));
        }

        let messages: Vec<_> = log.entries().into_iter().map(|e| e.message).collect();
        assert_eq!(messages, vec!["result 4", "result 3", "result 2"]);
        assert_eq!(log.len(), 3);
    }
}
