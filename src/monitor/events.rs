use serde::Serialize;

use crate::classifier::ClassificationResult;
use crate::gate::LimitNotice;
use crate::streak::Achievement;

use super::LogEntry;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum MonitorEvent {
    StateChanged {
        running: bool,
    },
    Classified {
        result: ClassificationResult,
        /// Absent for `ERROR` results, which are not logged.
        entry: Option<LogEntry>,
    },
    AchievementUnlocked {
        achievement: Achievement,
    },
    UsageTick {
        used_seconds: u64,
        remaining_seconds: Option<u64>,
    },
    LimitReached {
        notice: LimitNotice,
    },
}
