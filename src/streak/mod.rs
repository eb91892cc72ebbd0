pub mod achievements;

use std::{collections::BTreeSet, time::Duration};

use serde::{Deserialize, Serialize};

use crate::classifier::{ClassificationResult, FocusStatus};
use crate::settings::StreakSettings;

pub use achievements::{next_unlock, Achievement, AchievementId};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionStats {
    pub total_focus_seconds: u64,
    pub current_streak_seconds: u64,
    pub longest_streak_seconds: u64,
    pub distraction_count: u64,
    pub unlocked_achievements: BTreeSet<AchievementId>,
}

/// Folds classification results into [`SessionStats`].
pub struct StreakTracker {
    settings: StreakSettings,
    stats: SessionStats,
}

impl StreakTracker {
    pub fn new(settings: StreakSettings) -> Self {
        Self {
            settings,
            stats: SessionStats::default(),
        }
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    /// Whole seconds credited for a gap of `elapsed` since the previous result.
    pub fn credited_seconds(&self, elapsed: Duration) -> u64 {
        let secs = elapsed.as_secs_f64();
        if secs > self.settings.gap_guard_secs as f64 {
            0
        } else {
            secs.min(self.settings.max_credit_secs as f64).floor() as u64
        }
    }

    /// Applies one result and returns the achievement it unlocked, if any.
    pub fn apply_result(
        &mut self,
        result: &ClassificationResult,
        elapsed: Duration,
    ) -> Option<Achievement> {
        match result.status {
            FocusStatus::Focused => {
                let credit = self.credited_seconds(elapsed);
                let stats = &mut self.stats;
                stats.total_focus_seconds += credit;
                stats.current_streak_seconds += credit;
                stats.longest_streak_seconds =
                    stats.longest_streak_seconds.max(stats.current_streak_seconds);
            }
            FocusStatus::Distracted | FocusStatus::Absent => {
                self.stats.current_streak_seconds = 0;
                self.stats.distraction_count += 1;
            }
            FocusStatus::Error => return None,
        }

        let unlocked = next_unlock(&self.stats)?;
        self.stats.unlocked_achievements.insert(unlocked);
        Some(unlocked.details())
    }
}
