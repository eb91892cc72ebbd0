use serde::{Deserialize, Serialize};

use super::SessionStats;

/// Achievements in evaluation order. When one update satisfies several
/// thresholds, the earliest variant wins and the rest unlock on later results.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "camelCase")]
pub enum AchievementId {
    FirstMinute,
    SteadyFive,
    QuarterHour,
    DeepFifteen,
    FullHour,
    Collector,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Achievement {
    pub id: AchievementId,
    pub name: &'static str,
    pub description: &'static str,
}

impl AchievementId {
    pub const ALL: [AchievementId; 6] = [
        AchievementId::FirstMinute,
        AchievementId::SteadyFive,
        AchievementId::QuarterHour,
        AchievementId::DeepFifteen,
        AchievementId::FullHour,
        AchievementId::Collector,
    ];

    pub fn details(self) -> Achievement {
        let (name, description) = match self {
            AchievementId::FirstMinute => ("First Minute", "Stayed focused for a full minute"),
            AchievementId::SteadyFive => ("Steady Five", "Five minutes without a single distraction"),
            AchievementId::QuarterHour => ("Quarter Hour", "Fifteen minutes of focus in total"),
            AchievementId::DeepFifteen => ("Deep Fifteen", "Fifteen minutes without a single distraction"),
            AchievementId::FullHour => ("Full Hour", "A whole hour of focus in total"),
            AchievementId::Collector => ("Collector", "Earned three other badges"),
        };
        Achievement {
            id: self,
            name,
            description,
        }
    }

    /// Thresholds are monotonic in the counters they read, so a satisfied
    /// predicate stays satisfied.
    pub fn is_satisfied(self, stats: &SessionStats) -> bool {
        match self {
            AchievementId::FirstMinute => stats.total_focus_seconds >= 60,
            AchievementId::SteadyFive => stats.longest_streak_seconds >= 5 * 60,
            AchievementId::QuarterHour => stats.total_focus_seconds >= 15 * 60,
            AchievementId::DeepFifteen => stats.longest_streak_seconds >= 15 * 60,
            AchievementId::FullHour => stats.total_focus_seconds >= 60 * 60,
            AchievementId::Collector => {
                stats
                    .unlocked_achievements
                    .iter()
                    .filter(|id| **id != AchievementId::Collector)
                    .count()
                    >= 3
            }
        }
    }
}

/// First achievement, in [`AchievementId::ALL`] order, that is satisfied and
/// not yet unlocked.
pub fn next_unlock(stats: &SessionStats) -> Option<AchievementId> {
    AchievementId::ALL
        .into_iter()
        .find(|id| !stats.unlocked_achievements.contains(id) && id.is_satisfied(stats))
}
