use serde::Serialize;

pub const LIMIT_MESSAGE: &str =
    "Today's free monitoring time is used up. Activate the full version to keep going.";

/// Raised when the daily allowance is exhausted; its presence is what the
/// front end shows as the blocking limit dialog.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LimitNotice {
    pub used_seconds: u64,
    pub limit_seconds: u64,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Allowed,
    Denied(LimitNotice),
}

/// Enforces `unlocked || used_seconds < daily_limit`.
#[derive(Debug, Clone, Copy)]
pub struct SessionGate {
    daily_limit_secs: u64,
}

impl SessionGate {
    pub fn new(daily_limit_secs: u64) -> Self {
        Self { daily_limit_secs }
    }

    pub fn daily_limit_secs(&self) -> u64 {
        self.daily_limit_secs
    }

    pub fn permits(&self, unlocked: bool, used_seconds: u64) -> bool {
        unlocked || used_seconds < self.daily_limit_secs
    }

    pub fn request_start(&self, unlocked: bool, used_seconds: u64) -> GateDecision {
        if self.permits(unlocked, used_seconds) {
            GateDecision::Allowed
        } else {
            GateDecision::Denied(self.notice(used_seconds))
        }
    }

    /// Checked after every usage tick; `Some` means the session must stop now.
    pub fn check_tick(&self, unlocked: bool, used_seconds: u64) -> Option<LimitNotice> {
        (!self.permits(unlocked, used_seconds)).then(|| self.notice(used_seconds))
    }

    fn notice(&self, used_seconds: u64) -> LimitNotice {
        LimitNotice {
            used_seconds,
            limit_seconds: self.daily_limit_secs,
            message: LIMIT_MESSAGE.to_string(),
        }
    }
}
