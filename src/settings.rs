use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
    time::Duration,
};

pub const DEFAULT_DAILY_LIMIT_SECS: u64 = 20 * 60;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AudioSettings {
    pub enabled: bool,
    /// Play the recorded clip instead of speech for distracted/absent results.
    pub use_custom_clip: bool,
    pub custom_clip_path: Option<PathBuf>,
    /// Text-to-speech program invoked as `<command> <text>`, e.g. `espeak-ng` or `say`.
    pub speech_command: Option<String>,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            use_custom_clip: false,
            custom_clip_path: None,
            speech_command: None,
        }
    }
}

impl AudioSettings {
    pub fn custom_clip(&self) -> Option<&Path> {
        if self.use_custom_clip {
            self.custom_clip_path.as_deref()
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PollingSettings {
    pub check_interval_secs: u64,
    pub usage_tick_secs: u64,
    pub classify_timeout_secs: u64,
    pub log_capacity: usize,
    /// Share of focused results that get spoken feedback.
    pub focused_speech_probability: f64,
}

impl Default for PollingSettings {
    fn default() -> Self {
        Self {
            check_interval_secs: 5,
            usage_tick_secs: 1,
            classify_timeout_secs: 10,
            log_capacity: 50,
            focused_speech_probability: 0.15,
        }
    }
}

impl PollingSettings {
    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs.max(1))
    }

    pub fn usage_tick(&self) -> Duration {
        Duration::from_secs(self.usage_tick_secs.max(1))
    }

    pub fn classify_timeout(&self) -> Duration {
        Duration::from_secs(self.classify_timeout_secs.max(1))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct QuotaSettings {
    pub daily_limit_secs: u64,
}

impl Default for QuotaSettings {
    fn default() -> Self {
        Self {
            daily_limit_secs: DEFAULT_DAILY_LIMIT_SECS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StreakSettings {
    /// Gaps longer than this earn nothing (resume from background, stalled loop).
    pub gap_guard_secs: u64,
    /// Upper bound credited for a single result.
    pub max_credit_secs: u64,
}

impl Default for StreakSettings {
    fn default() -> Self {
        Self {
            gap_guard_secs: 20,
            max_credit_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClassifierSettings {
    pub endpoint: String,
    pub model: String,
    /// Usually supplied through `GEMINI_API_KEY` rather than the file.
    pub api_key: Option<String>,
}

impl Default for ClassifierSettings {
    fn default() -> Self {
        Self {
            endpoint: "https://generativelanguage.googleapis.com/v1beta".into(),
            model: "gemini-2.5-flash".into(),
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CameraSettings {
    pub snapshot_path: PathBuf,
    pub max_frame_age_secs: u64,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            snapshot_path: std::env::temp_dir().join("focus-guardian-frame.jpg"),
            max_frame_age_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub audio: AudioSettings,
    pub polling: PollingSettings,
    pub quota: QuotaSettings,
    pub streak: StreakSettings,
    pub classifier: ClassifierSettings,
    pub camera: CameraSettings,
}

impl Settings {
    /// Applies environment overrides that never get written back to disk.
    pub fn with_env_overrides(mut self) -> Self {
        let key = std::env::var("GEMINI_API_KEY")
            .or_else(|_| std::env::var("API_KEY"))
            .ok()
            .filter(|value| !value.trim().is_empty());
        if key.is_some() {
            self.classifier.api_key = key;
        }
        self
    }
}

pub fn debug_enabled() -> bool {
    std::env::var("FOCUS_GUARDIAN_DEBUG")
        .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<Settings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            match serde_json::from_str(&contents) {
                Ok(settings) => settings,
                Err(err) => {
                    log::warn!(
                        "Ignoring unreadable settings file {}: {err}",
                        path.display()
                    );
                    Settings::default()
                }
            }
        } else {
            Settings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    /// Stored settings with environment overrides applied.
    pub fn effective(&self) -> Settings {
        self.read().clone().with_env_overrides()
    }

    pub fn audio(&self) -> AudioSettings {
        self.read().audio.clone()
    }

    pub fn update_audio(&self, settings: AudioSettings) -> Result<()> {
        let mut guard = self.write();
        guard.audio = settings;
        self.persist(&guard)
    }

    fn read(&self) -> RwLockReadGuard<'_, Settings> {
        self.data.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Settings> {
        self.data.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn persist(&self, data: &Settings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create settings directory {}", parent.display())
            })?;
        }
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}
