use std::sync::Arc;

use crate::classifier::{ClassificationResult, FocusStatus};
use crate::settings::AudioSettings;
use crate::streak::Achievement;

use super::AudioOutput;

pub const START_ANNOUNCEMENT: &str = "Monitoring started. You can do it!";

/// Uniform samples in `[0, 1)`; injectable so tests can force either branch.
pub trait RandomSource: Send + Sync {
    fn next_f64(&self) -> f64;
}

pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn next_f64(&self) -> f64 {
        rand::random::<f64>()
    }
}

/// What the child hears. Every decision takes the result it reacts to as an
/// argument; nothing is read back from shared display state.
pub struct FeedbackPlayer {
    settings: AudioSettings,
    focused_probability: f64,
    output: Arc<dyn AudioOutput>,
    random: Arc<dyn RandomSource>,
}

impl FeedbackPlayer {
    pub fn new(
        settings: AudioSettings,
        focused_probability: f64,
        output: Arc<dyn AudioOutput>,
        random: Arc<dyn RandomSource>,
    ) -> Self {
        Self {
            settings,
            focused_probability,
            output,
            random,
        }
    }

    /// Returns whether anything was played.
    pub fn on_result(&self, result: &ClassificationResult) -> bool {
        if !self.settings.enabled {
            return false;
        }

        match result.status {
            status if status.is_negative() => {
                if let Some(clip) = self.settings.custom_clip() {
                    self.output.play_clip(clip);
                } else {
                    self.output.speak(&result.message);
                }
                true
            }
            FocusStatus::Focused => {
                // Occasional praise only, to avoid notification fatigue.
                if self.random.next_f64() < self.focused_probability {
                    self.output.speak(&result.message);
                    true
                } else {
                    false
                }
            }
            _ => false,
        }
    }

    pub fn on_achievement(&self, achievement: &Achievement) {
        self.announce(&format!(
            "Congratulations! You earned the badge: {}",
            achievement.name
        ));
    }

    pub fn announce(&self, text: &str) {
        if self.settings.enabled {
            self.output.speak(text);
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    pub(crate) enum Played {
        Speech(String),
        Clip(PathBuf),
    }

    #[derive(Default)]
    pub(crate) struct RecordingOutput {
        pub(crate) played: Mutex<Vec<Played>>,
    }

    impl AudioOutput for RecordingOutput {
        fn speak(&self, text: &str) {
            self.played.lock().unwrap().push(Played::Speech(text.to_string()));
        }

        fn play_clip(&self, path: &Path) {
            self.played.lock().unwrap().push(Played::Clip(path.to_path_buf()));
        }
    }

    pub(crate) struct FixedRandom(pub(crate) f64);

    impl RandomSource for FixedRandom {
        fn next_f64(&self) -> f64 {
            self.0
        }
    }

    fn player(settings: AudioSettings, roll: f64) -> (FeedbackPlayer, Arc<RecordingOutput>) {
        let output = Arc::new(RecordingOutput::default());
        let player = FeedbackPlayer::new(settings, 0.15, output.clone(), Arc::new(FixedRandom(roll)));
        (player, output)
    }

    fn result(status: FocusStatus, message: &str) -> ClassificationResult {
        ClassificationResult::new(status, message, 0.9)
    }

    #[test]
    fn distracted_is_always_spoken() {
        let (player, output) = player(AudioSettings::default(), 0.99);
        assert!(player.on_result(&result(FocusStatus::Distracted, "Back to work")));
        assert!(player.on_result(&result(FocusStatus::Absent, "Where did you go?")));

        assert_eq!(
            *output.played.lock().unwrap(),
            vec![
                Played::Speech("Back to work".into()),
                Played::Speech("Where did you go?".into())
            ]
        );
    }

    #[test]
    fn focused_is_sampled() {
        let (quiet, quiet_output) = player(AudioSettings::default(), 0.5);
        assert!(!quiet.on_result(&result(FocusStatus::Focused, "Nice")));
        assert!(quiet_output.played.lock().unwrap().is_empty());

        let (chatty, chatty_output) = player(AudioSettings::default(), 0.1);
        assert!(chatty.on_result(&result(FocusStatus::Focused, "Nice")));
        assert_eq!(chatty_output.played.lock().unwrap().len(), 1);
    }

    #[test]
    fn custom_clip_replaces_speech_for_negative_results_only() {
        let settings = AudioSettings {
            use_custom_clip: true,
            custom_clip_path: Some(PathBuf::from("/tmp/mum.ogg")),
            ..AudioSettings::default()
        };
        let (player, output) = player(settings, 0.0);

        player.on_result(&result(FocusStatus::Distracted, "Back to work"));
        player.on_result(&result(FocusStatus::Focused, "Nice"));

        assert_eq!(
            *output.played.lock().unwrap(),
            vec![
                Played::Clip(PathBuf::from("/tmp/mum.ogg")),
                Played::Speech("Nice".into())
            ]
        );
    }

    #[test]
    fn disabled_audio_is_silent() {
        let settings = AudioSettings {
            enabled: false,
            ..AudioSettings::default()
        };
        let (player, output) = player(settings, 0.0);

        assert!(!player.on_result(&result(FocusStatus::Distracted, "Back to work")));
        player.announce(START_ANNOUNCEMENT);
        assert!(output.played.lock().unwrap().is_empty());
    }

    #[test]
    fn errors_are_silent() {
        let (player, output) = player(AudioSettings::default(), 0.0);
        assert!(!player.on_result(&ClassificationResult::error("timeout")));
        assert!(output.played.lock().unwrap().is_empty());
    }
}
