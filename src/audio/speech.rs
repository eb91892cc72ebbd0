use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::sync::Mutex;

use super::AudioEngineHandle;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

/// Fire-and-forget audio sink. Implementations must never block the caller
/// on playback.
pub trait AudioOutput: Send + Sync {
    fn speak(&self, text: &str);

    fn play_clip(&self, path: &Path);
}

/// Speaks through an external text-to-speech program. Starting a new
/// utterance cuts off the previous one.
pub struct SpeechCommand {
    program: Option<String>,
    current: Mutex<Option<Child>>,
}

impl SpeechCommand {
    pub fn new(program: Option<String>) -> Self {
        Self {
            program: program.filter(|p| !p.trim().is_empty()),
            current: Mutex::new(None),
        }
    }

    pub fn speak(&self, text: &str) {
        let Some(program) = self.program.as_deref() else {
            log_info!("(speech) {text}");
            return;
        };

        let Ok(mut current) = self.current.lock() else {
            log_warn!("speech lock poisoned, dropping utterance");
            return;
        };

        if let Some(mut previous) = current.take() {
            if matches!(previous.try_wait(), Ok(None)) {
                let _ = previous.kill();
            }
            let _ = previous.wait();
        }

        match Command::new(program)
            .arg(text)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
        {
            Ok(child) => *current = Some(child),
            Err(err) => log_warn!("Failed to start speech program {program}: {err}"),
        }
    }
}

pub struct SystemAudio {
    speech: SpeechCommand,
    engine: AudioEngineHandle,
}

impl SystemAudio {
    pub fn new(speech_program: Option<String>) -> Self {
        Self {
            speech: SpeechCommand::new(speech_program),
            engine: AudioEngineHandle::new(),
        }
    }
}

impl AudioOutput for SystemAudio {
    fn speak(&self, text: &str) {
        self.speech.speak(text);
    }

    fn play_clip(&self, path: &Path) {
        if let Err(err) = self.engine.play_clip(path) {
            log_warn!("Clip playback failed: {err}");
        }
    }
}

impl Drop for SystemAudio {
    fn drop(&mut self) {
        let _ = self.engine.stop();
    }
}
