pub mod feedback;
pub mod speech;

use rodio::{Decoder, OutputStream, Sink};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::{
    mpsc::{self, Sender},
    Arc, Mutex,
};
use std::thread;

pub use feedback::{FeedbackPlayer, RandomSource, ThreadRandom};
pub use speech::{AudioOutput, SpeechCommand, SystemAudio};

enum AudioCommand {
    PlayClip(PathBuf),
    Stop,
}

/// Plays recorded clips on a dedicated thread that owns the non-`Send`
/// rodio output stream. A new clip replaces whatever is still playing.
#[derive(Clone)]
pub struct AudioEngineHandle {
    tx: Arc<Mutex<Option<Sender<AudioCommand>>>>,
}

impl AudioEngineHandle {
    pub fn new() -> Self {
        Self {
            tx: Arc::new(Mutex::new(None)),
        }
    }

    fn ensure_thread(&self) -> Result<Sender<AudioCommand>, String> {
        if let Some(tx) = self.tx.lock().map_err(|e| e.to_string())?.as_ref() {
            return Ok(tx.clone());
        }

        let (tx, rx) = mpsc::channel::<AudioCommand>();

        thread::Builder::new()
            .name("audio-engine".to_string())
            .spawn(move || {
                let mut _stream: Option<OutputStream> = None;
                let mut sink: Option<Sink> = None;

                fn ensure_sink(
                    stream: &mut Option<OutputStream>,
                    sink: &mut Option<Sink>,
                ) -> Result<(), String> {
                    if sink.is_none() {
                        let (s, handle) = OutputStream::try_default()
                            .map_err(|e| format!("Failed to create audio output stream: {}", e))?;
                        let new_sink = Sink::try_new(&handle)
                            .map_err(|e| format!("Failed to create audio sink: {}", e))?;
                        *stream = Some(s);
                        *sink = Some(new_sink);
                    }
                    Ok(())
                }

                while let Ok(cmd) = rx.recv() {
                    match cmd {
                        AudioCommand::PlayClip(path) => {
                            if let Err(err) = ensure_sink(&mut _stream, &mut sink) {
                                log::warn!("{err}");
                                continue;
                            }
                            let source = File::open(&path)
                                .map_err(|e| e.to_string())
                                .and_then(|file| {
                                    Decoder::new(BufReader::new(file)).map_err(|e| e.to_string())
                                });
                            match (source, sink.as_ref()) {
                                (Ok(source), Some(s)) => {
                                    s.stop();
                                    s.append(source);
                                    s.play();
                                }
                                (Err(err), _) => {
                                    log::warn!("Failed to decode clip {}: {err}", path.display());
                                }
                                (Ok(_), None) => {}
                            }
                        }
                        AudioCommand::Stop => {
                            if let Some(s_old) = sink.take() {
                                s_old.stop();
                            }
                            _stream = None;
                        }
                    }
                }
            })
            .map_err(|e| e.to_string())?;

        let tx_clone = tx.clone();
        *self.tx.lock().map_err(|e| e.to_string())? = Some(tx);
        Ok(tx_clone)
    }

    pub fn play_clip(&self, path: &Path) -> Result<(), String> {
        let tx = self.ensure_thread()?;
        tx.send(AudioCommand::PlayClip(path.to_path_buf()))
            .map_err(|e| e.to_string())
    }

    pub fn stop(&self) -> Result<(), String> {
        if let Ok(Some(tx)) = self.tx.lock().map(|g| g.clone()) {
            let _ = tx.send(AudioCommand::Stop);
        }
        Ok(())
    }
}

impl Default for AudioEngineHandle {
    fn default() -> Self {
        Self::new()
    }
}
