//! Fakes shared by the monitor integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::io::Cursor;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use image::{ImageFormat, Rgb, RgbImage};
use tokio::sync::broadcast;

use focus_guardian_lib::audio::{AudioOutput, RandomSource};
use focus_guardian_lib::classifier::{ClassificationResult, FocusStatus, FrameClassifier};
use focus_guardian_lib::db::StateStore;
use focus_guardian_lib::gate::LimitNotice;
use focus_guardian_lib::monitor::{MonitorController, MonitorDeps, MonitorEvent};
use focus_guardian_lib::sensing::{Frame, FrameSource};
use focus_guardian_lib::settings::Settings;

pub const TODAY: &str = "2026-10-16";

pub fn test_frame() -> Frame {
    let image = RgbImage::from_fn(32, 32, |x, y| {
        Rgb([(x * 7 % 256) as u8, (y * 13 % 256) as u8, ((x ^ y) * 5 % 256) as u8])
    });
    let mut buffer = Cursor::new(Vec::new());
    image.write_to(&mut buffer, ImageFormat::Png).unwrap();
    Frame::from_bytes(buffer.into_inner()).unwrap()
}

pub struct FakeCamera {
    ready: AtomicBool,
    frame: Frame,
}

impl FakeCamera {
    pub fn new() -> Self {
        Self {
            ready: AtomicBool::new(true),
            frame: test_frame(),
        }
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }
}

impl FrameSource for FakeCamera {
    fn capture_frame(&self) -> Option<Frame> {
        self.ready
            .load(Ordering::SeqCst)
            .then(|| self.frame.clone())
    }
}

pub enum Reply {
    Result(ClassificationResult),
    Reject(&'static str),
}

/// Answers after `delay`, popping scripted replies first and falling back to
/// a focused result once the script runs out.
pub struct ScriptedClassifier {
    delay: Duration,
    script: Mutex<VecDeque<Reply>>,
    calls: AtomicUsize,
}

impl ScriptedClassifier {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            script: Mutex::new(VecDeque::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_script(delay: Duration, replies: impl IntoIterator<Item = Reply>) -> Self {
        let classifier = Self::new(delay);
        classifier.script.lock().unwrap().extend(replies);
        classifier
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FrameClassifier for ScriptedClassifier {
    async fn classify(&self, _frame: &Frame) -> Result<ClassificationResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let reply = self.script.lock().unwrap().pop_front();
        tokio::time::sleep(self.delay).await;
        match reply {
            Some(Reply::Result(result)) => Ok(result),
            Some(Reply::Reject(reason)) => Err(anyhow!(reason)),
            None => Ok(focused()),
        }
    }
}

pub fn focused() -> ClassificationResult {
    ClassificationResult::new(FocusStatus::Focused, "Nice posture, keep it up", 0.9)
}

pub fn distracted() -> ClassificationResult {
    ClassificationResult::new(FocusStatus::Distracted, "Back to your homework, please", 0.8)
}

#[derive(Default)]
pub struct RecordingAudio {
    spoken: Mutex<Vec<String>>,
}

impl RecordingAudio {
    pub fn spoken(&self) -> Vec<String> {
        self.spoken.lock().unwrap().clone()
    }
}

impl AudioOutput for RecordingAudio {
    fn speak(&self, text: &str) {
        self.spoken.lock().unwrap().push(text.to_string());
    }

    fn play_clip(&self, path: &Path) {
        self.spoken
            .lock()
            .unwrap()
            .push(format!("clip:{}", path.display()));
    }
}

pub struct FixedRandom(pub f64);

impl RandomSource for FixedRandom {
    fn next_f64(&self) -> f64 {
        self.0
    }
}

pub struct Harness {
    pub monitor: MonitorController,
    pub camera: Arc<FakeCamera>,
    pub classifier: Arc<ScriptedClassifier>,
    pub audio: Arc<RecordingAudio>,
    pub day: Arc<Mutex<String>>,
}

impl Harness {
    pub async fn new(store: Arc<dyn StateStore>, classifier: ScriptedClassifier) -> Self {
        let camera = Arc::new(FakeCamera::new());
        let classifier = Arc::new(classifier);
        let audio = Arc::new(RecordingAudio::default());
        let day = Arc::new(Mutex::new(TODAY.to_string()));

        let day_source = {
            let day = day.clone();
            Arc::new(move || day.lock().unwrap().clone())
        };
        let deps = MonitorDeps::new(store, camera.clone(), classifier.clone(), audio.clone())
            // Focused praise stays silent unless a test asks for it.
            .with_random(Arc::new(FixedRandom(0.99)))
            .with_day_source(day_source);

        Self {
            monitor: MonitorController::new(&Settings::default(), deps).await,
            camera,
            classifier,
            audio,
            day,
        }
    }

    pub fn set_day(&self, day: &str) {
        *self.day.lock().unwrap() = day.to_string();
    }
}

pub async fn sleep_secs(secs: f64) {
    tokio::time::sleep(Duration::from_secs_f64(secs)).await;
}

pub async fn wait_for_limit(events: &mut broadcast::Receiver<MonitorEvent>) -> LimitNotice {
    loop {
        match events.recv().await {
            Ok(MonitorEvent::LimitReached { notice }) => return notice,
            Ok(_) => continue,
            Err(err) => panic!("event stream ended before the limit: {err}"),
        }
    }
}
