pub mod audio;
pub mod classifier;
pub mod db;
pub mod entitlement;
pub mod gate;
pub mod monitor;
pub mod quota;
pub mod sensing;
pub mod settings;
pub mod streak;
pub mod utils;

use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use log::info;

use audio::SystemAudio;
use classifier::GeminiClassifier;
use db::{Database, MemoryStore, StateStore};
use monitor::{MonitorController, MonitorDeps};
use sensing::SnapshotFileSource;
use settings::{Settings, SettingsStore};

const APP_DIR_NAME: &str = "focus-guardian";

pub fn default_data_dir() -> Result<PathBuf> {
    dirs::data_dir()
        .map(|dir| dir.join(APP_DIR_NAME))
        .context("could not determine a data directory; pass --data-dir")
}

/// Everything a front end needs: persisted settings, the state store and the
/// monitor wired to the real camera, classifier and audio.
pub struct AppState {
    pub settings: SettingsStore,
    pub store: Arc<dyn StateStore>,
    pub monitor: MonitorController,
}

impl AppState {
    /// `ephemeral` keeps quota and entitlement in memory only.
    pub async fn open(data_dir: PathBuf, ephemeral: bool) -> Result<Self> {
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;

        let settings = SettingsStore::new(data_dir.join("settings.json"))?;
        let store = open_store(&data_dir, ephemeral)?;
        let effective = settings.effective();
        let monitor = build_monitor(&effective, store.clone()).await;

        info!("Focus Guardian ready (data in {})", data_dir.display());

        Ok(Self {
            settings,
            store,
            monitor,
        })
    }
}

pub fn open_store(data_dir: &std::path::Path, ephemeral: bool) -> Result<Arc<dyn StateStore>> {
    if ephemeral {
        return Ok(Arc::new(MemoryStore::new()));
    }
    let database = Database::new(data_dir.join("focus-guardian.sqlite3"))?;
    Ok(Arc::new(database))
}

pub async fn build_monitor(settings: &Settings, store: Arc<dyn StateStore>) -> MonitorController {
    let camera = SnapshotFileSource::new(
        settings.camera.snapshot_path.clone(),
        Duration::from_secs(settings.camera.max_frame_age_secs),
    );
    let deps = MonitorDeps::new(
        store,
        Arc::new(camera),
        Arc::new(GeminiClassifier::new(&settings.classifier)),
        Arc::new(SystemAudio::new(settings.audio.speech_command.clone())),
    );
    MonitorController::new(settings, deps).await
}
