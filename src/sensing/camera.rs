use std::{
    fs,
    path::PathBuf,
    time::{Duration, SystemTime},
};

use super::Frame;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::log_warn;

/// Source of still frames. `None` means "not ready", a normal transient
/// condition that skips one cycle.
pub trait FrameSource: Send + Sync {
    fn capture_frame(&self) -> Option<Frame>;
}

/// Reads the snapshot an external capture tool (e.g. `fswebcam --loop`)
/// keeps overwriting. Stale snapshots are not the current view and are
/// reported as not ready.
pub struct SnapshotFileSource {
    path: PathBuf,
    max_age: Duration,
}

impl SnapshotFileSource {
    pub fn new(path: PathBuf, max_age: Duration) -> Self {
        Self { path, max_age }
    }

    fn is_fresh(&self, modified: SystemTime) -> bool {
        match SystemTime::now().duration_since(modified) {
            Ok(age) => age <= self.max_age,
            // Modified "in the future" (clock skew): still the latest frame.
            Err(_) => true,
        }
    }
}

impl FrameSource for SnapshotFileSource {
    fn capture_frame(&self) -> Option<Frame> {
        let metadata = fs::metadata(&self.path).ok()?;
        let modified = metadata.modified().ok()?;
        if !self.is_fresh(modified) {
            return None;
        }

        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) => {
                log_warn!("Failed to read snapshot {}: {err}", self.path.display());
                return None;
            }
        };

        match Frame::from_bytes(bytes) {
            Ok(frame) => Some(frame),
            Err(err) => {
                log_warn!("Discarding snapshot {}: {err:#}", self.path.display());
                None
            }
        }
    }
}
