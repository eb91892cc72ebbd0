use anyhow::{bail, Result};
use log::info;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::monitor::MonitorController;
use crate::settings::PollingSettings;

use super::loop_worker::{classification_loop, usage_loop};

/// The two recurring tasks of a monitoring session. Running exactly when a
/// cancellation token is held.
pub struct PollingController {
    handles: Vec<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
}

impl PollingController {
    pub fn new() -> Self {
        Self {
            handles: Vec::new(),
            cancel_token: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.cancel_token.is_some()
    }

    pub fn start(
        &mut self,
        monitor: MonitorController,
        epoch: u64,
        settings: &PollingSettings,
    ) -> Result<()> {
        if self.is_running() {
            bail!("polling already active");
        }

        let cancel_token = CancellationToken::new();

        let cycle = tokio::spawn(classification_loop(
            monitor.clone(),
            epoch,
            settings.check_interval(),
            cancel_token.clone(),
        ));
        let usage = tokio::spawn(usage_loop(
            monitor,
            epoch,
            settings.usage_tick(),
            cancel_token.clone(),
        ));

        info!(
            "Polling started: classify every {}s, usage tick every {}s",
            settings.check_interval().as_secs(),
            settings.usage_tick().as_secs()
        );

        self.handles = vec![cycle, usage];
        self.cancel_token = Some(cancel_token);
        Ok(())
    }

    /// Cancels both loops and hands back their join handles, or `None` when
    /// nothing was running. In-flight classification calls are left alone.
    pub fn stop(&mut self) -> Option<Vec<JoinHandle<()>>> {
        let token = self.cancel_token.take()?;
        token.cancel();
        info!("Polling cancelled");
        Some(std::mem::take(&mut self.handles))
    }
}

impl Default for PollingController {
    fn default() -> Self {
        Self::new()
    }
}
