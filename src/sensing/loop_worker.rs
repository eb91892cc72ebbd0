use std::ops::ControlFlow;

use tokio::time::{self, Duration, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::monitor::MonitorController;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

// Import the logging macros (exported at crate root)
use crate::log_info;

/// Fires one classification cycle immediately, then every `interval`. Each
/// cycle runs as its own task, so a slow classification overlaps the next
/// capture instead of delaying it.
pub async fn classification_loop(
    monitor: MonitorController,
    epoch: u64,
    interval: Duration,
    cancel_token: CancellationToken,
) {
    let mut ticker = time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel_token.cancelled() => {
                log_info!("classification loop shutting down (session {epoch})");
                break;
            }
            _ = ticker.tick() => {
                tokio::spawn(monitor.clone().run_cycle(epoch));
            }
        }
    }
}

/// Counts usage once per `period`, starting one period after launch. Exits
/// when cancelled or when the tick ends the session.
pub async fn usage_loop(
    monitor: MonitorController,
    epoch: u64,
    period: Duration,
    cancel_token: CancellationToken,
) {
    let mut ticker = time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel_token.cancelled() => {
                log_info!("usage loop shutting down (session {epoch})");
                break;
            }
            _ = ticker.tick() => {
                if let ControlFlow::Break(()) = monitor.apply_usage_tick(epoch).await {
                    log_info!("usage loop finished (session {epoch})");
                    break;
                }
            }
        }
    }
}
