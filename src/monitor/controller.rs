use std::{ops::ControlFlow, sync::Arc};

use anyhow::{anyhow, bail, Result};
use tokio::{
    sync::{broadcast, Mutex},
    time::{self, Instant},
};

use crate::{
    audio::{feedback::START_ANNOUNCEMENT, AudioOutput, FeedbackPlayer, RandomSource, ThreadRandom},
    classifier::{ClassificationResult, FocusStatus, FrameClassifier},
    db::{QuotaRecord, StateStore},
    entitlement::EntitlementStore,
    gate::{GateDecision, LimitNotice, SessionGate},
    quota::QuotaLedger,
    sensing::{FrameSource, PollingController},
    settings::{PollingSettings, Settings},
    streak::StreakTracker,
};

use super::{
    state::{ActivityLog, MonitorState, PollingSession},
    MonitorEvent, MonitorSnapshot,
};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

const EVENT_CAPACITY: usize = 64;

pub type DaySource = Arc<dyn Fn() -> String + Send + Sync>;

/// External collaborators of the monitor.
pub struct MonitorDeps {
    pub store: Arc<dyn StateStore>,
    pub camera: Arc<dyn FrameSource>,
    pub classifier: Arc<dyn FrameClassifier>,
    pub audio: Arc<dyn AudioOutput>,
    pub random: Arc<dyn RandomSource>,
    /// Calendar day key used for the quota, `YYYY-MM-DD` in local time.
    pub day_source: DaySource,
}

impl MonitorDeps {
    pub fn new(
        store: Arc<dyn StateStore>,
        camera: Arc<dyn FrameSource>,
        classifier: Arc<dyn FrameClassifier>,
        audio: Arc<dyn AudioOutput>,
    ) -> Self {
        Self {
            store,
            camera,
            classifier,
            audio,
            random: Arc::new(ThreadRandom),
            day_source: Arc::new(QuotaRecord::today_key),
        }
    }

    pub fn with_random(mut self, random: Arc<dyn RandomSource>) -> Self {
        self.random = random;
        self
    }

    pub fn with_day_source(mut self, day_source: DaySource) -> Self {
        self.day_source = day_source;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    LimitReached(LimitNotice),
}

struct MonitorInner {
    state: Mutex<MonitorState>,
    camera: Arc<dyn FrameSource>,
    classifier: Arc<dyn FrameClassifier>,
    feedback: FeedbackPlayer,
    gate: SessionGate,
    polling: PollingSettings,
    day_source: DaySource,
    events: broadcast::Sender<MonitorEvent>,
}

/// Owns the monitoring session: gate checks, the two polling tasks, the quota
/// ledger and the streak tracker. Cheap to clone; clones share state.
///
/// Every state change, including its store write, happens under the one state
/// lock, so a result or tick is applied atomically relative to start/stop.
/// Events and audio go out after the lock is released.
#[derive(Clone)]
pub struct MonitorController {
    inner: Arc<MonitorInner>,
}

impl MonitorController {
    /// Loads today's quota and the entitlement flag from the store.
    pub async fn new(settings: &Settings, deps: MonitorDeps) -> Self {
        let today = (deps.day_source)();
        let state = MonitorState {
            polling: PollingController::new(),
            session: None,
            last_epoch: 0,
            status: None,
            message: String::new(),
            log: ActivityLog::new(settings.polling.log_capacity),
            tracker: StreakTracker::new(settings.streak.clone()),
            ledger: QuotaLedger::open(deps.store.clone(), &today).await,
            entitlement: EntitlementStore::open(deps.store).await,
            limit_notice: None,
        };

        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Self {
            inner: Arc::new(MonitorInner {
                state: Mutex::new(state),
                camera: deps.camera,
                classifier: deps.classifier,
                feedback: FeedbackPlayer::new(
                    settings.audio.clone(),
                    settings.polling.focused_speech_probability,
                    deps.audio,
                    deps.random,
                ),
                gate: SessionGate::new(settings.quota.daily_limit_secs),
                polling: settings.polling.clone(),
                day_source: deps.day_source,
                events,
            }),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MonitorEvent> {
        self.inner.events.subscribe()
    }

    pub async fn is_running(&self) -> bool {
        self.inner.state.lock().await.is_running()
    }

    pub async fn snapshot(&self) -> MonitorSnapshot {
        let state = self.inner.state.lock().await;
        let unlocked = state.entitlement.is_unlocked();
        MonitorSnapshot {
            running: state.is_running(),
            status: state.status,
            message: state.message.clone(),
            stats: state.tracker.stats().clone(),
            log: state.log.entries(),
            quota: state.ledger.record().clone(),
            remaining_seconds: (!unlocked)
                .then(|| state.ledger.remaining_seconds(self.inner.gate.daily_limit_secs())),
            unlocked,
            limit_notice: state.limit_notice.clone(),
        }
    }

    /// Starts monitoring unless the daily allowance is exhausted, in which
    /// case the limit notice is raised and spoken instead.
    pub async fn start(&self) -> Result<StartOutcome> {
        let mut state = self.inner.state.lock().await;
        if state.is_running() {
            bail!("monitoring already active");
        }

        let today = (self.inner.day_source)();
        state.ledger.roll_over(&today).await;

        let decision = self
            .inner
            .gate
            .request_start(state.entitlement.is_unlocked(), state.ledger.used_seconds());
        if let GateDecision::Denied(notice) = decision {
            state.limit_notice = Some(notice.clone());
            drop(state);

            log_info!(
                "Start denied: {}s of {}s used today",
                notice.used_seconds,
                notice.limit_seconds
            );
            self.emit(MonitorEvent::LimitReached {
                notice: notice.clone(),
            });
            self.inner.feedback.announce(&notice.message);
            return Ok(StartOutcome::LimitReached(notice));
        }

        let epoch = state.last_epoch + 1;
        state
            .polling
            .start(self.clone(), epoch, &self.inner.polling)?;
        state.last_epoch = epoch;
        state.session = Some(PollingSession {
            epoch,
            last_result_at: Instant::now(),
        });
        drop(state);

        log_info!("Monitoring started (session {epoch})");
        self.emit(MonitorEvent::StateChanged { running: true });
        self.inner.feedback.announce(START_ANNOUNCEMENT);
        Ok(StartOutcome::Started)
    }

    pub async fn stop(&self) -> Result<()> {
        let handles = {
            let mut state = self.inner.state.lock().await;
            if !state.is_running() {
                bail!("monitoring is not active");
            }
            end_session(&mut state)?
        };

        for handle in handles {
            if let Err(err) = handle.await {
                if !err.is_cancelled() {
                    log_warn!("polling task failed to join: {err}");
                }
            }
        }

        log_info!("Monitoring stopped");
        self.emit(MonitorEvent::StateChanged { running: false });
        Ok(())
    }

    /// Returns whether monitoring is running afterwards.
    pub async fn toggle(&self) -> Result<bool> {
        if self.is_running().await {
            self.stop().await?;
            Ok(false)
        } else {
            Ok(self.start().await? == StartOutcome::Started)
        }
    }

    /// Stops monitoring if it is running; used on teardown.
    pub async fn shutdown(&self) {
        if self.is_running().await {
            if let Err(err) = self.stop().await {
                log_warn!("shutdown stop failed: {err:#}");
            }
        }
    }

    pub async fn activate(&self, code: &str) -> Result<bool> {
        let mut state = self.inner.state.lock().await;
        let activated = state.entitlement.activate(code).await?;
        if activated {
            state.limit_notice = None;
        }
        Ok(activated)
    }

    pub async fn dismiss_limit_notice(&self) {
        self.inner.state.lock().await.limit_notice = None;
    }

    /// One capture → classify → apply iteration. Runs as its own task so a
    /// slow classification never delays the next capture.
    pub(crate) async fn run_cycle(self, epoch: u64) {
        let Some(frame) = self.inner.camera.capture_frame() else {
            log_warn!("Camera frame not ready, skipping cycle");
            return;
        };

        let timeout = self.inner.polling.classify_timeout();
        let result = match time::timeout(timeout, self.inner.classifier.classify(&frame)).await {
            Ok(Ok(result)) => result,
            Ok(Err(err)) => {
                log_warn!("Classification rejected: {err:#}");
                return;
            }
            Err(_) => {
                log_warn!("Classification timed out after {}s", timeout.as_secs());
                return;
            }
        };

        self.apply_classification(epoch, result).await;
    }

    /// Applies a result if the session it was started under is still the
    /// running one. Returns whether it was applied.
    pub(crate) async fn apply_classification(
        &self,
        epoch: u64,
        result: ClassificationResult,
    ) -> bool {
        let mut guard = self.inner.state.lock().await;
        let state = &mut *guard;

        let Some(session) = state.current_session(epoch) else {
            log_info!(
                "Discarding {} result from ended session {epoch}",
                result.status.as_str()
            );
            return false;
        };

        let now = Instant::now();
        let elapsed = now.saturating_duration_since(session.last_result_at);
        session.last_result_at = now;

        state.status = Some(result.status);
        state.message = result.message.clone();
        let achievement = state.tracker.apply_result(&result, elapsed);
        let entry = (result.status != FocusStatus::Error).then(|| state.log.push(&result));
        drop(guard);

        self.inner.feedback.on_result(&result);
        self.emit(MonitorEvent::Classified {
            result,
            entry,
        });

        if let Some(achievement) = achievement {
            log_info!("Achievement unlocked: {}", achievement.name);
            self.inner.feedback.on_achievement(&achievement);
            self.emit(MonitorEvent::AchievementUnlocked { achievement });
        }

        true
    }

    /// Counts one second of usage and stops the session in the same tick
    /// when the allowance runs out.
    pub(crate) async fn apply_usage_tick(&self, epoch: u64) -> ControlFlow<()> {
        let mut state = self.inner.state.lock().await;
        if state.current_session(epoch).is_none() {
            return ControlFlow::Break(());
        }

        let today = (self.inner.day_source)();
        state.ledger.roll_over(&today).await;
        let used_seconds = state.ledger.tick().await.used_seconds;
        let unlocked = state.entitlement.is_unlocked();

        if let Some(notice) = self.inner.gate.check_tick(unlocked, used_seconds) {
            // The loop calling us is one of the handles; let it finish on its own.
            if let Err(err) = end_session(&mut state) {
                log_warn!("failed to stop polling at limit: {err:#}");
            }
            state.limit_notice = Some(notice.clone());
            drop(state);

            log_info!("Daily limit reached after {used_seconds}s, monitoring stopped");
            self.emit(MonitorEvent::StateChanged { running: false });
            self.emit(MonitorEvent::LimitReached {
                notice: notice.clone(),
            });
            self.inner.feedback.announce(&notice.message);
            return ControlFlow::Break(());
        }

        let remaining_seconds =
            (!unlocked).then(|| state.ledger.remaining_seconds(self.inner.gate.daily_limit_secs()));
        drop(state);

        self.emit(MonitorEvent::UsageTick {
            used_seconds,
            remaining_seconds,
        });
        ControlFlow::Continue(())
    }

    fn emit(&self, event: MonitorEvent) {
        // No subscribers is fine.
        let _ = self.inner.events.send(event);
    }
}

fn end_session(state: &mut MonitorState) -> Result<Vec<tokio::task::JoinHandle<()>>> {
    let handles = state.polling.stop();
    state.session = None;
    state.clear_display();
    handles.ok_or_else(|| anyhow!("polling was not active"))
}
