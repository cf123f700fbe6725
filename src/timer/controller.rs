use std::{future::Future, pin::Pin, sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::{
    sync::{broadcast, Mutex},
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::{
    clock::Clock,
    history::{format_clock, HistoryLedger},
    models::{HistoryEntry, Notice},
    notify::Notifier,
    settings::DEFAULT_AUTOSAVE_INTERVAL_SECS,
    store::{KeyValueStore, CURRENT_SESSION_KEY},
};

use super::{
    machine::{self, Completion, Effect, TimerCommand},
    recovery::{self, Recovery, RecoveryOutcome},
    TimerConfig, TimerState, TimerStatus,
};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info, log_warn};

const EVENT_CAPACITY: usize = 64;

/// The state plus what a renderer needs to draw it.
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TimerSnapshot {
    pub state: TimerState,
    pub remaining: String,
    /// Configured hours/minutes/seconds fields, derived from `total_time`.
    pub configured: TimerConfig,
}

impl From<&TimerState> for TimerSnapshot {
    fn from(state: &TimerState) -> Self {
        Self {
            remaining: format_clock(state.time_left),
            configured: TimerConfig::from_seconds(state.total_time),
            state: state.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum TimerEvent {
    StateChanged(TimerSnapshot),
    Heartbeat { time_left: u64 },
    SessionFinished(HistoryEntry),
    Notice(Notice),
}

#[derive(Debug, Clone)]
pub struct TimerOptions {
    pub tick_interval: Duration,
    /// Ticks between snapshot rewrites while running.
    pub autosave_every_ticks: u32,
    /// When false the host drives [`TimerController::tick`] itself.
    pub spawn_ticker: bool,
}

impl Default for TimerOptions {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(1),
            autosave_every_ticks: DEFAULT_AUTOSAVE_INTERVAL_SECS as u32,
            spawn_ticker: true,
        }
    }
}

impl TimerOptions {
    pub fn manual() -> Self {
        Self {
            spawn_ticker: false,
            ..Self::default()
        }
    }

    pub fn with_autosave_secs(mut self, secs: u64) -> Self {
        let per_tick = self.tick_interval.as_secs().max(1);
        self.autosave_every_ticks = (secs / per_tick).clamp(1, u32::MAX as u64) as u32;
        self
    }
}

struct Ticker {
    handle: JoinHandle<()>,
    cancel: CancellationToken,
}

/// Owns the single live session and everything it touches.
///
/// Every transition runs to completion under the state lock, effects
/// included, so a tick can never interleave with a pause or reset. At most
/// one ticker task is alive; leaving `Running` cancels it.
#[derive(Clone)]
pub struct TimerController {
    state: Arc<Mutex<TimerState>>,
    history: Arc<Mutex<HistoryLedger>>,
    store: Arc<dyn KeyValueStore>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    events: broadcast::Sender<TimerEvent>,
    ticker: Arc<Mutex<Option<Ticker>>>,
    options: TimerOptions,
}

impl TimerController {
    pub async fn new(
        store: Arc<dyn KeyValueStore>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        options: TimerOptions,
    ) -> Self {
        let history = HistoryLedger::load(store.clone()).await;
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Self {
            state: Arc::new(Mutex::new(TimerState::new())),
            history: Arc::new(Mutex::new(history)),
            store,
            notifier,
            clock,
            events,
            ticker: Arc::new(Mutex::new(None)),
            options,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TimerEvent> {
        self.events.subscribe()
    }

    pub async fn get_state(&self) -> TimerState {
        self.state.lock().await.clone()
    }

    pub async fn get_snapshot(&self) -> TimerSnapshot {
        TimerSnapshot::from(&*self.state.lock().await)
    }

    pub async fn configure(&self, config: TimerConfig) -> TimerState {
        self.dispatch(TimerCommand::Configure(config)).await
    }

    pub async fn start(&self) -> TimerState {
        self.dispatch(TimerCommand::Start).await
    }

    pub async fn pause(&self) -> TimerState {
        self.dispatch(TimerCommand::Pause).await
    }

    /// The space-bar action: pause while running, start otherwise.
    pub async fn toggle(&self) -> TimerState {
        let running = self.state.lock().await.status == TimerStatus::Running;
        if running {
            self.pause().await
        } else {
            self.start().await
        }
    }

    pub async fn reset(&self) -> TimerState {
        self.dispatch(TimerCommand::Reset).await
    }

    pub async fn rename(&self, name: impl Into<String>) -> TimerState {
        self.dispatch(TimerCommand::Rename(name.into())).await
    }

    /// Advances the countdown by one second. The spawned ticker calls this
    /// path itself; hosts running with [`TimerOptions::manual`] call it
    /// directly.
    pub async fn tick(&self) -> TimerState {
        self.tick_guarded(None).await
    }

    pub async fn history(&self) -> Vec<HistoryEntry> {
        self.history.lock().await.entries().to_vec()
    }

    pub async fn clear_history(&self) {
        self.history.lock().await.clear().await;
        log_info!("History cleared");
        self.emit_notice(Notice::HistoryCleared);
    }

    pub fn emit_notice(&self, notice: Notice) {
        let _ = self.events.send(TimerEvent::Notice(notice));
    }

    pub async fn ticker_active(&self) -> bool {
        self.ticker
            .lock()
            .await
            .as_ref()
            .map(|ticker| !ticker.cancel.is_cancelled())
            .unwrap_or(false)
    }

    /// Reads the persisted snapshot and re-enters the matching state. Runs
    /// once at startup, before any user command.
    pub async fn recover(&self) -> RecoveryOutcome {
        let raw = match self.store.get(CURRENT_SESSION_KEY).await {
            Ok(raw) => raw,
            Err(err) => {
                log_error!("Failed to read session snapshot: {err:?}");
                None
            }
        };

        let mut state = self.state.lock().await;
        let now = self.clock.now();

        let outcome = match recovery::plan(raw.as_deref(), now) {
            Recovery::Fresh => RecoveryOutcome::Fresh,
            Recovery::Discarded(reason) => {
                self.clear_snapshot().await;
                RecoveryOutcome::Discarded(reason)
            }
            Recovery::Restored(restored) => {
                *state = restored;
                self.persist_snapshot(&state, now).await;
                if state.status == TimerStatus::Running {
                    self.spawn_ticker().await;
                }
                if state.time_left > 0 {
                    self.emit_notice(Notice::SessionRestored);
                }
                RecoveryOutcome::Restored(state.status)
            }
            Recovery::Expired(expired) => {
                *state = expired;
                let effects = machine::complete(&mut state, now, Completion::WhileAway);
                let entry = effects.iter().find_map(|effect| match effect {
                    Effect::AppendHistory(entry) => Some(entry.clone()),
                    _ => None,
                });
                self.run_effects(&state, effects, now).await;
                match entry {
                    Some(entry) => RecoveryOutcome::CompletedWhileAway(entry),
                    None => RecoveryOutcome::Fresh,
                }
            }
        };

        let snapshot = TimerSnapshot::from(&*state);
        drop(state);
        let _ = self.events.send(TimerEvent::StateChanged(snapshot));

        log_info!("Startup recovery finished: {:?}", outcome);
        outcome
    }

    /// Rewrites the snapshot of an active session; no-op while idle.
    pub async fn save_snapshot(&self) {
        let state = self.state.lock().await;
        self.persist_snapshot(&state, self.clock.now()).await;
    }

    /// Unload path: flush the snapshot and stop ticking without ending the
    /// session, so the next launch can pick it up.
    pub async fn shutdown(&self) {
        self.save_snapshot().await;

        let ticker = self.ticker.lock().await.take();
        if let Some(ticker) = ticker {
            ticker.cancel.cancel();
            if let Err(err) = ticker.handle.await {
                log_warn!("Ticker task ended abnormally: {err}");
            }
        }
    }

    async fn dispatch(&self, command: TimerCommand) -> TimerState {
        let mut state = self.state.lock().await;
        let now = self.clock.now();
        log_debug!("Applying {:?} while {:?}", command, state.status);

        let effects = machine::apply(&mut state, command, now);
        self.run_effects(&state, effects, now).await;

        let snapshot = state.clone();
        drop(state);
        self.emit_state_changed(&snapshot);
        snapshot
    }

    async fn tick_guarded(&self, ticker: Option<&CancellationToken>) -> TimerState {
        let mut state = self.state.lock().await;

        // A ticker cancelled while it waited for the lock must not tick a
        // session that has since been resumed under a newer ticker.
        if ticker.is_some_and(|token| token.is_cancelled()) {
            return state.clone();
        }

        let now = self.clock.now();
        let effects = machine::apply(&mut state, TimerCommand::Tick, now);
        let finished = !effects.is_empty();
        self.run_effects(&state, effects, now).await;

        let snapshot = state.clone();
        drop(state);

        if finished {
            self.emit_state_changed(&snapshot);
        } else if snapshot.status == TimerStatus::Running {
            let _ = self.events.send(TimerEvent::Heartbeat {
                time_left: snapshot.time_left,
            });
        }
        snapshot
    }

    async fn run_effects(&self, state: &TimerState, effects: Vec<Effect>, now: DateTime<Utc>) {
        for effect in effects {
            match effect {
                Effect::StartTicker => self.spawn_ticker().await,
                Effect::StopTicker => self.cancel_ticker().await,
                Effect::PersistSnapshot => self.persist_snapshot(state, now).await,
                Effect::ClearSnapshot => self.clear_snapshot().await,
                Effect::AppendHistory(entry) => {
                    self.history.lock().await.append(entry.clone()).await;
                    let _ = self.events.send(TimerEvent::SessionFinished(entry));
                }
                Effect::NotifyCompleted(entry) => self.notifier.session_completed(&entry),
                Effect::Notice(notice) => self.emit_notice(notice),
            }
        }
    }

    async fn persist_snapshot(&self, state: &TimerState, now: DateTime<Utc>) {
        let Some(snapshot) = state.to_snapshot(now) else {
            return;
        };

        let serialized = match serde_json::to_string(&snapshot) {
            Ok(serialized) => serialized,
            Err(err) => {
                log_error!("Failed to serialize session snapshot: {err}");
                return;
            }
        };

        if let Err(err) = self.store.set(CURRENT_SESSION_KEY, &serialized).await {
            log_error!("Failed to save current session: {err:?}");
        }
    }

    async fn clear_snapshot(&self) {
        if let Err(err) = self.store.remove(CURRENT_SESSION_KEY).await {
            log_error!("Failed to clear saved session: {err:?}");
        }
    }

    async fn spawn_ticker(&self) {
        if !self.options.spawn_ticker {
            return;
        }

        let mut ticker_guard = self.ticker.lock().await;
        if let Some(previous) = ticker_guard.take() {
            previous.cancel.cancel();
        }

        let cancel = CancellationToken::new();
        let controller = self.clone();
        let token = cancel.clone();
        let handle = tokio::spawn(controller.run_ticker(token));

        *ticker_guard = Some(Ticker { handle, cancel });
    }

    async fn cancel_ticker(&self) {
        // The ticker may be the caller (completion happens inside a tick), so
        // cancel cooperatively instead of aborting or joining.
        if let Some(ticker) = self.ticker.lock().await.take() {
            ticker.cancel.cancel();
        }
    }

    // Boxed because the tick path can itself start a ticker.
    fn run_ticker(self, cancel: CancellationToken) -> Pin<Box<dyn Future<Output = ()> + Send>> {
        Box::pin(async move {
            let period = self.options.tick_interval;
            let autosave_every = self.options.autosave_every_ticks.max(1);
            let mut interval = time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut ticks: u32 = 0;

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = interval.tick() => {
                        let snapshot = self.tick_guarded(Some(&cancel)).await;
                        if snapshot.status != TimerStatus::Running || cancel.is_cancelled() {
                            break;
                        }

                        ticks = ticks.wrapping_add(1);
                        if ticks % autosave_every == 0 {
                            log_debug!("Autosaving session with {}s left", snapshot.time_left);
                            self.save_snapshot().await;
                        }
                    }
                }
            }

            log_debug!("Ticker stopped");
        })
    }

    fn emit_state_changed(&self, state: &TimerState) {
        let _ = self
            .events
            .send(TimerEvent::StateChanged(TimerSnapshot::from(state)));
    }
}
