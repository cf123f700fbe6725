use chrono::{DateTime, Utc};
use log::warn;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{HistoryEntry, PersistedSnapshot, SessionStatus};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum TimerStatus {
    #[default]
    Idle,
    Running,
    Paused,
}

/// Live state of the current run-cycle.
///
/// `started_at` and `session_id` are set exactly when the status is not
/// `Idle`; `paused_at` is set exactly when it is `Paused`. `time_left` never
/// exceeds `total_time`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TimerState {
    pub status: TimerStatus,
    pub session_id: Option<String>,
    pub session_name: String,
    pub total_time: u64,
    pub time_left: u64,
    pub started_at: Option<DateTime<Utc>>,
    /// Milliseconds spent paused in finished pauses of this run-cycle.
    pub paused_accumulated_ms: u64,
    pub paused_at: Option<DateTime<Utc>>,
}

impl TimerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.status != TimerStatus::Idle
    }

    pub fn set_duration(&mut self, total_seconds: u64) {
        self.total_time = total_seconds;
        self.time_left = total_seconds;
    }

    pub fn begin_session(&mut self, session_id: String, now: DateTime<Utc>) {
        self.status = TimerStatus::Running;
        self.session_id = Some(session_id);
        self.started_at = Some(now);
        self.paused_accumulated_ms = 0;
        self.paused_at = None;
    }

    pub fn pause(&mut self, now: DateTime<Utc>) {
        self.status = TimerStatus::Paused;
        self.paused_at = Some(now);
    }

    pub fn resume(&mut self, now: DateTime<Utc>) {
        self.fold_pause(now);
        self.status = TimerStatus::Running;
    }

    /// Total paused milliseconds, counting an open pause up to `now`.
    pub fn paused_ms_at(&self, now: DateTime<Utc>) -> u64 {
        let open = self
            .paused_at
            .map(|since| millis_between(since, now))
            .unwrap_or(0);
        self.paused_accumulated_ms.saturating_add(open)
    }

    /// Whole seconds of work since `started_at`, net of pauses. Clock skew that
    /// would make this negative records zero.
    pub fn actual_duration_secs(&self, now: DateTime<Utc>) -> u64 {
        let Some(started_at) = self.started_at else {
            return 0;
        };
        let elapsed_ms = (now - started_at).num_milliseconds();
        let paused_ms = i64::try_from(self.paused_ms_at(now)).unwrap_or(i64::MAX);
        let net_ms = elapsed_ms.saturating_sub(paused_ms);
        if net_ms < 0 {
            warn!(
                "Session window is negative ({net_ms}ms); clock moved backwards? Recording 0s"
            );
            return 0;
        }
        (net_ms / 1000) as u64
    }

    /// Ends the run-cycle: builds the history record and returns to `Idle`
    /// with the configured duration reloaded. The name is kept for the next
    /// run.
    pub fn close_session(&mut self, status: SessionStatus, now: DateTime<Utc>) -> HistoryEntry {
        let entry = HistoryEntry {
            id: self
                .session_id
                .clone()
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            start_time: self.started_at.unwrap_or(now),
            session_name: self.session_name.clone(),
            planned_duration: self.total_time,
            actual_duration: self.actual_duration_secs(now),
            status,
        };

        self.clear_session();
        entry
    }

    pub fn clear_session(&mut self) {
        self.status = TimerStatus::Idle;
        self.session_id = None;
        self.started_at = None;
        self.paused_accumulated_ms = 0;
        self.paused_at = None;
        self.time_left = self.total_time;
    }

    pub fn to_snapshot(&self, now: DateTime<Utc>) -> Option<PersistedSnapshot> {
        if !self.is_active() {
            return None;
        }
        Some(PersistedSnapshot {
            session_id: self.session_id.clone()?,
            session_name: self.session_name.clone(),
            total_time: self.total_time,
            time_left: self.time_left,
            started_at: self.started_at?,
            paused_accumulated_ms: self.paused_accumulated_ms,
            paused_at: self.paused_at,
            is_running: self.status == TimerStatus::Running,
            is_paused: self.status == TimerStatus::Paused,
            last_save_time: now,
        })
    }

    fn fold_pause(&mut self, now: DateTime<Utc>) {
        if let Some(since) = self.paused_at.take() {
            self.paused_accumulated_ms = self
                .paused_accumulated_ms
                .saturating_add(millis_between(since, now));
        }
    }
}

fn millis_between(from: DateTime<Utc>, to: DateTime<Utc>) -> u64 {
    (to - from).num_milliseconds().max(0) as u64
}
