//! Rebuilds the in-memory session from the persisted snapshot at startup.
//!
//! Planning is pure: given the raw `currentSession` value and the current
//! time it decides what the controller should do. The controller applies the
//! plan in [`TimerController::recover`](super::TimerController::recover).

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{HistoryEntry, PersistedSnapshot};

use super::{TimerState, TimerStatus};

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

/// Snapshots older than this are dropped instead of restored.
pub const STALE_AFTER_SECS: u64 = 24 * 60 * 60;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum DiscardReason {
    Corrupt,
    Stale,
    /// Neither running nor paused; nothing to resume.
    Inactive,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recovery {
    /// No snapshot stored.
    Fresh,
    Discarded(DiscardReason),
    /// Resume in the carried state (running with time left, or paused).
    Restored(TimerState),
    /// Running snapshot whose countdown ran out while the process was gone.
    /// The carried state is `Running` with zero time left, ready to complete.
    Expired(TimerState),
}

/// What startup recovery ended up doing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryOutcome {
    Fresh,
    Discarded(DiscardReason),
    Restored(TimerStatus),
    CompletedWhileAway(HistoryEntry),
}

impl RecoveryOutcome {
    pub fn is_active(&self) -> bool {
        matches!(self, RecoveryOutcome::Restored(_))
    }
}

pub fn plan(raw: Option<&str>, now: DateTime<Utc>) -> Recovery {
    let Some(raw) = raw else {
        return Recovery::Fresh;
    };

    let snapshot: PersistedSnapshot = match serde_json::from_str(raw) {
        Ok(snapshot) => snapshot,
        Err(err) => {
            log_warn!("Discarding unreadable session snapshot: {err}");
            return Recovery::Discarded(DiscardReason::Corrupt);
        }
    };

    let elapsed = (now - snapshot.last_save_time).num_seconds().max(0) as u64;
    if elapsed > STALE_AFTER_SECS {
        log_info!(
            "Discarding session {} saved {}s ago",
            snapshot.session_id,
            elapsed
        );
        return Recovery::Discarded(DiscardReason::Stale);
    }

    // Paused time can never exceed the wall time since the session began.
    let window_ms = (snapshot.last_save_time - snapshot.started_at)
        .num_milliseconds()
        .max(0) as u64;
    if snapshot.paused_accumulated_ms > window_ms {
        log_warn!(
            "Discarding session {}: {}ms paused within a {}ms window",
            snapshot.session_id,
            snapshot.paused_accumulated_ms,
            window_ms
        );
        return Recovery::Discarded(DiscardReason::Corrupt);
    }

    let mut state = TimerState {
        status: TimerStatus::Idle,
        session_id: Some(snapshot.session_id.clone()),
        session_name: snapshot.session_name.clone(),
        total_time: snapshot.total_time,
        time_left: snapshot.time_left.min(snapshot.total_time),
        started_at: Some(snapshot.started_at),
        paused_accumulated_ms: snapshot.paused_accumulated_ms,
        paused_at: None,
    };

    if snapshot.is_running && !snapshot.is_paused {
        state.status = TimerStatus::Running;
        state.time_left = state.time_left.saturating_sub(elapsed);
        if state.time_left > 0 {
            log_info!(
                "Resuming session {} with {}s left ({}s elapsed while away)",
                snapshot.session_id,
                state.time_left,
                elapsed
            );
            Recovery::Restored(state)
        } else {
            log_info!(
                "Session {} ran out while away",
                snapshot.session_id
            );
            Recovery::Expired(state)
        }
    } else if snapshot.is_paused {
        state.status = TimerStatus::Paused;
        state.paused_at = Some(snapshot.paused_at.unwrap_or(snapshot.last_save_time));
        log_info!(
            "Restoring paused session {} with {}s left",
            snapshot.session_id,
            state.time_left
        );
        Recovery::Restored(state)
    } else {
        Recovery::Discarded(DiscardReason::Inactive)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap() + Duration::seconds(secs)
    }

    fn running_state(total: u64, left: u64) -> TimerState {
        let mut state = TimerState::new();
        state.set_duration(total);
        state.session_name = "Reading".into();
        state.begin_session("sess-1".into(), t(0));
        state.time_left = left;
        state
    }

    fn raw(state: &TimerState, saved_at: DateTime<Utc>) -> String {
        serde_json::to_string(&state.to_snapshot(saved_at).unwrap()).unwrap()
    }

    #[test]
    fn nothing_stored_is_fresh() {
        assert_eq!(plan(None, t(0)), Recovery::Fresh);
    }

    #[test]
    fn malformed_json_is_discarded() {
        assert_eq!(
            plan(Some("{\"sessionId\": 4"), t(0)),
            Recovery::Discarded(DiscardReason::Corrupt)
        );
    }

    #[test]
    fn snapshots_older_than_a_day_are_stale() {
        let state = running_state(600, 300);
        let saved = raw(&state, t(0));

        assert_eq!(
            plan(Some(&saved), t(STALE_AFTER_SECS as i64 + 1)),
            Recovery::Discarded(DiscardReason::Stale)
        );

        let mut paused = state.clone();
        paused.pause(t(0));
        let saved = raw(&paused, t(0));
        assert_eq!(
            plan(Some(&saved), t(2 * STALE_AFTER_SECS as i64)),
            Recovery::Discarded(DiscardReason::Stale)
        );
    }

    #[test]
    fn exactly_one_day_is_still_restorable() {
        let state = running_state(600, 300);
        let saved = raw(&state, t(0));
        assert!(matches!(
            plan(Some(&saved), t(STALE_AFTER_SECS as i64)),
            Recovery::Expired(_)
        ));
    }

    #[test]
    fn immediate_round_trip_reproduces_state() {
        let state = running_state(600, 412);
        let saved = raw(&state, t(188));

        let Recovery::Restored(restored) = plan(Some(&saved), t(188)) else {
            panic!("expected a restored session");
        };
        assert_eq!(restored, state);
    }

    #[test]
    fn running_snapshot_deducts_time_away() {
        let state = running_state(600, 300);
        let saved = raw(&state, t(300));

        let Recovery::Restored(restored) = plan(Some(&saved), t(345)) else {
            panic!("expected a restored session");
        };
        assert_eq!(restored.status, TimerStatus::Running);
        assert_eq!(restored.time_left, 255);
        assert_eq!(restored.session_name, "Reading");
        assert_eq!(restored.started_at, Some(t(0)));
    }

    #[test]
    fn running_snapshot_that_ran_out_expires() {
        let state = running_state(60, 10);
        let saved = raw(&state, t(50));

        let Recovery::Expired(expired) = plan(Some(&saved), t(80)) else {
            panic!("expected an expired session");
        };
        assert_eq!(expired.status, TimerStatus::Running);
        assert_eq!(expired.time_left, 0);
        assert_eq!(expired.session_id.as_deref(), Some("sess-1"));
    }

    #[test]
    fn paused_snapshot_keeps_time_left_and_pause_start() {
        let mut state = running_state(600, 300);
        state.pause(t(300));
        let saved = raw(&state, t(310));

        let Recovery::Restored(restored) = plan(Some(&saved), t(5_000)) else {
            panic!("expected a restored session");
        };
        assert_eq!(restored.status, TimerStatus::Paused);
        assert_eq!(restored.time_left, 300);
        assert_eq!(restored.paused_at, Some(t(300)));
    }

    #[test]
    fn paused_snapshot_without_pause_start_uses_save_time() {
        let saved = serde_json::json!({
            "sessionId": "legacy",
            "sessionName": "",
            "totalTime": 120,
            "timeLeft": 90,
            "startedAt": "2024-06-01T09:00:00Z",
            "pausedAccumulatedMs": 0,
            "isRunning": false,
            "isPaused": true,
            "lastSaveTime": "2024-06-01T09:00:30Z"
        })
        .to_string();

        let Recovery::Restored(restored) = plan(Some(&saved), t(100)) else {
            panic!("expected a restored session");
        };
        assert_eq!(restored.paused_at, Some(t(30)));
        assert_eq!(restored.time_left, 90);
    }

    #[test]
    fn paused_total_longer_than_the_session_is_corrupt() {
        let saved = serde_json::json!({
            "sessionId": "bad",
            "sessionName": "",
            "totalTime": 60,
            "timeLeft": 5,
            "startedAt": "2024-06-01T09:00:00Z",
            "pausedAccumulatedMs": 9_223_372_036_854_775_808u64,
            "isRunning": true,
            "isPaused": false,
            "lastSaveTime": "2024-06-01T09:00:30Z"
        })
        .to_string();

        assert_eq!(
            plan(Some(&saved), t(60)),
            Recovery::Discarded(DiscardReason::Corrupt)
        );
    }

    #[test]
    fn inert_snapshot_is_discarded() {
        let mut state = running_state(60, 30);
        state.pause(t(10));
        let mut snapshot = state.to_snapshot(t(10)).unwrap();
        snapshot.is_paused = false;
        let saved = serde_json::to_string(&snapshot).unwrap();

        assert_eq!(
            plan(Some(&saved), t(11)),
            Recovery::Discarded(DiscardReason::Inactive)
        );
    }
}
