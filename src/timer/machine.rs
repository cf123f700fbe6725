//! Pure session transitions.
//!
//! Each transition mutates a [`TimerState`] and returns the side effects the
//! controller must carry out. Nothing here touches the store, the ticker, or
//! the notifier, so every lifecycle rule can be exercised with a plain value
//! and a timestamp.

use chrono::{DateTime, Utc};
use log::debug;
use uuid::Uuid;

use crate::models::{HistoryEntry, Notice, SessionStatus};

use super::{TimerConfig, TimerState, TimerStatus};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerCommand {
    Configure(TimerConfig),
    Start,
    Tick,
    Pause,
    Reset,
    Rename(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    StartTicker,
    StopTicker,
    PersistSnapshot,
    ClearSnapshot,
    AppendHistory(HistoryEntry),
    NotifyCompleted(HistoryEntry),
    Notice(Notice),
}

/// How a countdown reached zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// Observed by the ticker.
    Live,
    /// Reconstructed at startup from a snapshot that ran out while the
    /// process was gone.
    WhileAway,
}

pub fn apply(state: &mut TimerState, command: TimerCommand, now: DateTime<Utc>) -> Vec<Effect> {
    match command {
        TimerCommand::Configure(config) => configure(state, config),
        TimerCommand::Start => start(state, now),
        TimerCommand::Tick => tick(state, now),
        TimerCommand::Pause => pause(state, now),
        TimerCommand::Reset => reset(state, now),
        TimerCommand::Rename(name) => rename(state, name),
    }
}

fn configure(state: &mut TimerState, config: TimerConfig) -> Vec<Effect> {
    if state.is_active() {
        debug!("Ignoring configure while {:?}", state.status);
        return Vec::new();
    }
    state.set_duration(config.total_seconds());
    Vec::new()
}

fn start(state: &mut TimerState, now: DateTime<Utc>) -> Vec<Effect> {
    match state.status {
        TimerStatus::Running => Vec::new(),
        _ if state.total_time == 0 => vec![Effect::Notice(Notice::MissingDuration)],
        TimerStatus::Idle => {
            state.time_left = state.total_time;
            state.begin_session(Uuid::new_v4().to_string(), now);
            vec![Effect::StartTicker, Effect::PersistSnapshot]
        }
        TimerStatus::Paused => {
            state.resume(now);
            vec![Effect::StartTicker, Effect::PersistSnapshot]
        }
    }
}

fn tick(state: &mut TimerState, now: DateTime<Utc>) -> Vec<Effect> {
    if state.status != TimerStatus::Running {
        return Vec::new();
    }
    state.time_left = state.time_left.saturating_sub(1);
    if state.time_left == 0 {
        return complete(state, now, Completion::Live);
    }
    Vec::new()
}

fn pause(state: &mut TimerState, now: DateTime<Utc>) -> Vec<Effect> {
    if state.status != TimerStatus::Running {
        return Vec::new();
    }
    state.pause(now);
    vec![Effect::StopTicker, Effect::PersistSnapshot]
}

fn reset(state: &mut TimerState, now: DateTime<Utc>) -> Vec<Effect> {
    match state.status {
        TimerStatus::Idle => {
            state.time_left = state.total_time;
            Vec::new()
        }
        TimerStatus::Running => finish(state, SessionStatus::Cancelled, now),
        TimerStatus::Paused => finish(state, SessionStatus::Interrupted, now),
    }
}

fn rename(state: &mut TimerState, name: String) -> Vec<Effect> {
    state.session_name = name.trim().to_string();
    if state.is_active() {
        vec![Effect::PersistSnapshot]
    } else {
        Vec::new()
    }
}

/// The countdown hit zero: record it, go idle, and announce it.
pub fn complete(state: &mut TimerState, now: DateTime<Utc>, completion: Completion) -> Vec<Effect> {
    let session_name = state.session_name.clone();
    let entry = state.close_session(SessionStatus::Completed, now);
    let mut effects = closing_effects(entry.clone());
    match completion {
        Completion::Live => {
            effects.push(Effect::NotifyCompleted(entry));
            effects.push(Effect::Notice(Notice::Completed { session_name }));
        }
        Completion::WhileAway => {
            effects.push(Effect::Notice(Notice::CompletedWhileAway { session_name }));
        }
    }
    effects
}

fn finish(state: &mut TimerState, status: SessionStatus, now: DateTime<Utc>) -> Vec<Effect> {
    closing_effects(state.close_session(status, now))
}

fn closing_effects(entry: HistoryEntry) -> Vec<Effect> {
    vec![
        Effect::StopTicker,
        Effect::AppendHistory(entry),
        Effect::ClearSnapshot,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap() + Duration::seconds(secs)
    }

    fn configured(h: u64, m: u64, s: u64) -> TimerState {
        let mut state = TimerState::new();
        apply(
            &mut state,
            TimerCommand::Configure(TimerConfig::clamped(h, m, s)),
            t(0),
        );
        state
    }

    fn entries(effects: &[Effect]) -> Vec<HistoryEntry> {
        effects
            .iter()
            .filter_map(|effect| match effect {
                Effect::AppendHistory(entry) => Some(entry.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn configure_sets_total_and_time_left() {
        let state = configured(1, 2, 3);
        assert_eq!(state.total_time, 3723);
        assert_eq!(state.time_left, 3723);
        assert_eq!(state.status, TimerStatus::Idle);
    }

    #[test]
    fn configure_is_ignored_while_active() {
        let mut state = configured(0, 1, 0);
        apply(&mut state, TimerCommand::Start, t(0));
        let effects = apply(
            &mut state,
            TimerCommand::Configure(TimerConfig::clamped(0, 5, 0)),
            t(1),
        );
        assert!(effects.is_empty());
        assert_eq!(state.total_time, 60);
    }

    #[test]
    fn start_without_duration_only_reports() {
        let mut state = TimerState::new();
        let effects = apply(&mut state, TimerCommand::Start, t(0));
        assert_eq!(effects, vec![Effect::Notice(Notice::MissingDuration)]);
        assert_eq!(state.status, TimerStatus::Idle);
        assert_eq!(state.session_id, None);
    }

    #[test]
    fn start_from_idle_opens_a_session() {
        let mut state = configured(0, 0, 30);
        let effects = apply(&mut state, TimerCommand::Start, t(5));

        assert_eq!(effects, vec![Effect::StartTicker, Effect::PersistSnapshot]);
        assert_eq!(state.status, TimerStatus::Running);
        assert_eq!(state.started_at, Some(t(5)));
        assert!(state.session_id.is_some());
        assert_eq!(state.paused_accumulated_ms, 0);
    }

    #[test]
    fn repeated_start_and_pause_are_no_ops() {
        let mut state = configured(0, 0, 30);
        apply(&mut state, TimerCommand::Start, t(0));
        let id = state.session_id.clone();
        assert!(apply(&mut state, TimerCommand::Start, t(1)).is_empty());
        assert_eq!(state.session_id, id);

        apply(&mut state, TimerCommand::Pause, t(2));
        assert!(apply(&mut state, TimerCommand::Pause, t(3)).is_empty());
        assert_eq!(state.paused_at, Some(t(2)));
    }

    #[test]
    fn resume_keeps_session_identity() {
        let mut state = configured(0, 0, 30);
        apply(&mut state, TimerCommand::Start, t(0));
        let id = state.session_id.clone();

        let effects = apply(&mut state, TimerCommand::Pause, t(4));
        assert_eq!(effects, vec![Effect::StopTicker, Effect::PersistSnapshot]);

        apply(&mut state, TimerCommand::Start, t(10));
        assert_eq!(state.session_id, id);
        assert_eq!(state.started_at, Some(t(0)));
        assert_eq!(state.paused_accumulated_ms, 6_000);
    }

    #[test]
    fn tick_outside_running_does_nothing() {
        let mut state = configured(0, 0, 3);
        assert!(apply(&mut state, TimerCommand::Tick, t(1)).is_empty());
        assert_eq!(state.time_left, 3);
    }

    #[test]
    fn five_second_timer_completes_once() {
        let mut state = configured(0, 0, 5);
        apply(&mut state, TimerCommand::Start, t(0));

        let mut all = Vec::new();
        for second in 1..=5 {
            all.extend(apply(&mut state, TimerCommand::Tick, t(second)));
        }

        let recorded = entries(&all);
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].status, SessionStatus::Completed);
        assert_eq!(recorded[0].planned_duration, 5);
        assert_eq!(recorded[0].actual_duration, 5);
        assert_eq!(state.status, TimerStatus::Idle);
        assert_eq!(state.time_left, 5);
        assert!(all.contains(&Effect::ClearSnapshot));
        assert!(all.contains(&Effect::NotifyCompleted(recorded[0].clone())));
    }

    #[test]
    fn paused_time_is_excluded_from_actual_duration() {
        let mut state = configured(0, 1, 0);
        apply(&mut state, TimerCommand::Start, t(0));
        for second in 1..=10 {
            apply(&mut state, TimerCommand::Tick, t(second));
        }
        apply(&mut state, TimerCommand::Pause, t(10));
        apply(&mut state, TimerCommand::Start, t(30));
        assert_eq!(state.paused_accumulated_ms, 20_000);

        let mut all = Vec::new();
        for second in 31..=80 {
            all.extend(apply(&mut state, TimerCommand::Tick, t(second)));
        }

        let recorded = entries(&all);
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].actual_duration, 60);
        assert_eq!(state.status, TimerStatus::Idle);
    }

    #[test]
    fn reset_from_running_cancels() {
        let mut state = configured(0, 0, 30);
        apply(&mut state, TimerCommand::Start, t(0));
        apply(&mut state, TimerCommand::Tick, t(1));

        let effects = apply(&mut state, TimerCommand::Reset, t(7));
        let recorded = entries(&effects);
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].status, SessionStatus::Cancelled);
        assert_eq!(recorded[0].actual_duration, 7);
        assert_eq!(effects[0], Effect::StopTicker);
        assert!(effects.contains(&Effect::ClearSnapshot));
        assert_eq!(state.status, TimerStatus::Idle);
        assert_eq!(state.time_left, 30);
    }

    #[test]
    fn reset_from_paused_interrupts() {
        let mut state = configured(0, 0, 30);
        apply(&mut state, TimerCommand::Start, t(0));
        apply(&mut state, TimerCommand::Pause, t(4));

        let effects = apply(&mut state, TimerCommand::Reset, t(20));
        let recorded = entries(&effects);
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].status, SessionStatus::Interrupted);
        assert_eq!(recorded[0].actual_duration, 4);
    }

    #[test]
    fn reset_while_idle_records_nothing() {
        let mut state = configured(0, 0, 30);
        assert!(apply(&mut state, TimerCommand::Reset, t(0)).is_empty());
        assert_eq!(state.time_left, 30);
    }

    #[test]
    fn rename_persists_only_when_active() {
        let mut state = configured(0, 0, 30);
        assert!(apply(&mut state, TimerCommand::Rename("  Write ".into()), t(0)).is_empty());
        assert_eq!(state.session_name, "Write");

        apply(&mut state, TimerCommand::Start, t(0));
        assert_eq!(
            apply(&mut state, TimerCommand::Rename("Read".into()), t(1)),
            vec![Effect::PersistSnapshot]
        );
    }

    #[test]
    fn completion_while_away_skips_the_live_announcement() {
        let mut state = configured(0, 0, 10);
        state.session_name = "Draft".into();
        apply(&mut state, TimerCommand::Start, t(0));

        let effects = complete(&mut state, t(40), Completion::WhileAway);
        assert_eq!(entries(&effects).len(), 1);
        assert!(!effects
            .iter()
            .any(|effect| matches!(effect, Effect::NotifyCompleted(_))));
        assert!(effects.contains(&Effect::Notice(Notice::CompletedWhileAway {
            session_name: "Draft".into()
        })));
    }
}
