//! Terminal rendering of controller events and the history view.

use std::io::{self, Write};

use chrono::Local;

use crate::{
    history::{format_clock, format_duration},
    models::{HistoryEntry, Notice, NoticeKind},
    settings::NotificationPermission,
    timer::{Preset, TimerEvent, TimerSnapshot, TimerStatus},
};

pub fn render_event(event: &TimerEvent) {
    match event {
        TimerEvent::StateChanged(snapshot) => render_snapshot(snapshot),
        TimerEvent::Heartbeat { time_left } => {
            print!("\r  {}  ", format_clock(*time_left));
            let _ = io::stdout().flush();
        }
        TimerEvent::SessionFinished(entry) => {
            render_line(&format!(
                "Session {}: {} ({} of {})",
                entry.status.as_str(),
                entry.display_name(),
                format_duration(entry.actual_duration),
                format_duration(entry.planned_duration)
            ));
        }
        TimerEvent::Notice(notice) => render_notice(notice),
    }
}

pub fn render_snapshot(snapshot: &TimerSnapshot) {
    render_line(&status_line(snapshot));
}

pub fn render_notice(notice: &Notice) {
    match notice.kind() {
        NoticeKind::Error => render_line(&format!("! {}", notice.message())),
        NoticeKind::Info => render_line(&format!("* {}", notice.message())),
    }
}

pub fn render_history(entries: &[HistoryEntry], limit: Option<usize>) {
    if entries.is_empty() {
        render_line("No sessions recorded yet");
        return;
    }
    let shown = limit.unwrap_or(entries.len()).min(entries.len());
    for entry in &entries[..shown] {
        render_line(&history_line(entry));
    }
}

pub fn render_clear_prompt() {
    render_line("Clear the whole history? Type `yes` to confirm");
}

pub fn render_permission(permission: NotificationPermission) {
    let text = match permission {
        NotificationPermission::Granted => "Desktop notifications enabled",
        NotificationPermission::Denied => "Desktop notifications disabled",
        NotificationPermission::Default => "Desktop notifications will be asked about again",
    };
    render_line(text);
}

pub fn render_help() {
    let presets: Vec<_> = Preset::ALL.iter().map(Preset::name).collect();
    render_line("Commands:");
    render_line("  <space>/<enter>   start or pause");
    render_line("  s | p | r         start, pause, reset (also ^r)");
    render_line("  name <text>       label the session");
    render_line("  set H:MM:SS       configure the duration");
    render_line(&format!("  preset <name>     {}", presets.join(", ")));
    render_line("  history | timer   switch views");
    render_line("  clear             clear history");
    render_line("  allow | deny      desktop notifications");
    render_line("  q                 quit (the session is kept)");
}

pub fn render_line(text: &str) {
    println!("\r{text}");
}

fn status_line(snapshot: &TimerSnapshot) -> String {
    let state = &snapshot.state;
    let label = match state.status {
        TimerStatus::Idle => "Ready",
        TimerStatus::Running => "Running",
        TimerStatus::Paused => "Paused",
    };
    let mut line = format!("[{label}] {}", snapshot.remaining);
    if state.status != TimerStatus::Idle || state.time_left != state.total_time {
        line.push_str(&format!(" / {}", snapshot.configured));
    }
    if !state.session_name.is_empty() {
        line.push_str(&format!("  \"{}\"", state.session_name));
    }
    line
}

fn history_line(entry: &HistoryEntry) -> String {
    let started = entry.start_time.with_timezone(&Local);
    format!(
        "{}  {:<24}  planned {:>8}  actual {:>8}  {}",
        started.format("%d/%m/%Y %H:%M"),
        entry.display_name(),
        format_duration(entry.planned_duration),
        format_duration(entry.actual_duration),
        entry.status.label()
    )
}
