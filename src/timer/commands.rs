use anyhow::{anyhow, Result};
use log::error;

use crate::{
    settings::NotificationPermission,
    timer::{Preset, TimerConfig},
    ui, AppState,
};

/// One line of interactive input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Control {
    /// Space bar: start when stopped, pause when running.
    Toggle,
    Start,
    Pause,
    /// Modifier+R.
    Reset,
    Rename(String),
    Configure(TimerConfig),
    Preset(Preset),
    ShowHistory,
    ShowTimer,
    ClearHistory,
    Dismiss,
    Notifications(NotificationPermission),
    Help,
    Quit,
}

/// What the input loop should do after a control ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// Ask before clearing; the next line answers.
    ConfirmClear,
    Quit,
}

pub fn parse_control(line: &str) -> Result<Control> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(Control::Toggle);
    }

    let (word, rest) = match trimmed.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (trimmed, ""),
    };

    let control = match word.to_ascii_lowercase().as_str() {
        "t" | "toggle" | "space" => Control::Toggle,
        "s" | "start" | "resume" => Control::Start,
        "p" | "pause" => Control::Pause,
        "r" | "reset" | "^r" | "ctrl+r" | "ctrl-r" => Control::Reset,
        "n" | "name" => Control::Rename(rest.to_string()),
        "set" => Control::Configure(rest.parse()?),
        "preset" => Control::Preset(rest.parse()?),
        "h" | "history" => Control::ShowHistory,
        "timer" => Control::ShowTimer,
        "clear" => Control::ClearHistory,
        "d" | "dismiss" => Control::Dismiss,
        "allow" => Control::Notifications(NotificationPermission::Granted),
        "deny" => Control::Notifications(NotificationPermission::Denied),
        "?" | "help" => Control::Help,
        "q" | "quit" | "exit" => Control::Quit,
        other => return Err(anyhow!("unknown command '{other}' (type `help`)")),
    };

    Ok(control)
}

pub async fn execute(app: &AppState, control: Control) -> Flow {
    match control {
        Control::Toggle => {
            app.timer.toggle().await;
        }
        Control::Start => {
            app.timer.start().await;
        }
        Control::Pause => {
            app.timer.pause().await;
        }
        Control::Reset => {
            app.timer.reset().await;
        }
        Control::Rename(name) => {
            app.timer.rename(name).await;
        }
        Control::Configure(config) => configure(app, config).await,
        Control::Preset(preset) => configure(app, preset.config()).await,
        Control::ShowHistory => ui::render_history(&app.timer.history().await, None),
        Control::ShowTimer | Control::Dismiss => {
            ui::render_snapshot(&app.timer.get_snapshot().await)
        }
        Control::ClearHistory => {
            ui::render_clear_prompt();
            return Flow::ConfirmClear;
        }
        Control::Notifications(permission) => {
            match app.settings.set_notification_permission(permission) {
                Ok(()) => ui::render_permission(permission),
                Err(err) => error!("Failed to save notification preference: {err:?}"),
            }
        }
        Control::Help => ui::render_help(),
        Control::Quit => return Flow::Quit,
    }
    Flow::Continue
}

async fn configure(app: &AppState, config: TimerConfig) {
    if app.timer.get_state().await.is_active() {
        ui::render_line("Reset the current session before changing its duration");
        return;
    }
    app.timer.configure(config).await;
}
