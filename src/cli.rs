use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use directories::ProjectDirs;
use log::{info, warn};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::broadcast::error::RecvError,
    task::JoinHandle,
};

use crate::{
    clock::{Clock, SystemClock},
    models::Notice,
    notify::PERMISSION_PROMPT_DELAY,
    settings::NotificationPermission,
    store::CURRENT_SESSION_KEY,
    timer::{
        commands::{execute, parse_control, Flow},
        recovery::{self, Recovery},
        Preset, TimerConfig, TimerSnapshot,
    },
    ui, AppState,
};

#[derive(Debug, Parser)]
#[command(name = "focustimer")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Where the session store and settings live.
    #[arg(long, global = true, value_name = "DIR", env = "FOCUSTIMER_DATA_DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Open the interactive timer (the default).
    Run(RunArgs),
    /// Print past sessions, newest first.
    History {
        #[arg(short, long, value_name = "N")]
        limit: Option<usize>,
    },
    /// Delete every history entry.
    ClearHistory {
        /// Skip the confirmation question.
        #[arg(short, long)]
        yes: bool,
    },
    /// Show the session that would be resumed on the next launch.
    Status,
    /// Allow or deny desktop notifications on completion.
    Notifications {
        #[arg(value_enum)]
        choice: PermissionChoice,
    },
}

#[derive(Debug, Default, Args)]
struct RunArgs {
    #[arg(long, value_name = "H")]
    hours: Option<u64>,
    #[arg(short, long, value_name = "M")]
    minutes: Option<u64>,
    #[arg(short, long, value_name = "S")]
    seconds: Option<u64>,
    /// pomodoro, short-break, long-break or hour.
    #[arg(short, long, conflicts_with_all = ["hours", "minutes", "seconds"])]
    preset: Option<Preset>,
    #[arg(short, long)]
    name: Option<String>,
    /// Configure the session without starting it.
    #[arg(long)]
    no_start: bool,
}

impl RunArgs {
    fn config(&self) -> Option<TimerConfig> {
        if let Some(preset) = self.preset {
            return Some(preset.config());
        }
        if self.hours.is_none() && self.minutes.is_none() && self.seconds.is_none() {
            return None;
        }
        Some(TimerConfig::clamped(
            self.hours.unwrap_or(0),
            self.minutes.unwrap_or(0),
            self.seconds.unwrap_or(0),
        ))
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PermissionChoice {
    Allow,
    Deny,
    /// Ask again on the next launch.
    Reset,
}

impl From<PermissionChoice> for NotificationPermission {
    fn from(choice: PermissionChoice) -> Self {
        match choice {
            PermissionChoice::Allow => NotificationPermission::Granted,
            PermissionChoice::Deny => NotificationPermission::Denied,
            PermissionChoice::Reset => NotificationPermission::Default,
        }
    }
}

impl Cli {
    fn resolve_data_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.data_dir {
            return Ok(dir.clone());
        }
        ProjectDirs::from("", "", "focustimer")
            .map(|dirs| dirs.data_dir().to_path_buf())
            .ok_or_else(|| anyhow!("could not determine a data directory, pass --data-dir"))
    }
}

pub async fn dispatch(cli: Cli) -> Result<()> {
    let data_dir = cli.resolve_data_dir()?;
    let interactive = matches!(cli.command, None | Some(Command::Run(_)));
    let app = AppState::open(&data_dir, interactive)
        .await
        .with_context(|| format!("failed to open data directory {}", data_dir.display()))?;

    match cli.command {
        None => run_interactive(app, RunArgs::default()).await,
        Some(Command::Run(args)) => run_interactive(app, args).await,
        Some(Command::History { limit }) => {
            ui::render_history(&app.timer.history().await, limit);
            Ok(())
        }
        Some(Command::ClearHistory { yes }) => clear_history(&app, yes).await,
        Some(Command::Status) => status(&app).await,
        Some(Command::Notifications { choice }) => {
            let permission = choice.into();
            app.settings.set_notification_permission(permission)?;
            ui::render_permission(permission);
            Ok(())
        }
    }
}

async fn run_interactive(app: AppState, args: RunArgs) -> Result<()> {
    let mut events = app.timer.subscribe();

    let outcome = app.timer.recover().await;
    if outcome.is_active() {
        if args.config().is_some() {
            ui::render_line("A saved session was resumed; reset it to start a new one");
        }
    } else {
        start_from_args(&app, &args).await;
    }
    ui::render_line("Type `help` for commands");

    let prompt = spawn_permission_prompt(&app);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut confirming_clear = false;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => break,
                    Err(err) => {
                        warn!("Failed to read input: {err}");
                        break;
                    }
                };

                if confirming_clear {
                    confirming_clear = false;
                    if is_yes(&line) {
                        app.timer.clear_history().await;
                    } else {
                        ui::render_line("History kept");
                    }
                    continue;
                }

                match parse_control(&line) {
                    Ok(control) => match execute(&app, control).await {
                        Flow::Continue => {}
                        Flow::ConfirmClear => confirming_clear = true,
                        Flow::Quit => break,
                    },
                    Err(err) => ui::render_line(&err.to_string()),
                }
            }
            event = events.recv() => match event {
                Ok(event) => ui::render_event(&event),
                Err(RecvError::Lagged(skipped)) => warn!("UI fell behind by {skipped} events"),
                Err(RecvError::Closed) => break,
            },
            _ = &mut ctrl_c => break,
        }
    }

    prompt.abort();
    app.timer.shutdown().await;
    info!("Interactive session closed");
    Ok(())
}

async fn start_from_args(app: &AppState, args: &RunArgs) {
    let Some(config) = args.config() else {
        return;
    };
    app.timer.configure(config).await;
    if let Some(name) = &args.name {
        app.timer.rename(name.clone()).await;
    }
    if !args.no_start {
        app.timer.start().await;
    }
}

fn spawn_permission_prompt(app: &AppState) -> JoinHandle<()> {
    let notifier = app.notifier.clone();
    let timer = app.timer.clone();
    tokio::spawn(async move {
        tokio::time::sleep(PERMISSION_PROMPT_DELAY).await;
        if notifier.should_prompt() {
            timer.emit_notice(Notice::NotificationPrompt);
        }
    })
}

async fn clear_history(app: &AppState, yes: bool) -> Result<()> {
    if !yes {
        ui::render_clear_prompt();
        let answer = tokio::task::spawn_blocking(|| {
            let mut line = String::new();
            std::io::stdin().read_line(&mut line).map(|_| line)
        })
        .await??;
        if !is_yes(&answer) {
            ui::render_line("History kept");
            return Ok(());
        }
    }
    app.timer.clear_history().await;
    ui::render_line("History cleared");
    Ok(())
}

async fn status(app: &AppState) -> Result<()> {
    let raw = app.store.get(CURRENT_SESSION_KEY).await?;
    match recovery::plan(raw.as_deref(), SystemClock.now()) {
        Recovery::Restored(state) => ui::render_snapshot(&TimerSnapshot::from(&state)),
        Recovery::Expired(state) => ui::render_line(&format!(
            "Session \"{}\" finished while the timer was closed; it is recorded on the next launch",
            state.session_name
        )),
        Recovery::Fresh | Recovery::Discarded(_) => ui::render_line("No session in progress"),
    }
    Ok(())
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
