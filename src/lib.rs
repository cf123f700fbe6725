mod audio;
mod cli;
pub mod clock;
pub mod history;
pub mod models;
pub mod notify;
pub mod settings;
pub mod store;
pub mod timer;
mod ui;
mod utils;

use std::{path::Path, sync::Arc, time::Duration};

use anyhow::Result;
use clap::Parser;
use log::info;

use clock::SystemClock;
use notify::{DesktopNotifier, Notifier, NullNotifier};
use settings::SettingsStore;
use store::{KeyValueStore, SqliteStore};
use timer::{TimerController, TimerOptions};

const DB_FILE: &str = "focustimer.sqlite3";
const SETTINGS_FILE: &str = "settings.json";

pub(crate) struct AppState {
    pub(crate) store: Arc<dyn KeyValueStore>,
    pub(crate) settings: Arc<SettingsStore>,
    pub(crate) notifier: Arc<DesktopNotifier>,
    pub(crate) timer: TimerController,
}

impl AppState {
    /// Opens the store and settings under `data_dir`. Only interactive hosts
    /// chime and notify on completion.
    pub(crate) async fn open(data_dir: &Path, interactive: bool) -> Result<Self> {
        std::fs::create_dir_all(data_dir)?;

        let store: Arc<dyn KeyValueStore> = Arc::new(SqliteStore::new(data_dir.join(DB_FILE))?);
        let settings = Arc::new(SettingsStore::new(data_dir.join(SETTINGS_FILE))?);
        let notifier = Arc::new(DesktopNotifier::new(settings.clone()));
        let completion: Arc<dyn Notifier> = if interactive {
            notifier.clone()
        } else {
            Arc::new(NullNotifier)
        };

        let options = TimerOptions::default().with_autosave_secs(settings.autosave_interval_secs());
        let timer = TimerController::new(
            store.clone(),
            completion,
            Arc::new(SystemClock),
            options,
        )
        .await;

        info!("Opened data directory {}", data_dir.display());
        Ok(Self {
            store,
            settings,
            notifier,
            timer,
        })
    }
}

fn debug_requested() -> bool {
    std::env::var("FOCUSTIMER_DEBUG")
        .map(|value| matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true"))
        .unwrap_or(false)
}

pub fn run() -> Result<()> {
    let cli = cli::Cli::parse();

    // Reads RUST_LOG, then pins the floor level.
    let level = if debug_requested() {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("focustimer")
        .build()?;
    let result = runtime.block_on(cli::dispatch(cli));
    // Stdin reads sit on a blocking thread that never returns on its own.
    runtime.shutdown_timeout(Duration::from_millis(250));
    result
}
