use std::{
    io::{self, Write},
    sync::Arc,
    time::Duration,
};

use log::{info, warn};

use crate::{
    audio,
    models::{completion_message, HistoryEntry},
    settings::{NotificationPermission, SettingsStore},
};

use super::Notifier;

/// Delay before asking about desktop notifications on an interactive launch.
pub const PERMISSION_PROMPT_DELAY: Duration = Duration::from_millis(1500);

const NOTIFICATION_TITLE: &str = "Timer complete";

/// Plays the chime and, when the user allowed it, raises a desktop
/// notification through the terminal (OSC 9, which most terminal emulators
/// forward to the OS notification center).
pub struct DesktopNotifier {
    settings: Arc<SettingsStore>,
}

impl DesktopNotifier {
    pub fn new(settings: Arc<SettingsStore>) -> Self {
        Self { settings }
    }

    /// True while the user has neither allowed nor denied notifications.
    pub fn should_prompt(&self) -> bool {
        self.settings.notification_permission() == NotificationPermission::Default
    }
}

impl Notifier for DesktopNotifier {
    fn session_completed(&self, entry: &HistoryEntry) {
        let chime = self.settings.chime();
        if chime.enabled {
            if let Err(err) = audio::play_completion_melody(chime.volume) {
                warn!("Failed to play completion chime: {err}");
            }
        }

        if self.settings.notification_permission() == NotificationPermission::Granted {
            let body = completion_message(&entry.session_name);
            if let Err(err) = send_system_notification(&mut io::stdout(), NOTIFICATION_TITLE, &body)
            {
                warn!("Failed to emit desktop notification: {err}");
            } else {
                info!("Desktop notification sent for session {}", entry.id);
            }
        }
    }
}

fn send_system_notification(out: &mut impl Write, title: &str, body: &str) -> io::Result<()> {
    let sanitize = |text: &str| text.replace(['\x07', '\x1b', ';'], " ");
    write!(out, "\x1b]9;{}: {}\x07", sanitize(title), sanitize(body))?;
    out.flush()
}
