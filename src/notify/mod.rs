//! Completion signals: the chime and the desktop notification.

mod desktop;

pub use desktop::{DesktopNotifier, PERMISSION_PROMPT_DELAY};

use crate::models::HistoryEntry;

/// Receives natural completions. Implementations must contain their own
/// failures; nothing here may reach back into the timer.
pub trait Notifier: Send + Sync {
    fn session_completed(&self, entry: &HistoryEntry);
}

/// Discards every signal. Used by read-only commands.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn session_completed(&self, _entry: &HistoryEntry) {}
}
