use anyhow::{anyhow, Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, sync::RwLock};

/// Seconds between snapshot rewrites while a session is running.
pub const DEFAULT_AUTOSAVE_INTERVAL_SECS: u64 = 30;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChimeSettings {
    pub enabled: bool,
    pub volume: f32,
}

impl Default for ChimeSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            volume: 0.6,
        }
    }
}

/// The user's answer to the desktop notification prompt.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum NotificationPermission {
    #[default]
    Default,
    Granted,
    Denied,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
struct UserSettings {
    chime: ChimeSettings,
    notifications: NotificationPermission,
    autosave_interval_secs: u64,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            chime: ChimeSettings::default(),
            notifications: NotificationPermission::Default,
            autosave_interval_secs: DEFAULT_AUTOSAVE_INTERVAL_SECS,
        }
    }
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<UserSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                warn!(
                    "Ignoring unreadable settings at {}: {err}",
                    path.display()
                );
                UserSettings::default()
            })
        } else {
            UserSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn chime(&self) -> ChimeSettings {
        self.read(|data| data.chime.clone())
    }

    pub fn notification_permission(&self) -> NotificationPermission {
        self.read(|data| data.notifications)
    }

    pub fn autosave_interval_secs(&self) -> u64 {
        self.read(|data| data.autosave_interval_secs.max(1))
    }

    pub fn update_chime(&self, settings: ChimeSettings) -> Result<()> {
        self.write(|data| {
            data.chime = ChimeSettings {
                volume: settings.volume.clamp(0.0, 1.0),
                ..settings
            }
        })
    }

    pub fn set_notification_permission(&self, permission: NotificationPermission) -> Result<()> {
        self.write(|data| data.notifications = permission)
    }

    fn read<T>(&self, f: impl FnOnce(&UserSettings) -> T) -> T {
        match self.data.read() {
            Ok(guard) => f(&guard),
            Err(poisoned) => f(&poisoned.into_inner()),
        }
    }

    fn write(&self, f: impl FnOnce(&mut UserSettings)) -> Result<()> {
        let mut guard = self
            .data
            .write()
            .map_err(|_| anyhow!("settings lock poisoned"))?;
        f(&mut guard);
        self.persist(&guard)
    }

    fn persist(&self, data: &UserSettings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create settings directory {}", parent.display())
            })?;
        }
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("settings.json")).unwrap();

        assert_eq!(store.chime(), ChimeSettings::default());
        assert_eq!(
            store.notification_permission(),
            NotificationPermission::Default
        );
        assert_eq!(
            store.autosave_interval_secs(),
            DEFAULT_AUTOSAVE_INTERVAL_SECS
        );
    }

    #[test]
    fn updates_are_written_and_reloaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        let store = SettingsStore::new(path.clone()).unwrap();
        store
            .set_notification_permission(NotificationPermission::Granted)
            .unwrap();
        store
            .update_chime(ChimeSettings {
                enabled: false,
                volume: 3.0,
            })
            .unwrap();

        let reloaded = SettingsStore::new(path).unwrap();
        assert_eq!(
            reloaded.notification_permission(),
            NotificationPermission::Granted
        );
        let chime = reloaded.chime();
        assert!(!chime.enabled);
        assert_eq!(chime.volume, 1.0);
    }

    #[test]
    fn corrupt_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{not json").unwrap();

        let store = SettingsStore::new(path).unwrap();
        assert_eq!(
            store.notification_permission(),
            NotificationPermission::Default
        );
    }

    #[test]
    fn partial_file_keeps_remaining_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"notifications":"denied"}"#).unwrap();

        let store = SettingsStore::new(path).unwrap();
        assert_eq!(
            store.notification_permission(),
            NotificationPermission::Denied
        );
        assert!(store.chime().enabled);
    }
}
