use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Durable projection of an active session, stored under `currentSession`.
///
/// There is no version field: changing this shape breaks snapshots written by
/// older builds, which recovery then discards as corrupt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PersistedSnapshot {
    pub session_id: String,
    #[serde(default)]
    pub session_name: String,
    pub total_time: u64,
    pub time_left: u64,
    pub started_at: DateTime<Utc>,
    pub paused_accumulated_ms: u64,
    /// Start of the pause in progress when the snapshot was written.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paused_at: Option<DateTime<Utc>>,
    pub is_running: bool,
    pub is_paused: bool,
    pub last_save_time: DateTime<Utc>,
}
