//! History records produced by terminal transitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Name shown for sessions the user never labelled.
pub const UNTITLED_SESSION: &str = "Untitled session";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Completed,
    Cancelled,
    Interrupted,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Completed => "completed",
            SessionStatus::Cancelled => "cancelled",
            SessionStatus::Interrupted => "interrupted",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SessionStatus::Completed => "Completed",
            SessionStatus::Cancelled => "Cancelled",
            SessionStatus::Interrupted => "Interrupted",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: String,
    pub start_time: DateTime<Utc>,
    pub session_name: String,
    /// Configured duration, in seconds.
    pub planned_duration: u64,
    /// Wall-clock seconds from start to the terminal transition, net of pauses.
    pub actual_duration: u64,
    pub status: SessionStatus,
}

impl HistoryEntry {
    pub fn display_name(&self) -> &str {
        if self.session_name.is_empty() {
            UNTITLED_SESSION
        } else {
            &self.session_name
        }
    }
}
