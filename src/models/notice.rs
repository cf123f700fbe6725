use serde::Serialize;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum NoticeKind {
    Info,
    Error,
}

/// Transient user-facing messages. Validation failures are the only error
/// the user ever sees; everything else degrades quietly.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum Notice {
    MissingDuration,
    SessionRestored,
    CompletedWhileAway { session_name: String },
    Completed { session_name: String },
    NotificationPrompt,
    HistoryCleared,
}

impl Notice {
    pub fn kind(&self) -> NoticeKind {
        match self {
            Notice::MissingDuration => NoticeKind::Error,
            _ => NoticeKind::Info,
        }
    }

    pub fn message(&self) -> String {
        match self {
            Notice::MissingDuration => "Please set a duration before starting".to_string(),
            Notice::SessionRestored => "Previous session restored".to_string(),
            Notice::CompletedWhileAway { .. } => {
                "Your previous session finished while you were away".to_string()
            }
            Notice::Completed { session_name } => completion_message(session_name),
            Notice::NotificationPrompt => {
                "Desktop notifications are off. Type `allow` or `deny` to decide.".to_string()
            }
            Notice::HistoryCleared => "History cleared".to_string(),
        }
    }
}

pub(crate) fn completion_message(session_name: &str) -> String {
    if session_name.is_empty() {
        "Your work session has finished. Nice work!".to_string()
    } else {
        format!("\"{session_name}\" has finished! Nice work!")
    }
}
