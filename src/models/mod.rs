mod notice;
mod session;
mod snapshot;

pub(crate) use notice::completion_message;
pub use notice::{Notice, NoticeKind};
pub use session::{HistoryEntry, SessionStatus, UNTITLED_SESSION};
pub use snapshot::PersistedSnapshot;
