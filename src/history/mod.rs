mod format;
mod ledger;

pub use format::{format_clock, format_duration};
pub use ledger::{HistoryLedger, MAX_HISTORY_ENTRIES};
