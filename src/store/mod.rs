//! String-keyed persistence used for the live snapshot and the history log.

mod memory;
mod migrations;
mod sqlite;

use anyhow::Result;
use async_trait::async_trait;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Key holding the JSON snapshot of the active session.
pub const CURRENT_SESSION_KEY: &str = "currentSession";

/// Key holding the JSON array of history entries, newest first.
pub const HISTORY_KEY: &str = "timerHistory";

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> Result<()>;
    async fn remove(&self, key: &str) -> Result<()>;
}
