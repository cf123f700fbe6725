pub(crate) mod commands;
pub mod config;
pub mod controller;
pub mod machine;
pub mod recovery;
pub mod state;

pub use config::{Preset, TimerConfig};
pub use controller::{TimerController, TimerEvent, TimerOptions, TimerSnapshot};
pub use recovery::{DiscardReason, RecoveryOutcome};
pub use state::{TimerState, TimerStatus};
