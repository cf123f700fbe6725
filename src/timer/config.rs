use std::{fmt, str::FromStr};

use anyhow::{anyhow, bail, Result};
use serde::{Deserialize, Serialize};

pub const MAX_HOURS: u64 = 23;
pub const MAX_MINUTES: u64 = 59;
pub const MAX_SECONDS: u64 = 59;

/// A configured duration. Fields are clamped on construction, so
/// `total_seconds` always stays within one day.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimerConfig {
    hours: u64,
    minutes: u64,
    seconds: u64,
}

impl TimerConfig {
    pub fn clamped(hours: u64, minutes: u64, seconds: u64) -> Self {
        Self {
            hours: hours.min(MAX_HOURS),
            minutes: minutes.min(MAX_MINUTES),
            seconds: seconds.min(MAX_SECONDS),
        }
    }

    /// Splits a total back into fields, clamping anything past 23:59:59.
    pub fn from_seconds(total: u64) -> Self {
        Self::clamped(total / 3600, (total % 3600) / 60, total % 60)
    }

    pub fn hours(&self) -> u64 {
        self.hours
    }

    pub fn minutes(&self) -> u64 {
        self.minutes
    }

    pub fn seconds(&self) -> u64 {
        self.seconds
    }

    pub fn total_seconds(&self) -> u64 {
        self.hours * 3600 + self.minutes * 60 + self.seconds
    }
}

impl fmt::Display for TimerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02}:{:02}",
            self.hours, self.minutes, self.seconds
        )
    }
}

/// Accepts `H:MM:SS`, `M:SS`, or whitespace separated `H M S`.
impl FromStr for TimerConfig {
    type Err = anyhow::Error;

    fn from_str(input: &str) -> Result<Self> {
        let input = input.trim();
        let parts: Vec<&str> = if input.contains(':') {
            input.split(':').collect()
        } else {
            input.split_whitespace().collect()
        };

        let numbers = parts
            .iter()
            .map(|part| {
                part.trim()
                    .parse::<u64>()
                    .map_err(|_| anyhow!("invalid duration component '{part}'"))
            })
            .collect::<Result<Vec<_>>>()?;

        match numbers.as_slice() {
            [h, m, s] => Ok(Self::clamped(*h, *m, *s)),
            [m, s] if input.contains(':') => Ok(Self::clamped(0, *m, *s)),
            _ => bail!("expected H:MM:SS, M:SS or H M S, got '{input}'"),
        }
    }
}

/// Named durations offered as one-step shortcuts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    Pomodoro,
    ShortBreak,
    LongBreak,
    Hour,
}

impl Preset {
    pub const ALL: [Preset; 4] = [
        Preset::Pomodoro,
        Preset::ShortBreak,
        Preset::LongBreak,
        Preset::Hour,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Preset::Pomodoro => "pomodoro",
            Preset::ShortBreak => "short-break",
            Preset::LongBreak => "long-break",
            Preset::Hour => "hour",
        }
    }

    pub fn seconds(&self) -> u64 {
        match self {
            Preset::Pomodoro => 25 * 60,
            Preset::ShortBreak => 5 * 60,
            Preset::LongBreak => 15 * 60,
            Preset::Hour => 3600,
        }
    }

    pub fn config(&self) -> TimerConfig {
        TimerConfig::from_seconds(self.seconds())
    }
}

impl FromStr for Preset {
    type Err = anyhow::Error;

    fn from_str(input: &str) -> Result<Self> {
        let wanted = input.trim().to_ascii_lowercase();
        Preset::ALL
            .into_iter()
            .find(|preset| preset.name() == wanted)
            .ok_or_else(|| {
                let names: Vec<_> = Preset::ALL.iter().map(Preset::name).collect();
                anyhow!("unknown preset '{input}' (expected one of {})", names.join(", "))
            })
    }
}
