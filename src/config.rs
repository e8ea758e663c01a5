use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// A full stack grows to `capacity * GROWTH_FACTOR` (an empty one to 1).
pub const GROWTH_FACTOR: usize = 2;

/// A pop shrinks the buffer to `capacity / GROWTH_FACTOR` once
/// `size < capacity / GROWTH_FACTOR - SHRINK_SLACK`.
pub const SHRINK_SLACK: usize = 5;

/// Column width of an unoccupied poison slot in a dump, the length of `POISON`.
pub const POISON_WIDTH: usize = 6;

pub const DEFAULT_ROTATE_BYTES: u64 = 256 * 1024 * 1024;

/// Where the [`LogSink`](crate::log::LogSink) writes and when it moves on to a new file.
///
/// Files are named `{directory}/{prefix}{n}.{suffix}`, `n` counting up from 0 on every rotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub directory: PathBuf,
    pub prefix: String,
    pub suffix: String,
    pub rotate_bytes: u64,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("log"),
            prefix: "log".to_owned(),
            suffix: "txt".to_owned(),
            rotate_bytes: DEFAULT_ROTATE_BYTES,
        }
    }
}

impl LogConfig {
    pub fn file_path(&self, index: usize) -> PathBuf {
        self.directory
            .join(format!("{}{}.{}", self.prefix, index, self.suffix))
    }
}

/// How much of the unoccupied part of the buffer a dump draws.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DumpLevel {
    /// Every slot.
    #[default]
    All,
    /// Runs of never-written (poison) slots collapse into one `**` block.
    CollapsePoison,
    /// Everything above the top of the stack collapses into one `**` block.
    CollapseUnused,
}

impl FromStr for DumpLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(DumpLevel::All),
            "poison" | "collapse_poison" => Ok(DumpLevel::CollapsePoison),
            "unused" | "collapse_unused" => Ok(DumpLevel::CollapseUnused),
            other => Err(ConfigError::UnknownDumpLevel(other.to_owned())),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DumpOptions {
    pub level: DumpLevel,
}

impl DumpOptions {
    pub fn with_level(level: DumpLevel) -> Self {
        Self { level }
    }
}
