//! Job lock status structures.

use chrono::{DateTime, Local};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

/// Snapshot of one job lock, as seen by an operator command.
#[derive(Debug, Clone, Serialize)]
pub struct JobStatus {
    /// The job mnemonic (lock file stem).
    pub mnemonic: String,

    /// The lock file path.
    pub path: PathBuf,

    /// Recorded owner pid, `None` when no lock file exists or it is corrupt.
    pub owner_pid: Option<u32>,

    /// Seconds since the lock file was last written (0 when absent).
    pub age_secs: u64,

    /// Local time the owner took the lock.
    pub held_since: Option<DateTime<Local>>,

    /// Whether the recorded owner is a running process.
    pub alive: bool,

    /// Whether the lock file exists but holds no pid.
    pub corrupt: bool,
}

impl JobStatus {
    /// Whether a lock file exists for this mnemonic.
    pub fn is_locked(&self) -> bool {
        self.owner_pid.is_some() || self.corrupt
    }

    /// A lock file whose owner is no longer running.
    pub fn is_stale(&self) -> bool {
        self.owner_pid.is_some() && !self.alive
    }

    pub(super) fn age(&self) -> Duration {
        Duration::from_secs(self.age_secs)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.corrupt {
            return write!(f, "{} (CORRUPT lock file: {})", self.mnemonic, self.path.display());
        }
        match self.owner_pid {
            None => write!(f, "{} (free)", self.mnemonic),
            Some(pid) => write!(
                f,
                "{} (pid: {}, age: {}{})",
                self.mnemonic,
                pid,
                format_age(self.age()),
                if self.alive { "" } else { ", STALE" }
            ),
        }
    }
}

/// Format a lock age as a short human-readable string.
pub fn format_age(age: Duration) -> String {
    let secs = age.as_secs();
    let (days, hours, minutes, seconds) = (
        secs / 86_400,
        (secs / 3_600) % 24,
        (secs / 60) % 60,
        secs % 60,
    );

    if days > 0 {
        format!("{}d {}h", days, hours)
    } else if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}
