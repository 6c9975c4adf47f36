//! Suppression flags for scheduled jobs.
//!
//! An operator can stop a cron-driven program from doing work, without
//! touching the schedule, by dropping an empty file into
//! `<config_root>/suppress`:
//!
//! - `name-all.suppress` suppresses every check
//! - `name-<x>.suppress` suppresses checks for name `<x>`
//!
//! Any other `*.*` file in that directory is treated as an operator mistake
//! and fails the check instead of being silently ignored.

use crate::error::{BatchError, Result};
use crate::job::validate_mnemonic;
use crate::paths::AppPaths;
use globset::{Glob, GlobMatcher};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{debug, error, info};


/// Flag name that suppresses everything.
pub const ALL: &str = "all";

const FLAG_PREFIX: &str = "name-";
const FLAG_SUFFIX: &str = ".suppress";

/// Files the scan looks at. Names without an extension are ignored.
static CANDIDATE_GLOB: LazyLock<GlobMatcher> = LazyLock::new(|| {
    Glob::new("*.*")
        .expect("Invalid candidate glob")
        .compile_matcher()
});

static FLAG_GLOB: LazyLock<GlobMatcher> = LazyLock::new(|| {
    Glob::new("name-*.suppress")
        .expect("Invalid flag glob")
        .compile_matcher()
});

/// Whether `file_name` is a well-formed flag file name.
pub fn is_valid_flag_file(file_name: &str) -> bool {
    FLAG_GLOB.is_match(file_name)
}

/// File name of the flag for `name` (`None` means all).
pub fn flag_file_name(name: Option<&str>) -> String {
    format!("{}{}{}", FLAG_PREFIX, name.unwrap_or(ALL), FLAG_SUFFIX)
}

/// Snapshot of the suppression directory.
#[derive(Debug, Clone)]
pub struct SuppressCheck {
    dir: PathBuf,
    names: BTreeSet<String>,
}

impl SuppressCheck {
    /// Scan `<config_root>/suppress`, creating it if needed.
    ///
    /// # Errors
    ///
    /// * `DirectoryCreateFailed` - the directory cannot be created
    /// * `InvalidSuppressFile` - a `*.*` file is not named `name-<x>.suppress`
    pub fn new(paths: &AppPaths) -> Result<Self> {
        let mut check = Self {
            dir: paths.suppress_dir(),
            names: BTreeSet::new(),
        };
        check.ensure_dir()?;
        check.refresh()?;
        Ok(check)
    }

    /// Directory holding the flag files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Re-read the directory.
    pub fn refresh(&mut self) -> Result<()> {
        self.names = scan(&self.dir)?;
        Ok(())
    }

    /// Whether `name` is suppressed.
    ///
    /// A `name-all.suppress` flag suppresses every name. Without a name only
    /// that flag counts.
    pub fn suppressed(&self, name: Option<&str>) -> bool {
        let hit = if self.names.contains(ALL) {
            Some(ALL)
        } else {
            name.filter(|n| self.names.contains(*n))
        };

        match hit {
            Some(flag) => {
                info!(flag = %flag, "process has been suppressed");
                true
            }
            None => false,
        }
    }

    /// Suppressed names from the last scan, sorted. `all` appears as a name.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    fn ensure_dir(&self) -> Result<()> {
        if self.dir.is_dir() {
            return Ok(());
        }
        std::fs::create_dir_all(&self.dir).map_err(|e| BatchError::DirectoryCreateFailed {
            path: self.dir.clone(),
            source: e,
        })?;
        info!(dir = %self.dir.display(), "suppression dir created");
        Ok(())
    }
}

fn scan(dir: &Path) -> Result<BTreeSet<String>> {
    let entries = std::fs::read_dir(dir).map_err(|e| {
        BatchError::UserError(format!(
            "failed to read suppression dir '{}': {}",
            dir.display(),
            e
        ))
    })?;

    collect_flags(dir, entries.map(|entry| entry.map(|e| e.path())))
}

/// Flag names from the given directory listing. Unreadable entries fail the
/// scan.
fn collect_flags<I>(dir: &Path, entries: I) -> Result<BTreeSet<String>>
where
    I: IntoIterator<Item = std::io::Result<PathBuf>>,
{
    let mut names = BTreeSet::new();
    for entry in entries {
        let path = entry.map_err(|e| {
            BatchError::UserError(format!(
                "failed to read entry in suppression dir '{}': {}",
                dir.display(),
                e
            ))
        })?;
        if !path.is_file() {
            continue;
        }
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            error!(file = %path.display(), "invalid suppress file");
            return Err(BatchError::InvalidSuppressFile(path));
        };
        if file_name.starts_with('.') || !CANDIDATE_GLOB.is_match(file_name) {
            continue;
        }

        debug!(file = %file_name, "checking suppress file");
        if !is_valid_flag_file(file_name) {
            error!(file = %path.display(), "invalid suppress file");
            return Err(BatchError::InvalidSuppressFile(path));
        }

        let name = &file_name[FLAG_PREFIX.len()..file_name.len() - FLAG_SUFFIX.len()];
        names.insert(name.to_string());
    }
    Ok(names)
}

fn validate_flag_name(name: Option<&str>) -> Result<()> {
    match name {
        Some(name) => validate_mnemonic(name),
        None => Ok(()),
    }
}

/// Create the flag for `name` (`None` means all). Returns its path.
///
/// Adding a flag that already exists is not an error.
pub fn add(paths: &AppPaths, name: Option<&str>) -> Result<PathBuf> {
    validate_flag_name(name)?;

    let dir = paths.suppress_dir();
    std::fs::create_dir_all(&dir).map_err(|e| BatchError::DirectoryCreateFailed {
        path: dir.clone(),
        source: e,
    })?;

    let path = dir.join(flag_file_name(name));
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|e| {
            BatchError::UserError(format!(
                "failed to create suppress file '{}': {}",
                path.display(),
                e
            ))
        })?;

    info!(flag = %path.display(), "suppression added");
    Ok(path)
}

/// Delete the flag for `name` (`None` means all).
///
/// Returns `false` if there was no such flag.
pub fn remove(paths: &AppPaths, name: Option<&str>) -> Result<bool> {
    validate_flag_name(name)?;

    let path = paths.suppress_dir().join(flag_file_name(name));
    match std::fs::remove_file(&path) {
        Ok(()) => {
            info!(flag = %path.display(), "suppression removed");
            Ok(true)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(BatchError::UserError(format!(
            "failed to remove suppress file '{}': {}",
            path.display(),
            e
        ))),
    }
}
