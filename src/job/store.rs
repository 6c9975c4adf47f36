//! On-disk job lock record.
//!
//! The record is a single file whose whole content is the owner's pid as
//! ASCII decimal. Its modification time stands in for "how long the owner
//! has held the lock".

use crate::error::{BatchError, Result};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

/// Minimum age reported for a lock file that exists.
pub const MIN_AGE: Duration = Duration::from_secs(1);

/// A job lock file at a fixed path.
#[derive(Debug, Clone)]
pub struct LockFile {
    path: PathBuf,
}

impl LockFile {
    /// Wrap a lock file path. Nothing is touched on disk.
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    /// Get the path to the lock file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the owner pid.
    ///
    /// Returns `Ok(None)` when the file does not exist. An existing file that
    /// is empty or does not hold an integer is `CorruptLockFile`, never
    /// "absent".
    pub fn read(&self) -> Result<Option<u32>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) if e.kind() == ErrorKind::InvalidData => {
                return Err(BatchError::CorruptLockFile {
                    path: self.path.clone(),
                    content: "<non-utf8 bytes>".to_string(),
                });
            }
            Err(e) => return Err(self.io_error(e)),
        };

        content
            .trim()
            .parse::<u32>()
            .map(Some)
            .map_err(|_| BatchError::CorruptLockFile {
                path: self.path.clone(),
                content,
            })
    }

    /// Age of the lock file in whole seconds.
    ///
    /// Zero when the file does not exist, otherwise at least one second so an
    /// existing file never reads as "no lock".
    pub fn age(&self) -> Result<Duration> {
        let modified = match fs::metadata(&self.path).and_then(|m| m.modified()) {
            Ok(modified) => modified,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Duration::ZERO),
            Err(e) => return Err(self.io_error(e)),
        };

        // A future mtime (clock skew) still means the file exists.
        let elapsed = SystemTime::now()
            .duration_since(modified)
            .unwrap_or(Duration::ZERO);

        Ok(Duration::from_secs(elapsed.as_secs()).max(MIN_AGE))
    }

    /// Create or overwrite the lock file with `pid` as its only content.
    pub fn write(&self, pid: u32) -> Result<()> {
        self.ensure_dir()?;

        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&self.path)
            .map_err(|e| self.io_error(e))?;

        self.write_pid(&mut file, pid)
    }

    /// Create the lock file only if it does not exist yet.
    ///
    /// The pid is written to a private temp file which is then hard-linked
    /// into place, so the lock file never exists without its content.
    /// Returns `Ok(false)` when another process created it first.
    pub fn create_exclusive(&self, pid: u32) -> Result<bool> {
        self.ensure_dir()?;

        let temp = self.temp_path(pid);
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp)
            .map_err(|e| self.io_error(e))?;
        let written = file
            .write_all(pid.to_string().as_bytes())
            .and_then(|()| file.sync_all());
        drop(file);

        let linked = written.and_then(|()| fs::hard_link(&temp, &self.path));
        let _ = fs::remove_file(&temp);

        match linked {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(self.io_error(e)),
        }
    }

    /// Remove the lock file. A missing file is not an error.
    pub fn delete(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.io_error(e)),
        }
    }

    /// Create the directory holding the lock file, recursively.
    pub fn ensure_dir(&self) -> Result<()> {
        let Some(parent) = self.path.parent() else {
            return Ok(());
        };
        if parent.as_os_str().is_empty() || parent.is_dir() {
            return Ok(());
        }

        fs::create_dir_all(parent).map_err(|e| BatchError::DirectoryCreateFailed {
            path: parent.to_path_buf(),
            source: e,
        })
    }

    fn write_pid(&self, file: &mut fs::File, pid: u32) -> Result<()> {
        let result = file
            .write_all(pid.to_string().as_bytes())
            .and_then(|()| file.sync_all());

        if let Err(e) = result {
            // A half-written record would read as corrupt on the next run.
            let _ = fs::remove_file(&self.path);
            return Err(self.io_error(e));
        }
        Ok(())
    }

    /// `.<name>.<pid>.tmp` beside the lock file.
    fn temp_path(&self, pid: u32) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.path.with_file_name(format!(".{}.{}.tmp", name, pid))
    }

    fn io_error(&self, source: std::io::Error) -> BatchError {
        BatchError::LockIo {
            path: self.path.clone(),
            source,
        }
    }
}
