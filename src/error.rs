//! Error types for batchkit.
//!
//! Uses thiserror for derive macros. Lock-file errors carry the path so the
//! operator can inspect or remove the offending file by hand.

use crate::config::ValidationErrors;
use crate::exit_codes;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for batchkit operations.
///
/// Contention on a job lock is not an error: `JobGuard::acquire` reports it
/// as `Ok(false)`.
#[derive(Error, Debug)]
pub enum BatchError {
    /// The lock file exists but does not hold a pid.
    ///
    /// Usually left behind by an owner that ran out of disk space after the
    /// file was created but before the pid was written.
    #[error(
        "corrupt lock file '{}' (content: {content:?}); the previous owner probably ran out of disk space, remove the file once the job is known to be stopped",
        path.display()
    )]
    CorruptLockFile { path: PathBuf, content: String },

    /// A directory needed for the lock, suppression flags or logs could not be created.
    #[error("failed to create directory '{}': {source}", path.display())]
    DirectoryCreateFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Any other I/O failure while reading, writing or removing a lock file.
    #[error("lock file I/O failed for '{}': {source}", path.display())]
    LockIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Mnemonic cannot be used as a lock file name.
    #[error(
        "invalid mnemonic '{0}': use letters, digits, '_', '-' or '.', starting with a letter or digit"
    )]
    InvalidMnemonic(String),

    /// Config file missing, unreadable or unparseable.
    #[error("{0}")]
    ConfigError(String),

    /// Config values failed schema validation.
    #[error("config validation failed:\n{0}")]
    ValidationError(ValidationErrors),

    /// A file in the suppress directory does not follow the `name-<x>.suppress` convention.
    #[error(
        "invalid suppress file '{}': expected 'name-<name>.suppress'",
        .0.display()
    )]
    InvalidSuppressFile(PathBuf),

    /// Log directory, appender or subscriber setup failed.
    #[error("logging setup failed: {0}")]
    LoggingError(String),

    /// User provided invalid arguments or the system is in an invalid state.
    #[error("{0}")]
    UserError(String),
}

impl BatchError {
    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            BatchError::CorruptLockFile { .. }
            | BatchError::DirectoryCreateFailed { .. }
            | BatchError::LockIo { .. } => exit_codes::LOCK_FAILURE,
            BatchError::ConfigError(_) | BatchError::ValidationError(_) => {
                exit_codes::CONFIG_FAILURE
            }
            BatchError::InvalidMnemonic(_)
            | BatchError::InvalidSuppressFile(_)
            | BatchError::LoggingError(_)
            | BatchError::UserError(_) => exit_codes::USER_ERROR,
        }
    }
}

/// Result type alias for batchkit operations.
pub type Result<T> = std::result::Result<T, BatchError>;
