//! Typed config for programs run through the `batchkit` CLI.

use super::schema::{FieldSpec, FieldType, Schema};
use crate::error::{BatchError, Result};
use crate::job::{DEFAULT_MNEMONIC, validate_mnemonic};
use crate::logging::LogLevel;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Settings for `batchkit run` and friends.
///
/// Loaded from `<config_root>/main.yml`, then `BATCHKIT_*` environment
/// variables, then command-line flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Minimum level written to console and file.
    pub log_level: LogLevel,

    /// Whether to log to stderr.
    pub log_to_console: bool,

    /// Whether to log to a rotating file.
    pub log_to_file: bool,

    /// Log directory (default: the user cache directory's `log/`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,

    /// Number of rotated log files to keep.
    pub log_max_files: usize,

    /// Job lock mnemonic.
    pub mnemonic: String,

    /// Seconds to wait for a running instance before giving up.
    pub lock_wait_secs: u64,

    /// Exit 0 instead of the busy exit code when another instance runs.
    pub busy_ok: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::default(),
            log_to_console: true,
            log_to_file: true,
            log_dir: None,
            log_max_files: default_log_max_files(),
            mnemonic: DEFAULT_MNEMONIC.to_string(),
            lock_wait_secs: 0,
            busy_ok: false,
        }
    }
}

fn default_log_max_files() -> usize {
    10
}

impl RunnerConfig {
    /// Config file name inside `config_root`.
    pub const FILE_NAME: &'static str = "main.yml";

    /// Prefix of environment overrides (`BATCHKIT_LOG_LEVEL`, ...).
    pub const ENV_PREFIX: &'static str = "BATCHKIT_";

    /// Schema of the config file; unknown keys are rejected.
    pub fn schema() -> Schema {
        Schema::new()
            .field(
                "log_level",
                FieldSpec::new(FieldType::Any)
                    .one_of(LogLevel::ACCEPTED)
                    .ignore_case(),
            )
            .field("log_to_console", FieldSpec::new(FieldType::Boolean))
            .field("log_to_file", FieldSpec::new(FieldType::Boolean))
            .field("log_dir", FieldSpec::new(FieldType::String))
            .field("log_max_files", FieldSpec::new(FieldType::Integer))
            .field("mnemonic", FieldSpec::new(FieldType::String))
            .field("lock_wait_secs", FieldSpec::new(FieldType::Integer))
            .field("busy_ok", FieldSpec::new(FieldType::Boolean))
            .deny_unknown()
    }

    /// Checks the schema cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.log_max_files == 0 {
            return Err(BatchError::ConfigError(
                "config validation failed: log_max_files must be greater than 0".to_string(),
            ));
        }
        validate_mnemonic(&self.mnemonic)
    }

    /// Serialize to YAML.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| {
            BatchError::ConfigError(format!("failed to serialize config to YAML: {}", e))
        })
    }
}
