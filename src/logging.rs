//! Logging setup for batch programs.
//!
//! Every record carries a local timestamp, target, level and message. Output
//! goes to stderr for interactive runs and to a rotating file under the
//! user cache directory (`~/.cache/<app>/log` on Linux) for scheduled runs.
//!
//! [`LogManager`] builds a `tracing::Dispatch` but does not install it.
//! Callers either hand `dispatch()` to the components that log (the job
//! guard takes it as its log sink) or opt in to `install_global()`.
//!
//! `BATCHKIT_LOG` overrides the level with a full filter directive
//! (e.g. `debug` or `warn,batchkit::job=debug`).

use crate::error::{BatchError, Result};
use crate::paths;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{Dispatch, error};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::layer::SubscriberExt;

/// Environment variable holding a filter directive that overrides the level.
pub const LOG_ENV: &str = "BATCHKIT_LOG";

const TIME_FORMAT: &str = "%Y-%m-%d %H.%M.%S";

/// Log level as written in config files and on the command line.
///
/// Config files, environment variables and flags all accept what
/// [`FromStr`] accepts; serialization writes the lowercase name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warning,
    Error,
    /// Reported through tracing's ERROR level.
    Critical,
}

impl LogLevel {
    /// Accepted names, lowest severity first.
    pub const NAMES: &'static [&'static str] = &["debug", "info", "warning", "error", "critical"];

    /// Every accepted spelling, compared without regard to case.
    pub const ACCEPTED: &'static [&'static str] = &[
        "debug", "info", "warning", "warn", "error", "critical", "10", "20", "30", "40", "50",
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warning",
            LogLevel::Error => "error",
            LogLevel::Critical => "critical",
        }
    }

    /// Conventional numeric severity (10 for debug up to 50 for critical).
    pub fn severity(&self) -> u8 {
        match self {
            LogLevel::Debug => 10,
            LogLevel::Info => 20,
            LogLevel::Warning => 30,
            LogLevel::Error => 40,
            LogLevel::Critical => 50,
        }
    }

    pub fn from_severity(severity: u8) -> Option<Self> {
        match severity {
            10 => Some(LogLevel::Debug),
            20 => Some(LogLevel::Info),
            30 => Some(LogLevel::Warning),
            40 => Some(LogLevel::Error),
            50 => Some(LogLevel::Critical),
            _ => None,
        }
    }

    /// The tracing filter directive for this level.
    pub fn directive(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warn",
            LogLevel::Error | LogLevel::Critical => "error",
        }
    }
}

impl FromStr for LogLevel {
    type Err = BatchError;

    /// Parse a level name (any case, `warn` accepted) or numeric severity.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Ok(severity) = s.parse::<u8>() {
            return LogLevel::from_severity(severity).ok_or_else(|| invalid_level(s));
        }
        match s.to_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warning" | "warn" => Ok(LogLevel::Warning),
            "error" => Ok(LogLevel::Error),
            "critical" => Ok(LogLevel::Critical),
            _ => Err(invalid_level(s)),
        }
    }
}

impl<'de> Deserialize<'de> for LogLevel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        use serde::de::Error;

        match serde_yaml::Value::deserialize(deserializer)? {
            serde_yaml::Value::String(s) => s.parse().map_err(D::Error::custom),
            serde_yaml::Value::Number(n) => n
                .as_u64()
                .and_then(|n| u8::try_from(n).ok())
                .and_then(LogLevel::from_severity)
                .ok_or_else(|| D::Error::custom(invalid_level(&n.to_string()))),
            other => Err(D::Error::custom(format!(
                "invalid log level {:?}: expected a level name or 10/20/30/40/50",
                other
            ))),
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn invalid_level(s: &str) -> BatchError {
    BatchError::UserError(format!(
        "invalid log level '{}': expected one of {} or 10/20/30/40/50",
        s,
        LogLevel::NAMES.join(", ")
    ))
}

/// How often the log file rolls over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogRotation {
    Minutely,
    Hourly,
    #[default]
    Daily,
    Never,
}

impl From<LogRotation> for Rotation {
    fn from(rotation: LogRotation) -> Self {
        match rotation {
            LogRotation::Minutely => Rotation::MINUTELY,
            LogRotation::Hourly => Rotation::HOURLY,
            LogRotation::Daily => Rotation::DAILY,
            LogRotation::Never => Rotation::NEVER,
        }
    }
}

/// What to log, and where.
#[derive(Debug, Clone)]
pub struct LogSettings {
    /// Used for the default log directory and file name.
    pub app_name: String,

    pub level: LogLevel,

    pub to_console: bool,

    pub to_file: bool,

    /// Overrides the user cache log directory.
    pub log_dir: Option<PathBuf>,

    /// File name prefix (default: the app name). Files are `<prefix>.<date>.log`.
    pub file_prefix: Option<String>,

    pub rotation: LogRotation,

    /// Rotated files to keep.
    pub max_files: usize,
}

impl LogSettings {
    pub fn new(app_name: &str) -> Self {
        Self {
            app_name: app_name.to_string(),
            level: LogLevel::default(),
            to_console: true,
            to_file: true,
            log_dir: None,
            file_prefix: None,
            rotation: LogRotation::default(),
            max_files: 10,
        }
    }
}

/// Owns a configured log pipeline.
///
/// Dropping the manager flushes buffered file output, so keep it alive for
/// the whole run.
pub struct LogManager {
    dispatch: Dispatch,
    log_dir: Option<PathBuf>,
    _guards: Vec<WorkerGuard>,
}

impl LogManager {
    /// Build the console and file outputs described by `settings`.
    ///
    /// # Errors
    ///
    /// * `DirectoryCreateFailed` - the log directory cannot be created
    /// * `LoggingError` - the log file cannot be opened
    pub fn new(settings: &LogSettings) -> Result<Self> {
        let filter = EnvFilter::try_from_env(LOG_ENV)
            .unwrap_or_else(|_| EnvFilter::new(settings.level.directive()));
        let mut guards = Vec::new();

        let console_layer = settings.to_console.then(|| {
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_timer(ChronoLocal::new(TIME_FORMAT.to_string()))
                .with_target(true)
        });

        let mut log_dir = None;
        let file_layer = if settings.to_file {
            let dir = match &settings.log_dir {
                Some(dir) => dir.clone(),
                None => paths::user_log_dir(&settings.app_name)?,
            };
            std::fs::create_dir_all(&dir).map_err(|e| BatchError::DirectoryCreateFailed {
                path: dir.clone(),
                source: e,
            })?;

            let prefix = settings
                .file_prefix
                .clone()
                .unwrap_or_else(|| settings.app_name.clone());
            let appender = RollingFileAppender::builder()
                .rotation(settings.rotation.into())
                .filename_prefix(prefix)
                .filename_suffix("log")
                .max_log_files(settings.max_files.max(1))
                .build(&dir)
                .map_err(|e| {
                    BatchError::LoggingError(format!(
                        "failed to open log file in '{}': {}",
                        dir.display(),
                        e
                    ))
                })?;
            let (writer, guard) = tracing_appender::non_blocking(appender);
            guards.push(guard);
            log_dir = Some(dir);

            Some(
                fmt::layer()
                    .with_writer(writer)
                    .with_ansi(false)
                    .with_timer(ChronoLocal::new(TIME_FORMAT.to_string()))
                    .with_target(true),
            )
        } else {
            None
        };

        let subscriber = tracing_subscriber::registry()
            .with(filter)
            .with(console_layer)
            .with(file_layer);

        Ok(Self {
            dispatch: Dispatch::new(subscriber),
            log_dir,
            _guards: guards,
        })
    }

    /// A handle to this pipeline, for components that take a log sink.
    pub fn dispatch(&self) -> Dispatch {
        self.dispatch.clone()
    }

    /// Directory of the log file, when file logging is on.
    pub fn log_dir(&self) -> Option<&Path> {
        self.log_dir.as_deref()
    }

    /// Run `f` with this pipeline as the default dispatcher.
    pub fn scope<T>(&self, f: impl FnOnce() -> T) -> T {
        tracing::dispatcher::with_default(&self.dispatch, f)
    }

    /// Make this pipeline the process-wide default. Fails if one is already set.
    pub fn install_global(&self) -> Result<()> {
        tracing::dispatcher::set_global_default(self.dispatch.clone())
            .map_err(|e| BatchError::LoggingError(e.to_string()))
    }

    /// Log uncaught panics through this pipeline before the default hook runs.
    pub fn install_panic_hook(&self) {
        let dispatch = self.dispatch.clone();
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            tracing::dispatcher::with_default(&dispatch, || {
                error!(panic = %info, "uncaught panic - exiting now");
            });
            previous(info);
        }));
    }
}

impl std::fmt::Debug for LogManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogManager")
            .field("log_dir", &self.log_dir)
            .finish_non_exhaustive()
    }
}
