//! Application directory resolution for batchkit.
//!
//! Every helper that touches disk (job locks, suppression flags, config
//! files) works under a single `config_root`. It is either supplied by the
//! caller, which is what tests and one-off migrations do, or derived from
//! the platform's user configuration directory for the application name
//! (`$XDG_CONFIG_HOME/<app>` or `~/.config/<app>` on Linux).

use crate::error::{BatchError, Result};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

/// Subdirectory of `config_root` holding job lock files.
pub const JOBS_DIR: &str = "jobs";

/// Subdirectory of `config_root` holding suppression flag files.
pub const SUPPRESS_DIR: &str = "suppress";

/// Extension of job lock files.
pub const LOCK_EXTENSION: &str = "pid";

/// Resolved directories for one application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    /// Application name the directories are keyed by.
    pub app_name: String,

    /// Root directory for jobs, suppression flags and config files.
    pub config_root: PathBuf,
}

impl AppPaths {
    /// Resolve paths for `app_name`, honouring an explicit `config_dir` override.
    pub fn resolve(app_name: &str, config_dir: Option<&Path>) -> Result<Self> {
        let config_root = match config_dir {
            Some(dir) => dir.to_path_buf(),
            None => project_dirs(app_name)?.config_dir().to_path_buf(),
        };

        Ok(Self {
            app_name: app_name.to_string(),
            config_root,
        })
    }

    /// Paths rooted at an explicit directory.
    pub fn with_root<P: AsRef<Path>>(app_name: &str, config_root: P) -> Self {
        Self {
            app_name: app_name.to_string(),
            config_root: config_root.as_ref().to_path_buf(),
        }
    }

    /// Directory holding `<mnemonic>.pid` lock files.
    pub fn jobs_dir(&self) -> PathBuf {
        self.config_root.join(JOBS_DIR)
    }

    /// Lock file path for a mnemonic.
    pub fn job_lock_path(&self, mnemonic: &str) -> PathBuf {
        self.jobs_dir().join(format!("{}.{}", mnemonic, LOCK_EXTENSION))
    }

    /// Directory scanned for `name-<x>.suppress` flag files.
    pub fn suppress_dir(&self) -> PathBuf {
        self.config_root.join(SUPPRESS_DIR)
    }

    /// A config file directly under `config_root`.
    pub fn config_file(&self, file_name: &str) -> PathBuf {
        self.config_root.join(file_name)
    }
}

/// Per-user config directory for an application, ignoring any override.
pub fn user_config_dir(app_name: &str) -> Result<PathBuf> {
    Ok(project_dirs(app_name)?.config_dir().to_path_buf())
}

/// Per-user log directory for an application (`~/.cache/<app>/log` on Linux).
pub fn user_log_dir(app_name: &str) -> Result<PathBuf> {
    Ok(project_dirs(app_name)?.cache_dir().join("log"))
}

fn project_dirs(app_name: &str) -> Result<ProjectDirs> {
    ProjectDirs::from("", "", app_name).ok_or_else(|| {
        BatchError::UserError(format!(
            "failed to determine user directories for '{}': no home directory found; pass --config-dir explicitly",
            app_name
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn override_is_used_verbatim() {
        let paths = AppPaths::resolve("archiver", Some(Path::new("/srv/archiver"))).unwrap();

        assert_eq!(paths.config_root, PathBuf::from("/srv/archiver"));
        assert_eq!(paths.jobs_dir(), PathBuf::from("/srv/archiver/jobs"));
        assert_eq!(
            paths.job_lock_path("nightly"),
            PathBuf::from("/srv/archiver/jobs/nightly.pid")
        );
        assert_eq!(paths.suppress_dir(), PathBuf::from("/srv/archiver/suppress"));
        assert_eq!(
            paths.config_file("main.yml"),
            PathBuf::from("/srv/archiver/main.yml")
        );
    }

    #[test]
    fn lock_path_is_deterministic_per_mnemonic() {
        let paths = AppPaths::with_root("archiver", "/srv/archiver");

        assert_eq!(paths.job_lock_path("a"), paths.job_lock_path("a"));
        assert_ne!(paths.job_lock_path("a"), paths.job_lock_path("b"));
    }

    #[test]
    fn default_root_is_keyed_by_app_name() {
        // Environments without a home directory cannot resolve a default.
        let Ok(paths) = AppPaths::resolve("batchkit-test-app", None) else {
            return;
        };

        assert!(paths.config_root.ends_with("batchkit-test-app"));
        assert_eq!(paths.config_root, user_config_dir("batchkit-test-app").unwrap());
    }
}
