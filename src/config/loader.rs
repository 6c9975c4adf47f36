//! Locating and reading YAML config files.

use super::schema::ConfigMap;
use crate::error::{BatchError, Result};
use crate::paths;
use serde_yaml::Value;
use std::path::{Path, PathBuf};

/// Where a config file lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigLocation {
    /// A fully qualified file path.
    File(PathBuf),
    /// A file name inside an explicit directory.
    InDir { dir: PathBuf, file_name: String },
    /// A file name inside the application's user config directory.
    ForApp { app_name: String, file_name: String },
}

impl ConfigLocation {
    /// Resolve to a concrete path. The file is not required to exist.
    pub fn resolve(&self) -> Result<PathBuf> {
        match self {
            ConfigLocation::File(path) => Ok(path.clone()),
            ConfigLocation::InDir { dir, file_name } => Ok(dir.join(file_name)),
            ConfigLocation::ForApp {
                app_name,
                file_name,
            } => Ok(paths::user_config_dir(app_name)?.join(file_name)),
        }
    }
}

/// Load a YAML config file into a flat map.
///
/// # Errors
///
/// * `ConfigError` - the file is missing, unreadable, not YAML, or its top
///   level is not a mapping with string keys
pub fn load_mapping<P: AsRef<Path>>(path: P) -> Result<ConfigMap> {
    let path = path.as_ref();

    if !path.is_file() {
        return Err(BatchError::ConfigError(format!(
            "config file missing, was expecting '{}'",
            path.display()
        )));
    }

    let content = std::fs::read_to_string(path).map_err(|e| {
        BatchError::ConfigError(format!(
            "failed to read config file '{}': {}",
            path.display(),
            e
        ))
    })?;

    parse_mapping(&content).map_err(|e| match e {
        BatchError::ConfigError(msg) => {
            BatchError::ConfigError(format!("{} (in '{}')", msg, path.display()))
        }
        other => other,
    })
}

/// Parse YAML text into a flat map. An empty document is an empty map.
pub fn parse_mapping(yaml: &str) -> Result<ConfigMap> {
    let value: Value = serde_yaml::from_str(yaml)
        .map_err(|e| BatchError::ConfigError(format!("failed to parse config YAML: {}", e)))?;

    let mapping = match value {
        Value::Null => return Ok(ConfigMap::new()),
        Value::Mapping(mapping) => mapping,
        _ => {
            return Err(BatchError::ConfigError(
                "config YAML must be a mapping of keys to values".to_string(),
            ));
        }
    };

    mapping
        .into_iter()
        .map(|(key, value)| match key {
            Value::String(key) => Ok((key, value)),
            other => Err(BatchError::ConfigError(format!(
                "config keys must be strings, found {:?}",
                other
            ))),
        })
        .collect()
}
