//! Layered config: file, environment, then explicit overrides.

use super::loader::load_mapping;
use super::schema::{ConfigMap, FieldType, Schema, validate};
use crate::error::{BatchError, Result};
use serde::de::DeserializeOwned;
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Where a merged config value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    Environment(String),
    Override,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::File(path) => write!(f, "file {}", path.display()),
            ConfigSource::Environment(var) => write!(f, "env {}", var),
            ConfigSource::Override => write!(f, "command line"),
        }
    }
}

/// Merges config layers into a typed value.
///
/// Layers are applied in call order and later layers win, so callers add
/// them as file → environment → command-line overrides. Nothing is written
/// into the builder's own fields; `build` deserializes the merged map into a
/// caller-defined struct.
///
/// ```no_run
/// use batchkit::config::{ConfigBuilder, RunnerConfig};
///
/// let config: RunnerConfig = ConfigBuilder::new()
///     .with_schema(RunnerConfig::schema())
///     .add_file("/etc/archiver/main.yml")?
///     .add_env("ARCHIVER_")?
///     .set("log_level", "debug")
///     .build()?;
/// # Ok::<(), batchkit::error::BatchError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    schema: Option<Schema>,
    values: ConfigMap,
    sources: BTreeMap<String, ConfigSource>,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate against `schema`; also selects the environment variables `add_env` reads.
    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Merge a YAML file. A missing file is an error.
    pub fn add_file<P: AsRef<Path>>(&mut self, path: P) -> Result<&mut Self> {
        let path = path.as_ref();
        let layer = load_mapping(path)?;
        self.merge(layer, |_| ConfigSource::File(path.to_path_buf()));
        Ok(self)
    }

    /// Merge a YAML file if it exists.
    pub fn add_optional_file<P: AsRef<Path>>(&mut self, path: P) -> Result<&mut Self> {
        if path.as_ref().exists() {
            self.add_file(path)
        } else {
            Ok(self)
        }
    }

    /// Merge `<prefix><KEY>` environment variables for every schema key.
    pub fn add_env(&mut self, prefix: &str) -> Result<&mut Self> {
        self.add_env_from(prefix, std::env::vars())
    }

    /// Like `add_env`, reading from an explicit variable list.
    ///
    /// Values of non-string fields are parsed as YAML scalars, so `"5"`
    /// becomes an integer and `"true"` a boolean.
    pub fn add_env_from<I>(&mut self, prefix: &str, vars: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let schema = self.schema.as_ref().ok_or_else(|| {
            BatchError::ConfigError(
                "environment overrides need a schema to know which variables to read".to_string(),
            )
        })?;

        let wanted: BTreeMap<String, (String, FieldType)> = schema
            .properties
            .iter()
            .map(|(key, spec)| {
                (
                    format!("{}{}", prefix, key.to_uppercase()),
                    (key.clone(), spec.field_type),
                )
            })
            .collect();

        let mut layer = ConfigMap::new();
        let mut vars_used = BTreeMap::new();
        for (var, raw) in vars {
            if let Some((key, field_type)) = wanted.get(&var) {
                layer.insert(key.clone(), coerce_env_value(&raw, *field_type));
                vars_used.insert(key.clone(), var);
            }
        }

        self.merge(layer, |key| {
            ConfigSource::Environment(vars_used.get(key).cloned().unwrap_or_default())
        });
        Ok(self)
    }

    /// Merge explicit values, typically parsed command-line flags.
    ///
    /// Null values are skipped so unset flags do not mask lower layers.
    pub fn add_overrides(&mut self, overrides: ConfigMap) -> &mut Self {
        let layer = overrides.into_iter().filter(|(_, v)| !v.is_null()).collect();
        self.merge(layer, |_| ConfigSource::Override);
        self
    }

    /// Merge a single explicit value.
    pub fn set<V: Into<Value>>(&mut self, key: &str, value: V) -> &mut Self {
        let mut layer = ConfigMap::new();
        layer.insert(key.to_string(), value.into());
        self.add_overrides(layer)
    }

    /// The merged values so far.
    pub fn values(&self) -> &ConfigMap {
        &self.values
    }

    /// Which layer supplied `key`.
    pub fn source_of(&self, key: &str) -> Option<&ConfigSource> {
        self.sources.get(key)
    }

    /// Validate the merged values against the schema, if any.
    pub fn validate(&self) -> Result<()> {
        match &self.schema {
            Some(schema) => validate(&self.values, schema).map_err(BatchError::ValidationError),
            None => Ok(()),
        }
    }

    /// Validate, then deserialize the merged values into `T`.
    pub fn build<T: DeserializeOwned>(&self) -> Result<T> {
        self.validate()?;

        let mapping: Mapping = self
            .values
            .iter()
            .map(|(k, v)| (Value::String(k.clone()), v.clone()))
            .collect();

        serde_yaml::from_value(Value::Mapping(mapping))
            .map_err(|e| BatchError::ConfigError(format!("invalid config: {}", e)))
    }

    fn merge(&mut self, layer: ConfigMap, source: impl Fn(&str) -> ConfigSource) {
        for (key, value) in layer {
            self.sources.insert(key.clone(), source(&key));
            self.values.insert(key, value);
        }
    }
}

fn coerce_env_value(raw: &str, field_type: FieldType) -> Value {
    if matches!(field_type, FieldType::String) {
        return Value::String(raw.to_string());
    }

    match serde_yaml::from_str::<Value>(raw) {
        Ok(value @ (Value::Bool(_) | Value::Number(_))) => value,
        Ok(value @ (Value::Sequence(_) | Value::Mapping(_)))
            if matches!(field_type, FieldType::List | FieldType::Map) =>
        {
            value
        }
        _ => Value::String(raw.to_string()),
    }
}
