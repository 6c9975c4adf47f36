//! Config schemas and validation.
//!
//! A schema lists the known keys with their type, whether they are required
//! and, optionally, the allowed values. Validation collects every problem
//! instead of stopping at the first, so a broken config file can be fixed
//! in one pass.

use crate::error::{BatchError, Result};
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::collections::BTreeMap;

/// A flat config: top-level keys to YAML values.
pub type ConfigMap = BTreeMap<String, Value>;

/// Expected type of a config value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    /// Any value is accepted.
    #[default]
    Any,
    String,
    Boolean,
    Integer,
    /// Integer or float.
    Number,
    List,
    Map,
}

impl FieldType {
    /// Whether `value` has this type.
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            FieldType::Any => true,
            FieldType::String => value.is_string(),
            FieldType::Boolean => value.is_bool(),
            FieldType::Integer => value.is_i64() || value.is_u64(),
            FieldType::Number => value.is_number(),
            FieldType::List => value.is_sequence(),
            FieldType::Map => value.is_mapping(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Any => "any",
            FieldType::String => "string",
            FieldType::Boolean => "boolean",
            FieldType::Integer => "integer",
            FieldType::Number => "number",
            FieldType::List => "list",
            FieldType::Map => "map",
        }
    }
}

/// Rules for one config key.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldSpec {
    #[serde(rename = "type")]
    pub field_type: FieldType,

    pub required: bool,

    /// Allowed values, compared against the value's text form.
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub allowed: Option<Vec<String>>,

    /// Compare against `allowed` without regard to ASCII case.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub ignore_case: bool,
}

impl FieldSpec {
    pub fn new(field_type: FieldType) -> Self {
        Self {
            field_type,
            ..Self::default()
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn one_of(mut self, values: &[&str]) -> Self {
        self.allowed = Some(values.iter().map(|v| v.to_string()).collect());
        self
    }

    pub fn ignore_case(mut self) -> Self {
        self.ignore_case = true;
        self
    }

    fn allows(&self, text: &str) -> bool {
        self.allowed.as_ref().is_none_or(|allowed| {
            allowed.iter().any(|a| {
                if self.ignore_case {
                    a.eq_ignore_ascii_case(text)
                } else {
                    a == text
                }
            })
        })
    }
}

/// Schema for a flat config map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    #[serde(default)]
    pub properties: BTreeMap<String, FieldSpec>,

    /// Whether keys missing from `properties` are accepted.
    #[serde(default = "default_true")]
    pub additional_properties: bool,
}

fn default_true() -> bool {
    true
}

impl Default for Schema {
    fn default() -> Self {
        Self {
            properties: BTreeMap::new(),
            additional_properties: true,
        }
    }
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the rules for `name`.
    pub fn field(mut self, name: &str, spec: FieldSpec) -> Self {
        self.properties.insert(name.to_string(), spec);
        self
    }

    /// Reject keys that are not listed in the schema.
    pub fn deny_unknown(mut self) -> Self {
        self.additional_properties = false;
        self
    }

    /// Parse a schema written in YAML.
    ///
    /// ```yaml
    /// additional_properties: false
    /// properties:
    ///   dir: { type: string, required: true }
    ///   log_level: { enum: [debug, info, warning, error, critical] }
    /// ```
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| BatchError::ConfigError(format!("failed to parse config schema: {}", e)))
    }

    /// Known keys, sorted.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.properties.keys().map(String::as_str)
    }

    pub fn get(&self, name: &str) -> Option<&FieldSpec> {
        self.properties.get(name)
    }
}

/// One validation problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &str, message: &str) -> Self {
        Self {
            field: field.to_string(),
            message: message.to_string(),
        }
    }
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Every problem found in a config map.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    pub fn errors(&self) -> &[FieldError] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether any error concerns `field`.
    pub fn has_field(&self, field: &str) -> bool {
        self.0.iter().any(|e| e.field == field)
    }
}

impl From<Vec<FieldError>> for ValidationErrors {
    fn from(errors: Vec<FieldError>) -> Self {
        Self(errors)
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let lines: Vec<String> = self.0.iter().map(|e| format!("  - {}", e)).collect();
        write!(f, "{}", lines.join("\n"))
    }
}

/// Check `map` against `schema`.
///
/// Null values count as unset: they fail `required` but are otherwise
/// accepted.
pub fn validate(map: &ConfigMap, schema: &Schema) -> std::result::Result<(), ValidationErrors> {
    let mut errors = Vec::new();

    for (name, spec) in &schema.properties {
        let missing = map.get(name).is_none_or(Value::is_null);
        if spec.required && missing {
            errors.push(FieldError::new(name, "is required"));
        }
    }

    for (name, value) in map {
        let Some(spec) = schema.get(name) else {
            if !schema.additional_properties {
                errors.push(FieldError::new(name, "is not a recognized config key"));
            }
            continue;
        };
        if value.is_null() {
            continue;
        }

        if !spec.field_type.matches(value) {
            errors.push(FieldError::new(
                name,
                &format!(
                    "expected {}, found {}",
                    spec.field_type.as_str(),
                    describe(value)
                ),
            ));
            continue;
        }

        if let Some(allowed) = &spec.allowed {
            let text = scalar_text(value);
            if !text.as_deref().is_some_and(|t| spec.allows(t)) {
                errors.push(FieldError::new(
                    name,
                    &format!("must be one of: {}", allowed.join(", ")),
                ));
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidationErrors(errors))
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Sequence(_) => "list",
        Value::Mapping(_) => "map",
        Value::Tagged(_) => "tagged value",
    }
}
