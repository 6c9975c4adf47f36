//! Layered YAML configuration.
//!
//! Config is built explicitly: a YAML file supplies defaults, environment
//! variables override it, command-line flags override both, and the result
//! is validated against a [`Schema`] before being deserialized into a typed
//! struct. Unknown fields can be rejected per schema.

mod builder;
mod loader;
mod model;
mod schema;

#[cfg(test)]
mod tests;

// Re-export public API
pub use builder::{ConfigBuilder, ConfigSource};
pub use loader::{ConfigLocation, load_mapping, parse_mapping};
pub use model::RunnerConfig;
pub use schema::{ConfigMap, FieldError, FieldSpec, FieldType, Schema, ValidationErrors, validate};
