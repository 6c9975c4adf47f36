//! Tests for config functionality.

use crate::config::{
    ConfigBuilder, ConfigLocation, ConfigMap, ConfigSource, FieldSpec, FieldType, RunnerConfig,
    Schema, load_mapping, parse_mapping, validate,
};
use crate::error::BatchError;
use crate::logging::LogLevel;
use serde_yaml::Value;
use serial_test::serial;
use std::path::PathBuf;
use tempfile::TempDir;

fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn archiver_schema() -> Schema {
    Schema::new()
        .field("dir", FieldSpec::new(FieldType::String).required())
        .field("batch_size", FieldSpec::new(FieldType::Integer))
        .field(
            "log_level",
            FieldSpec::new(FieldType::String).one_of(&["debug", "info"]),
        )
        .deny_unknown()
}

// ============================================================================
// Parsing and loading
// ============================================================================

#[test]
fn test_parse_empty_yaml() {
    assert!(parse_mapping("").unwrap().is_empty());
}

#[test]
fn test_parse_mapping() {
    let map = parse_mapping("dir: /data\nbatch_size: 50\n").unwrap();

    assert_eq!(map.get("dir"), Some(&Value::from("/data")));
    assert_eq!(map.get("batch_size"), Some(&Value::from(50)));
}

#[test]
fn test_parse_rejects_non_mapping() {
    let err = parse_mapping("- a\n- b\n").unwrap_err();
    assert!(matches!(err, BatchError::ConfigError(_)));
    assert!(err.to_string().contains("mapping"));
}

#[test]
fn test_parse_rejects_invalid_yaml() {
    assert!(parse_mapping("dir: [unclosed").is_err());
}

#[test]
fn test_load_missing_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("main.yml");

    let err = load_mapping(&path).unwrap_err();
    assert!(matches!(err, BatchError::ConfigError(_)));
    assert!(err.to_string().contains("config file missing"));
}

#[test]
fn test_load_error_names_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("main.yml");
    std::fs::write(&path, "just a string").unwrap();

    let err = load_mapping(&path).unwrap_err();
    assert!(err.to_string().contains("main.yml"));
}

#[test]
fn test_config_location_resolve() {
    let file = ConfigLocation::File(PathBuf::from("/etc/archiver.yml"));
    assert_eq!(file.resolve().unwrap(), PathBuf::from("/etc/archiver.yml"));

    let in_dir = ConfigLocation::InDir {
        dir: PathBuf::from("/etc/archiver"),
        file_name: "main.yml".to_string(),
    };
    assert_eq!(
        in_dir.resolve().unwrap(),
        PathBuf::from("/etc/archiver/main.yml")
    );
}

// ============================================================================
// Validation
// ============================================================================

#[test]
fn test_validate_accepts_valid_map() {
    let map = parse_mapping("dir: /data\nbatch_size: 50\nlog_level: info\n").unwrap();
    assert!(validate(&map, &archiver_schema()).is_ok());
}

#[test]
fn test_validate_collects_every_error() {
    let map = parse_mapping("batch_size: lots\nlog_level: verbose\ncolour: blue\n").unwrap();

    let errors = validate(&map, &archiver_schema()).unwrap_err();

    assert_eq!(errors.errors().len(), 4);
    assert!(errors.has_field("dir"));
    assert!(errors.has_field("batch_size"));
    assert!(errors.has_field("log_level"));
    assert!(errors.has_field("colour"));

    let text = errors.to_string();
    assert!(text.contains("dir: is required"));
    assert!(text.contains("batch_size: expected integer, found string"));
    assert!(text.contains("log_level: must be one of: debug, info"));
    assert!(text.contains("colour: is not a recognized config key"));
}

#[test]
fn test_validate_null_counts_as_unset() {
    let map = parse_mapping("dir: ~\n").unwrap();
    let errors = validate(&map, &archiver_schema()).unwrap_err();

    assert_eq!(errors.errors().len(), 1);
    assert!(errors.has_field("dir"));
}

#[test]
fn test_validate_allows_unknown_by_default() {
    let schema = Schema::new().field("dir", FieldSpec::new(FieldType::String));
    let map = parse_mapping("dir: /data\nextra: 1\n").unwrap();

    assert!(validate(&map, &schema).is_ok());
}

#[test]
fn test_schema_from_yaml() {
    let schema = Schema::from_yaml(
        r#"
additional_properties: false
properties:
  dir: { type: string, required: true }
  retries: { type: integer }
  mode: { enum: [fast, safe] }
"#,
    )
    .unwrap();

    assert!(!schema.additional_properties);
    assert_eq!(schema.keys().collect::<Vec<_>>(), ["dir", "mode", "retries"]);
    assert!(schema.get("dir").unwrap().required);
    assert_eq!(schema.get("retries").unwrap().field_type, FieldType::Integer);
    assert_eq!(schema.get("mode").unwrap().field_type, FieldType::Any);

    let map = parse_mapping("dir: /data\nmode: reckless\n").unwrap();
    let errors = validate(&map, &schema).unwrap_err();
    assert!(errors.has_field("mode"));
}

// ============================================================================
// Builder
// ============================================================================

#[test]
fn test_builder_layer_precedence() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("main.yml");
    std::fs::write(&path, "dir: /from/file\nbatch_size: 10\nlog_level: info\n").unwrap();

    let mut builder = ConfigBuilder::new().with_schema(archiver_schema());
    builder
        .add_file(&path)
        .unwrap()
        .add_env_from("ARCHIVER_", vars(&[("ARCHIVER_BATCH_SIZE", "25")]))
        .unwrap()
        .set("log_level", "debug");

    let values = builder.values();
    assert_eq!(values.get("dir"), Some(&Value::from("/from/file")));
    assert_eq!(values.get("batch_size"), Some(&Value::from(25)));
    assert_eq!(values.get("log_level"), Some(&Value::from("debug")));

    assert_eq!(builder.source_of("dir"), Some(&ConfigSource::File(path)));
    assert_eq!(
        builder.source_of("batch_size"),
        Some(&ConfigSource::Environment("ARCHIVER_BATCH_SIZE".to_string()))
    );
    assert_eq!(builder.source_of("log_level"), Some(&ConfigSource::Override));
    assert!(builder.validate().is_ok());
}

#[test]
fn test_builder_missing_file_is_error() {
    let dir = TempDir::new().unwrap();
    let mut builder = ConfigBuilder::new();

    assert!(builder.add_file(dir.path().join("absent.yml")).is_err());
    assert!(builder.add_optional_file(dir.path().join("absent.yml")).is_ok());
    assert!(builder.values().is_empty());
}

#[test]
fn test_env_needs_schema() {
    let mut builder = ConfigBuilder::new();
    let err = builder.add_env_from("ARCHIVER_", vars(&[])).unwrap_err();
    assert!(matches!(err, BatchError::ConfigError(_)));
}

#[test]
fn test_env_coerces_by_field_type() {
    let mut builder = ConfigBuilder::new().with_schema(RunnerConfig::schema());
    builder
        .add_env_from(
            "BATCHKIT_",
            vars(&[
                ("BATCHKIT_LOG_TO_FILE", "false"),
                ("BATCHKIT_LOCK_WAIT_SECS", "30"),
                ("BATCHKIT_MNEMONIC", "2024"),
                ("BATCHKIT_UNRELATED", "ignored"),
                ("OTHER_MNEMONIC", "ignored"),
            ]),
        )
        .unwrap();

    let values = builder.values();
    assert_eq!(values.len(), 3);
    assert_eq!(values.get("log_to_file"), Some(&Value::Bool(false)));
    assert_eq!(values.get("lock_wait_secs"), Some(&Value::from(30)));
    // String fields keep the raw text even when it looks numeric
    assert_eq!(values.get("mnemonic"), Some(&Value::from("2024")));
}

#[test]
fn test_env_bad_value_fails_validation() {
    let mut builder = ConfigBuilder::new().with_schema(RunnerConfig::schema());
    builder
        .add_env_from("BATCHKIT_", vars(&[("BATCHKIT_LOCK_WAIT_SECS", "soon")]))
        .unwrap();

    let err = builder.build::<RunnerConfig>().unwrap_err();
    match err {
        BatchError::ValidationError(errors) => assert!(errors.has_field("lock_wait_secs")),
        other => panic!("expected ValidationError, got {:?}", other),
    }
}

#[test]
#[serial]
fn test_env_from_process_environment() {
    // SAFETY: serialized with other environment tests.
    unsafe {
        std::env::set_var("BATCHKIT_LOG_LEVEL", "warning");
    }

    let mut builder = ConfigBuilder::new().with_schema(RunnerConfig::schema());
    let result = builder.add_env(RunnerConfig::ENV_PREFIX).map(|b| b.values().clone());

    unsafe {
        std::env::remove_var("BATCHKIT_LOG_LEVEL");
    }

    let values = result.unwrap();
    assert_eq!(values.get("log_level"), Some(&Value::from("warning")));
}

#[test]
fn test_overrides_skip_nulls() {
    let mut builder = ConfigBuilder::new();
    builder.set("mnemonic", "nightly");

    let mut overrides = ConfigMap::new();
    overrides.insert("mnemonic".to_string(), Value::Null);
    overrides.insert("busy_ok".to_string(), Value::Bool(true));
    builder.add_overrides(overrides);

    assert_eq!(builder.values().get("mnemonic"), Some(&Value::from("nightly")));
    assert_eq!(builder.values().get("busy_ok"), Some(&Value::Bool(true)));
}

// ============================================================================
// RunnerConfig
// ============================================================================

#[test]
fn test_runner_config_defaults() {
    let config: RunnerConfig = ConfigBuilder::new()
        .with_schema(RunnerConfig::schema())
        .build()
        .unwrap();

    assert_eq!(config, RunnerConfig::default());
    assert_eq!(config.log_level, LogLevel::Info);
    assert!(config.log_to_console);
    assert!(config.log_to_file);
    assert_eq!(config.log_max_files, 10);
    assert_eq!(config.mnemonic, "main");
    assert_eq!(config.lock_wait_secs, 0);
    assert!(!config.busy_ok);
}

#[test]
fn test_runner_config_from_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(RunnerConfig::FILE_NAME);
    std::fs::write(
        &path,
        "log_level: debug\nlog_dir: /var/log/archiver\nmnemonic: nightly\nlock_wait_secs: 5\n",
    )
    .unwrap();

    let mut builder = ConfigBuilder::new().with_schema(RunnerConfig::schema());
    builder.add_file(&path).unwrap();
    let config: RunnerConfig = builder.build().unwrap();

    assert_eq!(config.log_level, LogLevel::Debug);
    assert_eq!(config.log_dir, Some(PathBuf::from("/var/log/archiver")));
    assert_eq!(config.mnemonic, "nightly");
    assert_eq!(config.lock_wait_secs, 5);
    assert!(config.log_to_file);
}

#[test]
fn test_runner_config_accepts_every_level_spelling() {
    let cases = [
        ("log_level: DEBUG", LogLevel::Debug),
        ("log_level: Warning", LogLevel::Warning),
        ("log_level: warn", LogLevel::Warning),
        ("log_level: 20", LogLevel::Info),
        ("log_level: 50", LogLevel::Critical),
    ];

    for (yaml, expected) in cases {
        let mut builder = ConfigBuilder::new().with_schema(RunnerConfig::schema());
        builder.add_overrides(parse_mapping(yaml).unwrap());
        let config: RunnerConfig = builder
            .build()
            .unwrap_or_else(|e| panic!("{} rejected: {}", yaml, e));
        assert_eq!(config.log_level, expected, "{}", yaml);
    }
}

#[test]
fn test_runner_config_rejects_bad_levels() {
    for yaml in ["log_level: loud", "log_level: 25", "log_level: true"] {
        let mut builder = ConfigBuilder::new().with_schema(RunnerConfig::schema());
        builder.add_overrides(parse_mapping(yaml).unwrap());

        match builder.build::<RunnerConfig>() {
            Err(BatchError::ValidationError(errors)) => assert!(errors.has_field("log_level")),
            other => panic!("expected ValidationError for {}, got {:?}", yaml, other),
        }
    }
}

#[test]
fn test_env_level_numeric_and_uppercase() {
    for (raw, expected) in [("10", LogLevel::Debug), ("ERROR", LogLevel::Error)] {
        let mut builder = ConfigBuilder::new().with_schema(RunnerConfig::schema());
        builder
            .add_env_from("BATCHKIT_", vars(&[("BATCHKIT_LOG_LEVEL", raw)]))
            .unwrap();

        let config: RunnerConfig = builder.build().unwrap();
        assert_eq!(config.log_level, expected);
    }
}

#[test]
fn test_enum_ignore_case() {
    let schema = Schema::new().field(
        "mode",
        FieldSpec::new(FieldType::String)
            .one_of(&["fast", "safe"])
            .ignore_case(),
    );
    let strict = Schema::new().field(
        "mode",
        FieldSpec::new(FieldType::String).one_of(&["fast", "safe"]),
    );
    let map = parse_mapping("mode: FAST\n").unwrap();

    assert!(validate(&map, &schema).is_ok());
    assert!(validate(&map, &strict).is_err());
}

#[test]
fn test_runner_config_rejects_unknown_keys() {
    let mut builder = ConfigBuilder::new().with_schema(RunnerConfig::schema());
    builder.set("log_levle", "debug").set("log_level", "loud");

    match builder.build::<RunnerConfig>().unwrap_err() {
        BatchError::ValidationError(errors) => {
            assert!(errors.has_field("log_levle"));
            assert!(errors.has_field("log_level"));
        }
        other => panic!("expected ValidationError, got {:?}", other),
    }
}

#[test]
fn test_runner_config_validate() {
    assert!(RunnerConfig::default().validate().is_ok());

    let no_files = RunnerConfig {
        log_max_files: 0,
        ..RunnerConfig::default()
    };
    assert!(matches!(
        no_files.validate(),
        Err(BatchError::ConfigError(_))
    ));

    let bad_mnemonic = RunnerConfig {
        mnemonic: "../etc".to_string(),
        ..RunnerConfig::default()
    };
    assert!(matches!(
        bad_mnemonic.validate(),
        Err(BatchError::InvalidMnemonic(_))
    ));
}

#[test]
fn test_runner_config_yaml_round_trip() {
    let config = RunnerConfig {
        log_level: LogLevel::Warning,
        mnemonic: "nightly".to_string(),
        ..RunnerConfig::default()
    };

    let yaml = config.to_yaml().unwrap();
    assert!(yaml.contains("log_level: warning"));
    assert!(!yaml.contains("log_dir"));

    let map = parse_mapping(&yaml).unwrap();
    assert!(validate(&map, &RunnerConfig::schema()).is_ok());
}
