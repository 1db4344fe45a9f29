//! Configuration loading from a directory

use std::fs;

use embedql::config::CONFIG_FILE_NAME;
use embedql::{Engine, EngineConfig, Record, Value};
use tempfile::TempDir;

#[test]
fn test_missing_file_yields_defaults() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let config = EngineConfig::load(dir.path()).unwrap();
    assert_eq!(config.root_object_name, "object");
    assert_eq!(config.regex_size_limit, 1024 * 1024);
    assert_eq!(config.max_pattern_length, 1000);
}

#[test]
fn test_toml_file() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    fs::write(
        dir.path().join(CONFIG_FILE_NAME),
        "root_object_name = \"row\"\nmax_pattern_length = 8\n",
    )
    .unwrap();

    let config = EngineConfig::load(dir.path()).unwrap();
    assert_eq!(config.root_object_name, "row");
    assert_eq!(config.max_pattern_length, 8);

    let engine = Engine::new(config);
    assert_eq!(engine.to_text(&Value::from(serde_json::json!({}))), "@obj:row<>");
    assert!(engine
        .evaluate_formula("'abc' LIKE '%%%%%%%%%'", &Record::new())
        .is_err());
}

#[test]
fn test_invalid_toml_is_an_error() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    fs::write(dir.path().join(CONFIG_FILE_NAME), "max_pattern_length = \"lots\"").unwrap();
    assert!(EngineConfig::load(dir.path()).is_err());
}

#[test]
fn test_env_file_overrides() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    fs::write(dir.path().join(CONFIG_FILE_NAME), "timezone = \"UTC\"\n").unwrap();
    fs::write(
        dir.path().join(".env"),
        "EMBEDQL_TIMEZONE=Asia/Tokyo\nEMBEDQL_LIKE_CASE_SENSITIVE=false\n",
    )
    .unwrap();

    let config = EngineConfig::load(dir.path()).unwrap();
    assert_eq!(config.timezone, "Asia/Tokyo");
    assert!(!config.like_case_sensitive);
    assert_eq!(config.eval_options().timezone, chrono_tz::Asia::Tokyo);
}
