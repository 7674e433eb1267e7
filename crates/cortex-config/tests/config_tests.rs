// SPDX-FileCopyrightText: 2026 Cortex Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Cortex configuration system.

use cortex_config::diagnostic::ConfigError;
use cortex_config::model::CortexConfig;
use cortex_config::{load_and_validate_path, load_and_validate_str, load_config_from_str};

/// Valid TOML with all known fields deserializes successfully.
#[test]
fn valid_toml_deserializes_into_cortex_config() {
    let toml = r#"
[server]
host = "0.0.0.0"
port = 9000
log_level = "debug"

[storage]
database_path = "/tmp/test.db"
wal_mode = false

[model]
base_url = "http://llm:8080/v1"
model = "extractor"
api_key = "sk-123"
extraction_max_tokens = 512
timeout_secs = 60

[embeddings]
url = "http://embed:8105/embed"
timeout_secs = 5

[ingestion]
chunk_size = 1024
chunk_overlap = 128
debounce_seconds = 2.5

[recall]
top_k = 4
max_results = 12
max_synthesis_tokens = 256

[search]
lexical_weight = 0.5
vector_weight = 0.5
vector_candidates = 100
default_limit = 7

[prometheus]
enabled = true
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.server.host, "0.0.0.0");
    assert_eq!(config.server.port, 9000);
    assert_eq!(config.server.log_level, "debug");
    assert_eq!(config.storage.database_path, "/tmp/test.db");
    assert!(!config.storage.wal_mode);
    assert_eq!(config.model.base_url, "http://llm:8080/v1");
    assert_eq!(config.model.model, "extractor");
    assert_eq!(config.model.api_key.as_deref(), Some("sk-123"));
    assert_eq!(config.model.extraction_max_tokens, 512);
    assert_eq!(config.model.timeout_secs, 60);
    assert_eq!(config.embeddings.url, "http://embed:8105/embed");
    assert_eq!(config.embeddings.timeout_secs, 5);
    assert_eq!(config.ingestion.chunk_size, 1024);
    assert_eq!(config.ingestion.chunk_overlap, 128);
    assert_eq!(config.ingestion.debounce_seconds, 2.5);
    assert_eq!(config.recall.top_k, 4);
    assert_eq!(config.recall.max_results, 12);
    assert_eq!(config.recall.max_synthesis_tokens, 256);
    assert_eq!(config.search.lexical_weight, 0.5);
    assert_eq!(config.search.vector_candidates, 100);
    assert_eq!(config.search.default_limit, 7);
    assert!(config.prometheus.enabled);
}

/// Missing optional sections use defaults without error.
#[test]
fn missing_optional_sections_use_defaults() {
    let config = load_config_from_str("").expect("empty TOML should use defaults");

    assert_eq!(config.server.host, "127.0.0.1");
    assert_eq!(config.server.port, 8100);
    assert_eq!(config.server.log_level, "info");
    assert!(config.storage.wal_mode);
    assert!(config.storage.database_path.ends_with("memories.db"));
    assert_eq!(config.model.model, "memory");
    assert!(config.model.api_key.is_none());
    assert_eq!(config.model.extraction_max_tokens, 2048);
    assert_eq!(config.embeddings.timeout_secs, 30);
    assert_eq!(config.ingestion.chunk_size, 2048);
    assert_eq!(config.ingestion.chunk_overlap, 256);
    assert_eq!(config.recall.top_k, 8);
    assert_eq!(config.recall.max_results, 20);
    assert_eq!(config.recall.max_synthesis_tokens, 1024);
    assert_eq!(config.search.lexical_weight, 0.4);
    assert_eq!(config.search.vector_weight, 0.6);
    assert_eq!(config.search.vector_candidates, 500);
    assert!(!config.prometheus.enabled);
}

/// Unknown field in a section is rejected by deny_unknown_fields.
#[test]
fn unknown_field_in_search_produces_error() {
    let toml = r#"
[search]
vector_wieght = 0.9
"#;

    let err = load_config_from_str(toml).expect_err("should reject unknown field");
    let err_str = format!("{err}");
    assert!(
        err_str.contains("unknown field") || err_str.contains("vector_wieght"),
        "error should mention unknown field or the bad key, got: {err_str}"
    );
}

/// Unexpected top-level section is rejected.
#[test]
fn deny_unknown_fields_at_top_level() {
    let toml = r#"
[telegram]
bot_token = "x"
"#;

    let err = load_config_from_str(toml).expect_err("unknown top-level section should be rejected");
    let err_str = format!("{err}");
    assert!(
        err_str.contains("unknown field") || err_str.contains("telegram"),
        "error should mention unknown field, got: {err_str}"
    );
}

/// A dotted override (what `CORTEX_MODEL_BASE_URL` maps to) wins over TOML.
#[test]
fn dotted_override_wins_over_toml() {
    use figment::{
        Figment,
        providers::{Format, Serialized, Toml},
    };

    let toml_content = r#"
[model]
base_url = "http://from-toml/v1"
"#;

    let config: CortexConfig = Figment::new()
        .merge(Serialized::defaults(CortexConfig::default()))
        .merge(Toml::string(toml_content))
        .merge(("model.base_url", "http://from-env/v1"))
        .extract()
        .expect("should merge env override");

    assert_eq!(config.model.base_url, "http://from-env/v1");
}

/// Missing config files are silently skipped.
#[test]
fn missing_config_files_silently_skipped() {
    use figment::{
        Figment,
        providers::{Format, Serialized, Toml},
    };

    let config: CortexConfig = Figment::new()
        .merge(Serialized::defaults(CortexConfig::default()))
        .merge(Toml::file("/nonexistent/path/cortex.toml"))
        .extract()
        .expect("missing file should be silently skipped");

    assert_eq!(config.server.port, 8100);
}

/// Unknown key produces an UnknownKey diagnostic with a suggestion.
#[test]
fn diagnostic_unknown_key_has_suggestion() {
    let toml = r#"
[ingestion]
chunk_sise = 10
"#;

    let errors = load_and_validate_str(toml).expect_err("should fail");
    assert!(!errors.is_empty());
    let found = errors.iter().any(|e| {
        matches!(e, ConfigError::UnknownKey { key, suggestion, .. }
            if key == "chunk_sise" && suggestion.as_deref() == Some("chunk_size"))
    });
    assert!(found, "expected UnknownKey with suggestion, got: {errors:?}");
}

/// Type mismatches surface as InvalidType diagnostics.
#[test]
fn diagnostic_invalid_type() {
    let toml = r#"
[server]
port = "eighty"
"#;

    let errors = load_and_validate_str(toml).expect_err("should fail");
    assert!(
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::InvalidType { .. } | ConfigError::Other(_))),
        "got: {errors:?}"
    );
}

/// Semantic validation runs after successful deserialization.
#[test]
fn validation_errors_are_collected() {
    let toml = r#"
[ingestion]
chunk_size = 10
chunk_overlap = 20

[recall]
top_k = 0
"#;

    let errors = load_and_validate_str(toml).expect_err("should fail validation");
    assert_eq!(errors.len(), 2, "got: {errors:?}");
}

/// Explicit config path loads the given file.
#[test]
#[serial_test::serial]
fn load_from_explicit_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cortex.toml");
    std::fs::write(&path, "[server]\nport = 9191\n").unwrap();

    let config = load_and_validate_path(&path).expect("should load");
    assert_eq!(config.server.port, 9191);
}

/// An explicit config path that does not exist is an error, not defaults.
#[test]
fn explicit_missing_path_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let errors = load_and_validate_path(&dir.path().join("absent.toml")).unwrap_err();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].to_string().contains("not found"));
}

/// `CORTEX_*` variables override the file, keeping underscores inside keys.
#[test]
#[serial_test::serial]
fn env_vars_override_file_values() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cortex.toml");
    std::fs::write(&path, "[model]\nbase_url = \"http://from-file/v1\"\n").unwrap();

    // SAFETY: serialized with every other env-mutating test in this binary.
    unsafe {
        std::env::set_var("CORTEX_MODEL_BASE_URL", "http://from-env/v1");
        std::env::set_var("CORTEX_SERVER_PORT", "9393");
    }
    let result = load_and_validate_path(&path);
    unsafe {
        std::env::remove_var("CORTEX_MODEL_BASE_URL");
        std::env::remove_var("CORTEX_SERVER_PORT");
    }

    let config = result.expect("should load");
    assert_eq!(config.model.base_url, "http://from-env/v1");
    assert_eq!(config.server.port, 9393);
}
