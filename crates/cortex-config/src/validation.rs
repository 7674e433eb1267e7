// SPDX-FileCopyrightText: 2026 Cortex Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as non-empty paths, chunk overlap bounds, and fusion weights.

use crate::diagnostic::ConfigError;
use crate::model::CortexConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &CortexConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    let host = config.server.host.trim();
    if host.is_empty() {
        errors.push(ConfigError::validation("server.host must not be empty"));
    } else {
        let is_valid_ip = host.parse::<std::net::IpAddr>().is_ok();
        let is_valid_hostname = host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == ':');
        if !is_valid_ip && !is_valid_hostname {
            errors.push(ConfigError::validation(format!(
                "server.host `{host}` is not a valid IP address or hostname"
            )));
        }
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::validation(
            "storage.database_path must not be empty",
        ));
    }

    if config.model.base_url.trim().is_empty() {
        errors.push(ConfigError::validation("model.base_url must not be empty"));
    }
    if config.embeddings.url.trim().is_empty() {
        errors.push(ConfigError::validation("embeddings.url must not be empty"));
    }
    if config.model.timeout_secs == 0 {
        errors.push(ConfigError::validation(
            "model.timeout_secs must be at least 1",
        ));
    }
    if config.embeddings.timeout_secs == 0 {
        errors.push(ConfigError::validation(
            "embeddings.timeout_secs must be at least 1",
        ));
    }

    let ingestion = &config.ingestion;
    if ingestion.chunk_size == 0 {
        errors.push(ConfigError::validation(
            "ingestion.chunk_size must be at least 1",
        ));
    }
    if ingestion.chunk_overlap >= ingestion.chunk_size {
        errors.push(ConfigError::validation(format!(
            "ingestion.chunk_overlap ({}) must be smaller than ingestion.chunk_size ({})",
            ingestion.chunk_overlap, ingestion.chunk_size
        )));
    }
    if !ingestion.debounce_seconds.is_finite() || ingestion.debounce_seconds < 0.0 {
        errors.push(ConfigError::validation(format!(
            "ingestion.debounce_seconds must be a non-negative number, got {}",
            ingestion.debounce_seconds
        )));
    }

    if config.recall.top_k == 0 {
        errors.push(ConfigError::validation("recall.top_k must be at least 1"));
    }
    if config.recall.max_results == 0 {
        errors.push(ConfigError::validation(
            "recall.max_results must be at least 1",
        ));
    }

    let search = &config.search;
    for (name, weight) in [
        ("search.lexical_weight", search.lexical_weight),
        ("search.vector_weight", search.vector_weight),
    ] {
        if !weight.is_finite() || weight < 0.0 {
            errors.push(ConfigError::validation(format!(
                "{name} must be a non-negative number, got {weight}"
            )));
        }
    }
    if search.lexical_weight + search.vector_weight <= 0.0 {
        errors.push(ConfigError::validation(
            "search.lexical_weight and search.vector_weight must not both be zero",
        ));
    }
    if search.vector_candidates == 0 {
        errors.push(ConfigError::validation(
            "search.vector_candidates must be at least 1",
        ));
    }
    if search.default_limit == 0 {
        errors.push(ConfigError::validation(
            "search.default_limit must be at least 1",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn has_error(errors: &[ConfigError], needle: &str) -> bool {
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains(needle)))
    }

    #[test]
    fn default_config_validates() {
        let config = CortexConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn empty_database_path_fails_validation() {
        let mut config = CortexConfig::default();
        config.storage.database_path = "".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "database_path"));
    }

    #[test]
    fn overlap_must_be_smaller_than_chunk() {
        let mut config = CortexConfig::default();
        config.ingestion.chunk_size = 100;
        config.ingestion.chunk_overlap = 100;
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "chunk_overlap"));
    }

    #[test]
    fn negative_debounce_fails_validation() {
        let mut config = CortexConfig::default();
        config.ingestion.debounce_seconds = -1.0;
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "debounce_seconds"));
    }

    #[test]
    fn zero_debounce_is_allowed() {
        let mut config = CortexConfig::default();
        config.ingestion.debounce_seconds = 0.0;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn invalid_weights_are_all_reported() {
        let mut config = CortexConfig::default();
        config.search.lexical_weight = -0.1;
        config.search.vector_weight = f64::NAN;
        config.recall.top_k = 0;
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "search.lexical_weight"));
        assert!(has_error(&errors, "search.vector_weight"));
        assert!(has_error(&errors, "recall.top_k"));
    }

    #[test]
    fn both_weights_zero_fails_validation() {
        let mut config = CortexConfig::default();
        config.search.lexical_weight = 0.0;
        config.search.vector_weight = 0.0;
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "must not both be zero"));
    }

    #[test]
    fn bad_host_fails_validation() {
        let mut config = CortexConfig::default();
        config.server.host = "not a host!".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "server.host"));
    }

    #[test]
    fn lexical_only_weights_from_toml_validate() {
        let toml_str = r#"
[search]
lexical_weight = 1.0
vector_weight = 0.0
"#;
        let config: CortexConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.search.vector_candidates, 500);
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn zero_chunk_size_from_toml_reports_both_errors() {
        let toml_str = r#"
[ingestion]
chunk_size = 0

[recall]
max_results = 0
"#;
        let config: CortexConfig = toml::from_str(toml_str).unwrap();
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "chunk_size"));
        assert!(has_error(&errors, "recall.max_results"));
    }
}
