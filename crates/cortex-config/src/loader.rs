// SPDX-FileCopyrightText: 2026 Cortex Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./cortex.toml` > `~/.config/cortex/cortex.toml` > `/etc/cortex/cortex.toml`
//! with environment variable overrides via `CORTEX_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::CortexConfig;

/// Top-level sections that environment variables may address.
const SECTIONS: &[&str] = &[
    "server",
    "storage",
    "model",
    "embeddings",
    "ingestion",
    "recall",
    "search",
    "prometheus",
];

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/cortex/cortex.toml` (system-wide)
/// 3. `~/.config/cortex/cortex.toml` (user XDG config)
/// 4. `./cortex.toml` (local directory)
/// 5. `CORTEX_*` environment variables
pub fn load_config() -> Result<CortexConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<CortexConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(CortexConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<CortexConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(CortexConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading.
///
/// Returns the Figment before extraction so callers can inspect metadata.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(CortexConfig::default()))
        .merge(Toml::file("/etc/cortex/cortex.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("cortex/cortex.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("cortex.toml"))
        .merge(env_provider())
}

/// Map a prefix-stripped, lowercased env var name to a dotted config path.
///
/// Only the section separator becomes a dot, so `model_base_url` maps to
/// `model.base_url` rather than `model.base.url`.
pub fn env_key_to_path(key: &str) -> String {
    for section in SECTIONS {
        if let Some(rest) = key.strip_prefix(section).and_then(|r| r.strip_prefix('_')) {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}

/// Create the environment variable provider using explicit `map()` for section-to-dot mapping.
fn env_provider() -> Env {
    Env::prefixed("CORTEX_").map(|key| env_key_to_path(&key.as_str().to_ascii_lowercase()).into())
}
