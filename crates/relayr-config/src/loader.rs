// SPDX-FileCopyrightText: 2026 Relayr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports `./relayr.toml` > `~/.config/relayr/relayr.toml` >
//! `/etc/relayr/relayr.toml` with environment variable overrides via the
//! `RELAYR_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::RelayrConfig;

/// Load configuration from the standard hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/relayr/relayr.toml` (system-wide)
/// 3. `~/.config/relayr/relayr.toml` (user XDG config)
/// 4. `./relayr.toml` (local directory)
/// 5. `RELAYR_*` environment variables
pub fn load_config() -> Result<RelayrConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(RelayrConfig::default()))
        .merge(Toml::file("/etc/relayr/relayr.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("relayr/relayr.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("relayr.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (testing and embedding).
pub fn load_config_from_str(toml_content: &str) -> Result<RelayrConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(RelayrConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<RelayrConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(RelayrConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `RELAYR_QUEUE_BACKOFF_MS` must map to
/// `queue.backoff_ms`, not `queue.backoff.ms`.
fn env_provider() -> Env {
    Env::prefixed("RELAYR_").map(|key| {
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("server_", "server.", 1)
            .replacen("queue_", "queue.", 1)
            .replacen("ingest_", "ingest.", 1)
            .replacen("auto_reply_", "auto_reply.", 1)
            .replacen("telegram_", "telegram.", 1)
            .replacen("whatsapp_", "whatsapp.", 1)
            .replacen("ari_", "ari.", 1);
        mapped.into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_string_yields_defaults() {
        let config = load_config_from_str("").expect("defaults should load");
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.queue.concurrency, 4);
    }

    #[test]
    fn toml_sections_override_defaults() {
        let config = load_config_from_str(
            r#"
            [server]
            port = 9999

            [queue]
            attempts = 7
            backoff_ms = 100

            [ingest]
            default_account_id = "a1"

            [ari]
            url = "http://ari.internal:8088"
        "#,
        )
        .expect("config should parse");

        assert_eq!(config.server.port, 9999);
        assert_eq!(config.queue.attempts, 7);
        assert_eq!(config.ingest.default_account_id.as_deref(), Some("a1"));
        assert_eq!(config.ari.url, "http://ari.internal:8088");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let result = load_config_from_str(
            r#"
            [server]
            prot = 8080
        "#,
        );
        assert!(result.is_err(), "typo'd key must fail extraction");
    }
}
