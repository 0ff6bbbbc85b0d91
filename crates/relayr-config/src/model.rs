// SPDX-FileCopyrightText: 2026 Relayr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Relayr communication core.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup.

use serde::{Deserialize, Serialize};

use relayr_core::RetryPolicy;

/// Top-level Relayr configuration.
///
/// Loaded from TOML files with `RELAYR_*` environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RelayrConfig {
    /// Webhook ingestion HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Queue retry and concurrency settings.
    #[serde(default)]
    pub queue: QueueConfig,

    /// Webhook ingestion behavior.
    #[serde(default)]
    pub ingest: IngestConfig,

    /// First-contact auto-reply behavior.
    #[serde(default)]
    pub auto_reply: AutoReplyConfig,

    /// Process-wide Telegram fallbacks.
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// WhatsApp Cloud API client settings.
    #[serde(default)]
    pub whatsapp: WhatsappConfig,

    /// Asterisk ARI signalling server connection.
    #[serde(default)]
    pub ari: AriConfig,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for RelayrConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            queue: QueueConfig::default(),
            ingest: IngestConfig::default(),
            auto_reply: AutoReplyConfig::default(),
            telegram: TelegramConfig::default(),
            whatsapp: WhatsappConfig::default(),
            ari: AriConfig::default(),
            log_level: default_log_level(),
        }
    }
}

/// Webhook ingestion HTTP server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Queue retry and concurrency configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct QueueConfig {
    /// Total attempts per job including the first delivery.
    #[serde(default = "default_attempts")]
    pub attempts: u32,

    /// Base backoff in milliseconds; doubles per retry.
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,

    /// Concurrent jobs in flight per queue.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl QueueConfig {
    /// The retry policy applied to every enqueued job.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.attempts,
            std::time::Duration::from_millis(self.backoff_ms),
        )
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            attempts: default_attempts(),
            backoff_ms: default_backoff_ms(),
            concurrency: default_concurrency(),
        }
    }
}

/// Webhook ingestion behavior.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct IngestConfig {
    /// Account used for webhooks that arrive without an integration id on
    /// channels without their own resolution path (e.g. website forms).
    #[serde(default)]
    pub default_account_id: Option<String>,
}

/// First-contact auto-reply behavior.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AutoReplyConfig {
    /// Whether the first inbound message in a new conversation triggers a
    /// canned reply.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// The canned reply text.
    #[serde(default = "default_auto_reply_text")]
    pub text: String,
}

impl Default for AutoReplyConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            text: default_auto_reply_text(),
        }
    }
}

/// Process-wide Telegram fallbacks.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TelegramConfig {
    /// Manager group chat id used when an integration has none configured.
    #[serde(default)]
    pub manager_chat_id: Option<String>,
}

/// WhatsApp Cloud API client configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WhatsappConfig {
    /// Graph API base URL; overridden in tests to point at a mock server.
    #[serde(default = "default_whatsapp_api_base")]
    pub api_base: String,

    /// Request timeout in seconds for provider calls.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for WhatsappConfig {
    fn default() -> Self {
        Self {
            api_base: default_whatsapp_api_base(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// Asterisk ARI connection configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AriConfig {
    /// Base URL of the ARI HTTP interface.
    #[serde(default = "default_ari_url")]
    pub url: String,

    #[serde(default = "default_ari_username")]
    pub username: String,

    #[serde(default = "default_ari_password")]
    pub password: String,

    /// Stasis application name calls are routed through.
    #[serde(default = "default_ari_app")]
    pub app: String,

    /// Request timeout in seconds for ARI calls.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for AriConfig {
    fn default() -> Self {
        Self {
            url: default_ari_url(),
            username: default_ari_username(),
            password: default_ari_password(),
            app: default_ari_app(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_attempts() -> u32 {
    3
}

fn default_backoff_ms() -> u64 {
    2000
}

fn default_concurrency() -> usize {
    4
}

fn default_true() -> bool {
    true
}

fn default_auto_reply_text() -> String {
    "Thank you for your message! A manager will get back to you shortly.".to_string()
}

fn default_whatsapp_api_base() -> String {
    "https://graph.facebook.com/v19.0".to_string()
}

fn default_request_timeout_secs() -> u64 {
    15
}

fn default_ari_url() -> String {
    "http://localhost:8088".to_string()
}

fn default_ari_username() -> String {
    "asterisk".to_string()
}

fn default_ari_password() -> String {
    "asterisk".to_string()
}

fn default_ari_app() -> String {
    "relayr".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}
