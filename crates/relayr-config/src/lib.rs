// SPDX-FileCopyrightText: 2026 Relayr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Layered configuration for the relayr messaging core.
//!
//! Configuration is merged from compiled defaults, TOML files in the
//! standard hierarchy, and `RELAYR_`-prefixed environment variables. All
//! sections reject unknown keys so typos fail loudly at startup.

pub mod loader;
pub mod model;

pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::{
    AriConfig, AutoReplyConfig, IngestConfig, QueueConfig, RelayrConfig, ServerConfig,
    TelegramConfig, WhatsappConfig,
};
