// SPDX-FileCopyrightText: 2026 Relayr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telegram channel adapter for the relayr communication core.
//!
//! Speaks the Telegram Bot API via teloxide with one bot per tenant
//! integration: webhook update normalization, outbound sending, media
//! ingestion into object storage, canned command replies, and manager
//! group notifications.

pub mod adapter;
pub mod inbound;
pub mod media;
pub mod registry;

pub use adapter::TelegramChannel;
pub use inbound::command_reply;
pub use registry::BotRegistry;
