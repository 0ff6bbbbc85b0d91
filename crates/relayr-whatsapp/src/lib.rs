// SPDX-FileCopyrightText: 2026 Relayr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WhatsApp Cloud API channel adapter for the relayr communication core.
//!
//! Covers outbound sending (text, media, templates), webhook payload
//! normalization, X-Hub-Signature-256 verification, and the two-step
//! media fetch into object storage.

pub mod adapter;
pub mod client;
pub mod inbound;
pub mod media;
pub mod signature;

pub use adapter::WhatsappChannel;
pub use client::WhatsappClient;
pub use signature::{sign, verify_signature};
