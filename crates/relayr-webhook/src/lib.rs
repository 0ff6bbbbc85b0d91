// SPDX-FileCopyrightText: 2026 Relayr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook ingestion server for relayr.
//!
//! Receives provider callbacks over HTTP, authenticates them, persists an
//! audit row, and enqueues processing jobs. Handlers never talk to the
//! providers themselves; workers do that after the 200 has gone out.

pub mod handlers;
pub mod server;

pub use server::{WebhookState, router, start_server};
